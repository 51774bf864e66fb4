//! src/config.rs
//! ============================================================================
//! # Config: Browser Configuration Loader and Saver
//!
//! Manages all user-editable settings of the browser. Loads and saves them as
//! TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate.
//!
//! The running browser never reads `Config` directly: components receive an
//! immutable [`BrowserSettings`] snapshot and are handed a new one through
//! `reconfigure()` when the user changes something.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! let settings = Arc::new(BrowserSettings::from(&config));
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use tokio::fs as TokioFs;

use crate::logging::LoggerConfig;

pub const ICON_SIZE_RANGE: (u32, u32) = (16, 256);
pub const COLUMN_WIDTH_RANGE: (u32, u32) = (150, 400);

/// Initial view of a new browser tab.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Icons,

    Details,

    Compact,

    #[default]
    Miller,
}

/// App theme (color scheme) selector.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,

    Light,

    Dark,

    Custom(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    pub show_hidden_files: bool,

    pub show_toolbar: bool,

    pub show_preview_pane: bool,

    pub default_view: ViewMode,

    pub theme: Theme,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            show_hidden_files: false,
            show_toolbar: true,
            show_preview_pane: true,
            default_view: ViewMode::Miller,
            theme: Theme::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewConfig {
    /// Icon edge in pixels, 16..=256
    pub icon_size: u32,

    pub show_thumbnails: bool,

    pub show_file_extensions: bool,

    /// Miller column width in pixels, 150..=400
    pub miller_column_width: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            icon_size: 64,
            show_thumbnails: true,
            show_file_extensions: true,
            miller_column_width: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdvancedConfig {
    pub default_terminal: String,

    pub confirm_delete: bool,

    /// Delete moves to the trash instead of unlinking.
    pub move_to_trash: bool,

    pub follow_symlinks: bool,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            default_terminal: "x-terminal-emulator".to_string(),
            confirm_delete: true,
            move_to_trash: true,
            follow_symlinks: false,
        }
    }
}

/// Timing windows of the keyboard and mouse gestures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Type-to-select buffer resets after this much idle time
    #[serde(with = "humantime_serde")]
    pub type_select_timeout: Duration,

    /// A second click on the selected entry sooner than this is a double-click
    #[serde(with = "humantime_serde")]
    pub rename_click_min: Duration,

    /// A second click later than this starts over
    #[serde(with = "humantime_serde")]
    pub rename_click_max: Duration,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            type_select_timeout: Duration::from_millis(1000),
            rename_click_min: Duration::from_millis(500),
            rename_click_max: Duration::from_millis(2000),
        }
    }
}

/// Thumbnail cache configuration - embedded in main Config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Longest edge of generated thumbnails
    pub size: u32,

    /// Keep rendered thumbnails on disk across sessions
    pub disk_cache: bool,

    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,

    /// Bound for the in-memory tier; unbounded when absent
    pub max_entries: Option<u64>,

    /// Enable cache statistics
    pub enable_stats: bool,

    /// Concurrent renders when prefetching a column
    pub prefetch_concurrency: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 128,
            disk_cache: true,
            cache_dir: None,
            max_entries: None,
            enable_stats: true,
            prefetch_concurrency: 4,
        }
    }
}

/// Main configuration struct for the browser.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub advanced: AdvancedConfig,

    #[serde(default)]
    pub keyboard: KeyboardConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub logging: LoggerConfig,
}

impl Config {
    /// Loads config from the platform config dir, creating it with defaults
    /// when missing.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/miller/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        if TokioFs::try_exists(path).await? {
            info!(
                marker = "CONFIG_LOAD",
                operation_type = "config",
                path = %path.display(),
                "loading config"
            );
            let text = TokioFs::read_to_string(path).await?;
            let cfg: Self = toml::from_str(&text)?;

            Ok(cfg.sanitized())
        } else {
            info!(
                marker = "CONFIG_DEFAULT",
                operation_type = "config",
                path = %path.display(),
                "no config file found, writing defaults"
            );

            let default_config = Self::default();
            default_config.save_to(path).await?;

            Ok(default_config)
        }
    }

    /// Saves config to the platform config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        info!(
            marker = "CONFIG_SAVE",
            operation_type = "config",
            path = %path.display(),
            "saving config"
        );

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    /// Clamps numeric settings into the ranges the UI offers.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let icon = self
            .view
            .icon_size
            .clamp(ICON_SIZE_RANGE.0, ICON_SIZE_RANGE.1);
        let width = self
            .view
            .miller_column_width
            .clamp(COLUMN_WIDTH_RANGE.0, COLUMN_WIDTH_RANGE.1);

        if icon != self.view.icon_size || width != self.view.miller_column_width {
            warn!(
                marker = "CONFIG_CLAMPED",
                operation_type = "config",
                icon_size = self.view.icon_size,
                miller_column_width = self.view.miller_column_width,
                "view sizes out of range, clamped"
            );
        }
        self.view.icon_size = icon;
        self.view.miller_column_width = width;

        if self.keyboard.rename_click_max < self.keyboard.rename_click_min {
            self.keyboard.rename_click_max = self.keyboard.rename_click_min;
        }

        self
    }

    fn project_dirs() -> anyhow::Result<ProjectDirs> {
        ProjectDirs::from("org", "miller", "Miller")
            .ok_or_else(|| anyhow::anyhow!("Could not determine project directories."))
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().to_path_buf())
    }

    /// Directory of the on-disk thumbnail tier.
    pub fn thumbnail_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.thumbnails.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().join("thumbs")),
        }
    }
}

/// Gesture timing, copied out of [`KeyboardConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTiming {
    pub type_select_timeout: Duration,
    pub rename_click_min: Duration,
    pub rename_click_max: Duration,
}

impl Default for KeyTiming {
    fn default() -> Self {
        Self::from(&KeyboardConfig::default())
    }
}

impl From<&KeyboardConfig> for KeyTiming {
    fn from(config: &KeyboardConfig) -> Self {
        Self {
            type_select_timeout: config.type_select_timeout,
            rename_click_min: config.rename_click_min,
            rename_click_max: config.rename_click_max,
        }
    }
}

/// Immutable settings snapshot read by the column stack and the pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub show_hidden: bool,
    pub follow_symlinks: bool,
    pub show_thumbnails: bool,
    pub move_to_trash: bool,
    pub confirm_delete: bool,
    pub timing: KeyTiming,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for BrowserSettings {
    fn from(config: &Config) -> Self {
        Self {
            show_hidden: config.general.show_hidden_files,
            follow_symlinks: config.advanced.follow_symlinks,
            show_thumbnails: config.view.show_thumbnails,
            move_to_trash: config.advanced.move_to_trash,
            confirm_delete: config.advanced.confirm_delete,
            timing: KeyTiming::from(&config.keyboard),
        }
    }
}
