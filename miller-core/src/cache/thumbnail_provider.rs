//! `src/cache/thumbnail_provider.rs`
//!
//! Memory, then disk, then the renderer. A rendered thumbnail is written
//! back to both tiers. Concurrent requests for the same path are not
//! coalesced; each renders on its own.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, instrument, warn};

use crate::cache::thumbnail_cache::{Thumbnail, ThumbnailCache, ThumbnailKey};
use crate::config::ThumbnailConfig;
use crate::error::{AppError, AppResult};
use crate::util::elapsed::saturating_millis;

/// Produces an encoded thumbnail for a file. Image decoding lives behind
/// this seam.
#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    async fn render(&self, path: &Path, size: u32) -> AppResult<Thumbnail>;
}

pub struct ThumbnailProvider {
    cache: ThumbnailCache,
    renderer: Arc<dyn ThumbnailRenderer>,
    size: u32,
    prefetch_concurrency: usize,
}

impl ThumbnailProvider {
    #[must_use]
    pub fn new(cache: ThumbnailCache, renderer: Arc<dyn ThumbnailRenderer>, config: &ThumbnailConfig) -> Self {
        Self {
            cache,
            renderer,
            size: config.size,
            prefetch_concurrency: config.prefetch_concurrency.max(1),
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn thumbnail(&self, path: &Path) -> AppResult<Thumbnail> {
        let live_mtime = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| AppError::from_io_at(path, e))?;
        let key = ThumbnailKey::from_path(path)?;

        if let Some(hit) = self.cache.get_fresh(&key, live_mtime) {
            return Ok(hit);
        }

        match self.cache.load_from_disk(&key, live_mtime).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => warn!(
                marker = "THUMBNAIL_DISK_READ_FAILED",
                operation_type = "thumbnail_provider",
                error = %e,
                "falling back to render"
            ),
        }

        let start_time = Instant::now();
        let rendered = self.renderer.render(path, self.size).await?;
        debug!(
            marker = "THUMBNAIL_RENDERED",
            operation_type = "thumbnail_provider",
            bytes = rendered.data.len(),
            duration_ms = saturating_millis(start_time.elapsed()),
            "rendered"
        );

        self.cache.put(key.clone(), rendered.clone(), live_mtime);
        if let Err(e) = self.cache.store_to_disk(&key, &rendered, live_mtime).await {
            warn!(
                marker = "THUMBNAIL_DISK_WRITE_FAILED",
                operation_type = "thumbnail_provider",
                error = %e,
                "thumbnail kept in memory only"
            );
        }
        Ok(rendered)
    }

    /// Warms the cache for `paths`; returns how many succeeded.
    pub async fn prefetch(&self, paths: Vec<PathBuf>) -> usize {
        stream::iter(paths)
            .map(|path| async move { self.thumbnail(&path).await.is_ok() })
            .buffer_unordered(self.prefetch_concurrency)
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await
    }
}
