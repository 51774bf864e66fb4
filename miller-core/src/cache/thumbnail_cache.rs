//! `src/cache/thumbnail_cache.rs`
//! ============================================================================
//! # Two-tier thumbnail cache
//!
//! - Memory tier: a moka cache keyed by the entry's `file://` URL, holding
//!   the image bytes and the source mtime they were rendered from.
//!   Unbounded unless `thumbnails.max_entries` is set.
//! - Disk tier: `<cache_dir>/<blake3(url)>.png`. The file's own mtime is
//!   set to the source mtime it was rendered from, so freshness survives a
//!   restart without a sidecar.
//!
//! Identity is the path. A file rewritten in place keeps its key and is
//! caught by the mtime check only.

use bytes::Bytes;
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use moka::sync::Cache;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, trace};
use url::Url;

use crate::config::ThumbnailConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey(Arc<str>);

impl ThumbnailKey {
    /// Key for an absolute path.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let url = Url::from_file_path(path)
            .map_err(|()| AppError::invalid_target(format!("not an absolute path: {}", path.display())))?;
        Ok(Self(Arc::from(url.as_str())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the disk tier entry.
    #[must_use]
    pub fn disk_file_name(&self) -> String {
        format!("{}.png", blake3::hash(self.0.as_bytes()).to_hex())
    }
}

impl fmt::Display for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded image bytes. Decoding is the renderer's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Bytes,
}

impl Thumbnail {
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[derive(Debug, Clone)]
struct CachedThumbnail {
    thumbnail: Thumbnail,
    source_mtime: SystemTime,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    disk_hits: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub disk_hits: u64,
    pub evictions: u64,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Shared handle; clones see the same entries.
#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Cache<ThumbnailKey, CachedThumbnail>,
    disk_dir: Option<PathBuf>,
    stats: Arc<CacheStats>,
    enable_stats: bool,
}

impl ThumbnailCache {
    #[must_use]
    pub fn with_config(config: &ThumbnailConfig, disk_dir: Option<PathBuf>) -> Self {
        let stats = Arc::new(CacheStats::default());
        let mut builder = Cache::builder();

        if let Some(max) = config.max_entries {
            let listener_stats = Arc::clone(&stats);
            builder = builder.max_capacity(max).eviction_listener(move |_key, _value, cause| {
                if cause.was_evicted() {
                    listener_stats.record_eviction();
                }
            });
        }

        let disk_dir = if config.disk_cache { disk_dir } else { None };

        info!(
            marker = "THUMBNAIL_CACHE_INIT",
            operation_type = "thumbnail_cache",
            max_entries = ?config.max_entries,
            disk_dir = ?disk_dir,
            "thumbnail cache ready"
        );

        Self {
            inner: builder.build(),
            disk_dir,
            stats,
            enable_stats: config.enable_stats,
        }
    }

    /// Memory only, unbounded.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_config(
            &ThumbnailConfig {
                disk_cache: false,
                ..ThumbnailConfig::default()
            },
            None,
        )
    }

    #[must_use]
    pub fn has(&self, key: &ThumbnailKey) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &ThumbnailKey) -> Option<Thumbnail> {
        let found = self.inner.get(key).map(|c| c.thumbnail);
        if self.enable_stats {
            if found.is_some() {
                self.stats.record_hit();
            } else {
                self.stats.record_miss();
            }
        }
        found
    }

    /// Stores `thumbnail`, rendered from a source last modified at
    /// `source_mtime`.
    pub fn put(&self, key: ThumbnailKey, thumbnail: Thumbnail, source_mtime: SystemTime) {
        trace!(
            marker = "THUMBNAIL_PUT",
            operation_type = "thumbnail_cache",
            cache_key = %key,
            bytes = thumbnail.data.len(),
            "cached in memory"
        );
        self.inner.insert(
            key,
            CachedThumbnail {
                thumbnail,
                source_mtime,
            },
        );
    }

    /// True when nothing is cached for `key` or the cached copy predates
    /// `live_mtime`.
    #[must_use]
    pub fn is_stale(&self, key: &ThumbnailKey, live_mtime: SystemTime) -> bool {
        self.inner
            .get(key)
            .is_none_or(|cached| cached.source_mtime < live_mtime)
    }

    /// A memory hit that is not stale against `live_mtime`.
    pub fn get_fresh(&self, key: &ThumbnailKey, live_mtime: SystemTime) -> Option<Thumbnail> {
        if self.is_stale(key, live_mtime) {
            if self.enable_stats {
                self.stats.record_miss();
            }
            return None;
        }
        self.get(key)
    }

    #[must_use]
    pub fn disk_path(&self, key: &ThumbnailKey) -> Option<PathBuf> {
        self.disk_dir.as_ref().map(|dir| dir.join(key.disk_file_name()))
    }

    /// Reads the disk tier and promotes a fresh hit into memory.
    #[instrument(skip(self), fields(cache_key = %key))]
    pub async fn load_from_disk(
        &self,
        key: &ThumbnailKey,
        live_mtime: SystemTime,
    ) -> AppResult<Option<Thumbnail>> {
        let Some(path) = self.disk_path(key) else {
            return Ok(None);
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::cache_operation_failed("stat", key.as_str(), e.to_string())),
        };

        // Stamped by `store_to_disk` with the source mtime, not the write time.
        let source_mtime = metadata
            .modified()
            .map_err(|e| AppError::cache_operation_failed("stat", key.as_str(), e.to_string()))?;
        if source_mtime < live_mtime {
            debug!(
                marker = "THUMBNAIL_DISK_STALE",
                operation_type = "thumbnail_cache",
                cache_key = %key,
                "disk copy rendered from an older source"
            );
            return Ok(None);
        }

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::cache_operation_failed("read", key.as_str(), e.to_string()))?;
        let thumbnail = Thumbnail::new(data);

        if self.enable_stats {
            self.stats.record_disk_hit();
        }
        self.put(key.clone(), thumbnail.clone(), source_mtime);
        Ok(Some(thumbnail))
    }

    /// Writes `thumbnail`, rendered from a source last modified at
    /// `source_mtime`, to the disk tier if one is configured.
    #[instrument(skip(self, thumbnail), fields(cache_key = %key))]
    pub async fn store_to_disk(
        &self,
        key: &ThumbnailKey,
        thumbnail: &Thumbnail,
        source_mtime: SystemTime,
    ) -> AppResult<()> {
        let Some(path) = self.disk_path(key) else {
            return Ok(());
        };
        let fail = |op: &str, e: std::io::Error| AppError::cache_operation_failed(op, key.as_str(), e.to_string());

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| fail("mkdir", e))?;
        }

        // Readers never see a half-written file.
        let tmp = path.with_extension("png.tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| fail("create", e))?;
        file.write_all(&thumbnail.data)
            .await
            .map_err(|e| fail("write", e))?;
        file.flush().await.map_err(|e| fail("write", e))?;
        let file = file.into_std().await;
        file.set_modified(source_mtime)
            .map_err(|e| fail("set_mtime", e))?;
        drop(file);

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| fail("rename", e))?;

        debug!(
            marker = "THUMBNAIL_DISK_STORE",
            operation_type = "thumbnail_cache",
            cache_key = %key,
            path = %path.display(),
            "written to disk tier"
        );
        Ok(())
    }

    pub fn invalidate(&self, key: &ThumbnailKey) {
        self.inner.invalidate(key);
    }

    /// Drops the memory tier. The disk tier is left alone.
    pub fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("entries", &self.inner.entry_count())
            .field("disk_dir", &self.disk_dir)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(path: &str) -> ThumbnailKey {
        ThumbnailKey::from_path(Path::new(path)).unwrap()
    }

    #[test]
    fn key_is_file_url() {
        assert_eq!(key("/home/u/a b.png").as_str(), "file:///home/u/a%20b.png");
        assert!(ThumbnailKey::from_path(Path::new("relative.png")).is_err());
    }

    #[test]
    fn disk_name_is_url_hash() {
        let k = key("/home/u/a.png");
        let expected = format!("{}.png", blake3::hash(b"file:///home/u/a.png").to_hex());
        assert_eq!(k.disk_file_name(), expected);
        assert_ne!(k.disk_file_name(), key("/home/u/b.png").disk_file_name());
    }

    #[test]
    fn newer_source_makes_entry_stale() {
        let cache = ThumbnailCache::in_memory();
        let k = key("/p/img.jpg");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let t1 = t0 + Duration::from_secs(1);

        assert!(cache.is_stale(&k, t0), "missing counts as stale");

        cache.put(k.clone(), Thumbnail::new(&b"png"[..]), t0);
        assert!(cache.has(&k));
        assert!(!cache.is_stale(&k, t0));
        assert!(cache.is_stale(&k, t1));
        assert!(cache.get_fresh(&k, t1).is_none());
        assert_eq!(cache.get_fresh(&k, t0), Some(Thumbnail::new(&b"png"[..])));
    }

    #[test]
    fn memory_tier_is_unbounded_by_default() {
        let cache = ThumbnailCache::in_memory();
        let mtime = SystemTime::now();
        for i in 0..2_000 {
            cache.put(key(&format!("/p/{i}")), Thumbnail::new(vec![0u8; 4]), mtime);
        }
        assert_eq!(cache.entry_count(), 2_000);
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = ThumbnailCache::in_memory();
        let mtime = SystemTime::now();
        cache.put(key("/a"), Thumbnail::new(vec![1]), mtime);
        cache.put(key("/b"), Thumbnail::new(vec![2]), mtime);

        cache.invalidate(&key("/a"));
        assert!(!cache.has(&key("/a")));

        cache.clear();
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn disk_tier_round_trip_respects_mtime() {
        let dir = TempDir::new().unwrap();
        let config = ThumbnailConfig::default();
        let cache = ThumbnailCache::with_config(&config, Some(dir.path().to_path_buf()));
        let k = key("/p/photo.jpg");

        cache
            .store_to_disk(&k, &Thumbnail::new(&b"bytes"[..]), SystemTime::now())
            .await
            .unwrap();
        assert!(dir.path().join(k.disk_file_name()).exists());

        let old_source = SystemTime::UNIX_EPOCH;
        let loaded = cache.load_from_disk(&k, old_source).await.unwrap();
        assert_eq!(loaded, Some(Thumbnail::new(&b"bytes"[..])));
        assert!(cache.has(&k), "disk hit is promoted to memory");

        let future_source = SystemTime::now() + Duration::from_secs(3_600);
        let other = ThumbnailCache::with_config(&config, Some(dir.path().to_path_buf()));
        assert_eq!(other.load_from_disk(&k, future_source).await.unwrap(), None);
    }

    #[tokio::test]
    async fn disk_copy_of_an_older_source_is_stale() {
        let dir = TempDir::new().unwrap();
        let config = ThumbnailConfig::default();
        let cache = ThumbnailCache::with_config(&config, Some(dir.path().to_path_buf()));
        let k = key("/p/edited.jpg");

        // Rendered from t0, written to disk after the source moved on to t1.
        let t0 = SystemTime::now() - Duration::from_secs(60);
        let t1 = t0 + Duration::from_secs(30);
        cache
            .store_to_disk(&k, &Thumbnail::new(&b"old"[..]), t0)
            .await
            .unwrap();

        assert_eq!(cache.load_from_disk(&k, t1).await.unwrap(), None);
        assert!(!cache.has(&k));

        let hit = cache.load_from_disk(&k, t0).await.unwrap();
        assert_eq!(hit, Some(Thumbnail::new(&b"old"[..])));
        assert!(!cache.is_stale(&k, t0));
        assert!(cache.is_stale(&k, t1), "memory copy carries the source mtime");
    }

    #[tokio::test]
    async fn disk_tier_off_is_a_no_op() {
        let cache = ThumbnailCache::in_memory();
        let k = key("/p/x");
        assert!(cache.disk_path(&k).is_none());
        cache
            .store_to_disk(&k, &Thumbnail::new(vec![1]), SystemTime::now())
            .await
            .unwrap();
        assert_eq!(cache.load_from_disk(&k, SystemTime::UNIX_EPOCH).await.unwrap(), None);
    }
}
