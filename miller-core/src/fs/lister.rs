//! ``src/fs/lister.rs``
//!
//! # Directory listing
//!
//! [`DirectoryLister`] is the seam to whatever enumerates directories;
//! [`TokioDirectoryLister`] is the default built on `tokio::fs`.
//!
//! [`ListingDispatcher`] runs listings as background tasks, one per column
//! position. Each request carries the column's generation; a newer request
//! for the same position cancels the older one, and its completion (if it
//! still arrives) is discarded by the column stack's generation check.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{AppError, AppResult};
use crate::fs::entry::{Entry, sort_entries};
use crate::util::elapsed::saturating_micros;

/// Monotonic load token of a column.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub show_hidden: bool,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub column: usize,
    pub generation: Generation,
    pub path: PathBuf,
    pub options: ListOptions,
}

#[derive(Debug, Clone)]
pub enum ListingEvent {
    Loaded {
        column: usize,
        generation: Generation,
        path: PathBuf,
        entries: Vec<Entry>,
    },
    Failed {
        column: usize,
        generation: Generation,
        path: PathBuf,
        error: AppError,
    },
}

impl ListingEvent {
    #[must_use]
    pub const fn column(&self) -> usize {
        match self {
            Self::Loaded { column, .. } | Self::Failed { column, .. } => *column,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        match self {
            Self::Loaded { generation, .. } | Self::Failed { generation, .. } => *generation,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Loaded { path, .. } | Self::Failed { path, .. } => path,
        }
    }
}

#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Lists `path` in display order.
    async fn list(&self, path: &Path, options: ListOptions) -> AppResult<Vec<Entry>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDirectoryLister;

#[async_trait]
impl DirectoryLister for TokioDirectoryLister {
    async fn list(&self, path: &Path, options: ListOptions) -> AppResult<Vec<Entry>> {
        let start_time = Instant::now();

        let mut read_dir = tokio::fs::read_dir(path)
            .await
            .map_err(|e| AppError::listing_failed(path, e.to_string()))?;

        let mut entries: Vec<Entry> = Vec::new();
        loop {
            let next = read_dir
                .next_entry()
                .await
                .map_err(|e| AppError::listing_failed(path, e.to_string()))?;
            let Some(dir_entry) = next else { break };

            let entry_path = dir_entry.path();
            let hidden = entry_path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));

            if hidden && !options.show_hidden {
                continue;
            }

            match Entry::from_path(&entry_path, options.follow_symlinks).await {
                Ok(entry) => entries.push(entry),
                // Vanished between readdir and stat, or unreadable: skip it.
                Err(e) => debug!(
                    marker = "LIST_ENTRY_SKIPPED",
                    operation_type = "directory_listing",
                    path = %entry_path.display(),
                    error = %e,
                    "skipping entry"
                ),
            }
        }

        sort_entries(&mut entries);

        info!(
            marker = "PERF_DIRECTORY_LIST",
            operation_type = "directory_listing",
            path = %path.display(),
            entries = entries.len(),
            duration_us = saturating_micros(start_time.elapsed()),
            "directory listed"
        );

        Ok(entries)
    }
}

struct InFlight {
    generation: Generation,
    token: CancellationToken,
}

/// Runs listings in the background and reports them on a channel.
pub struct ListingDispatcher {
    lister: Arc<dyn DirectoryLister>,
    events: UnboundedSender<ListingEvent>,
    in_flight: HashMap<usize, InFlight>,
}

impl ListingDispatcher {
    #[must_use]
    pub fn new(lister: Arc<dyn DirectoryLister>) -> (Self, UnboundedReceiver<ListingEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                lister,
                events,
                in_flight: HashMap::new(),
            },
            rx,
        )
    }

    /// Starts `request`, superseding any listing running for its column.
    pub fn request(&mut self, request: ListingRequest) {
        if let Some(previous) = self.in_flight.remove(&request.column) {
            trace!(
                marker = "LIST_SUPERSEDED",
                operation_type = "directory_listing",
                column = request.column,
                generation = previous.generation,
                "cancelling superseded listing"
            );
            previous.token.cancel();
        }

        let token = CancellationToken::new();
        self.in_flight.insert(
            request.column,
            InFlight {
                generation: request.generation,
                token: token.clone(),
            },
        );

        let lister = Arc::clone(&self.lister);
        let events = self.events.clone();

        tokio::spawn(async move {
            let ListingRequest {
                column,
                generation,
                path,
                options,
            } = request;

            let result = tokio::select! {
                biased;
                () = token.cancelled() => {
                    trace!(
                        marker = "LIST_CANCELLED",
                        operation_type = "directory_listing",
                        column,
                        generation,
                        "listing cancelled"
                    );
                    return;
                }
                result = lister.list(&path, options) => result,
            };

            let event = match result {
                Ok(entries) => ListingEvent::Loaded {
                    column,
                    generation,
                    path,
                    entries,
                },
                Err(error) => {
                    warn!(
                        marker = "LIST_FAILED",
                        operation_type = "directory_listing",
                        path = %path.display(),
                        error = %error,
                        "listing failed"
                    );
                    ListingEvent::Failed {
                        column,
                        generation,
                        path,
                        error,
                    }
                }
            };

            // Receiver gone means the pane was dropped.
            let _ = events.send(event);
        });
    }

    /// Cancels the listing for `column` if it is still `generation`.
    pub fn cancel(&mut self, column: usize, generation: Generation) {
        if self
            .in_flight
            .get(&column)
            .is_some_and(|f| f.generation == generation)
            && let Some(in_flight) = self.in_flight.remove(&column)
        {
            in_flight.token.cancel();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, in_flight) in self.in_flight.drain() {
            in_flight.token.cancel();
        }
    }

    /// Forgets a listing whose completion has been received.
    pub fn finished(&mut self, column: usize, generation: Generation) {
        if self
            .in_flight
            .get(&column)
            .is_some_and(|f| f.generation == generation)
        {
            self.in_flight.remove(&column);
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl Drop for ListingDispatcher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_in_display_order_without_hidden() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("b.txt"), b"").await.unwrap();
        tokio::fs::write(dir.path().join(".hidden"), b"").await.unwrap();
        tokio::fs::create_dir(dir.path().join("zdir")).await.unwrap();
        tokio::fs::write(dir.path().join("A.txt"), b"").await.unwrap();

        let entries = TokioDirectoryLister
            .list(dir.path(), ListOptions::default())
            .await
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["zdir", "A.txt", "b.txt"]);

        let with_hidden = TokioDirectoryLister
            .list(
                dir.path(),
                ListOptions {
                    show_hidden: true,
                    ..ListOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(with_hidden.len(), 4);
    }

    #[tokio::test]
    async fn missing_directory_is_a_listing_failure() {
        let dir = TempDir::new().unwrap();
        let err = TokioDirectoryLister
            .list(&dir.path().join("gone"), ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ListingFailed { .. }));
    }

    #[tokio::test]
    async fn dispatcher_reports_completion() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("f"), b"").await.unwrap();

        let (mut dispatcher, mut rx) = ListingDispatcher::new(Arc::new(TokioDirectoryLister));
        dispatcher.request(ListingRequest {
            column: 0,
            generation: 7,
            path: dir.path().to_path_buf(),
            options: ListOptions::default(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.column(), 0);
        assert_eq!(event.generation(), 7);
        assert!(matches!(event, ListingEvent::Loaded { ref entries, .. } if entries.len() == 1));

        dispatcher.finished(0, 7);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    struct NeverLister;

    #[async_trait]
    impl DirectoryLister for NeverLister {
        async fn list(&self, _path: &Path, _options: ListOptions) -> AppResult<Vec<Entry>> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn superseded_request_is_cancelled() {
        let (mut dispatcher, mut rx) = ListingDispatcher::new(Arc::new(NeverLister));
        let request = |generation| ListingRequest {
            column: 1,
            generation,
            path: PathBuf::from("/slow"),
            options: ListOptions::default(),
        };

        dispatcher.request(request(1));
        dispatcher.request(request(2));
        assert_eq!(dispatcher.in_flight(), 1);

        dispatcher.cancel(1, 1);
        assert_eq!(dispatcher.in_flight(), 1, "stale generation leaves the live one alone");

        dispatcher.cancel(1, 2);
        assert_eq!(dispatcher.in_flight(), 0);

        drop(dispatcher);
        assert!(rx.recv().await.is_none());
    }
}
