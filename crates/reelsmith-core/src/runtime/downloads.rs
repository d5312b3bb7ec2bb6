use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::runtime::storage::BlobStore;
use crate::runtime::types::ArtifactRef;

/// Pause between two emitted downloads.
pub const DOWNLOAD_SPACING: Duration = Duration::from_secs(1);

/// How long a blob outlives its download trigger.
pub const BLOB_GRACE: Duration = Duration::from_secs(60);

/// What a sink receives for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    Bytes { data: Bytes, mime_type: String },
    /// Upstream link the sink has to fetch itself.
    Url(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
}

/// Destination for triggered downloads (a directory, a browser bridge, ...).
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn emit(&self, filename: &str, source: DownloadSource) -> Result<(), SinkError>;
}

/// A queued `(artifact, filename)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDownload {
    pub artifact: ArtifactRef,
    pub filename: String,
}

/// Log line shown on the last task when several files are about to land.
pub fn multiple_downloads_notice(count: usize) -> String {
    format!(
        "Downloading all {count} files. If a download permission prompt appears, choose Allow."
    )
}

/// Accumulates artifacts during a run and emits them afterwards, spaced by
/// [`DOWNLOAD_SPACING`], in the order they were queued.
#[derive(Debug)]
pub struct DownloadBatcher {
    store: BlobStore,
    queue: Vec<PendingDownload>,
    spacing: Duration,
    grace: Duration,
}

impl DownloadBatcher {
    pub fn new(store: BlobStore) -> Self {
        Self {
            store,
            queue: Vec::new(),
            spacing: DOWNLOAD_SPACING,
            grace: BLOB_GRACE,
        }
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn push(&mut self, artifact: ArtifactRef, filename: impl Into<String>) {
        self.queue.push(PendingDownload {
            artifact,
            filename: filename.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Emit every queued download and return how many reached the sink.
    ///
    /// Sink failures are logged and skipped. Blob-backed artifacts are
    /// released [`BLOB_GRACE`] after their trigger whether or not the sink
    /// succeeded.
    pub async fn flush(&mut self, sink: &dyn DownloadSink) -> usize {
        if self.queue.is_empty() {
            return 0;
        }
        info!(count = self.queue.len(), "starting batch download");

        let mut emitted = 0;
        for (idx, item) in std::mem::take(&mut self.queue).into_iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.spacing).await;
            }

            let source = match &item.artifact {
                ArtifactRef::Blob(handle) => match self.store.get(handle).await {
                    Some(blob) => DownloadSource::Bytes {
                        data: blob.data,
                        mime_type: blob.mime_type,
                    },
                    None => {
                        warn!(filename = %item.filename, blob = %handle.url(), "blob already released; skipping download");
                        continue;
                    }
                },
                ArtifactRef::Remote(url) => DownloadSource::Url(url.clone()),
            };

            match sink.emit(&item.filename, source).await {
                Ok(()) => {
                    emitted += 1;
                    info!(filename = %item.filename, "download triggered");
                }
                Err(e) => warn!(filename = %item.filename, error = %e, "download failed"),
            }

            if let ArtifactRef::Blob(handle) = item.artifact {
                self.store.revoke_after(handle, self.grace);
            }
        }
        emitted
    }
}
