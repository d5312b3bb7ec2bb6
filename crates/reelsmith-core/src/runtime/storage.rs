use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Opaque handle to a blob held in a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    id: Uuid,
}

impl BlobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stable `blob:` reference suitable for log lines and task views.
    pub fn url(&self) -> String {
        format!("blob:reelsmith/{}", self.id)
    }
}

/// An in-memory artifact payload.
#[derive(Debug, Clone)]
pub struct Blob {
    pub mime_type: String,
    pub data: Bytes,
}

/// Locally-owned transient memory for generated artifacts.
///
/// Blobs live until [`BlobStore::revoke`] is called, either directly or via
/// [`BlobStore::revoke_after`] once a download has been triggered. Uses a
/// `tokio::sync::RwLock<HashMap>` so observers can read while the
/// orchestrator inserts.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<RwLock<HashMap<Uuid, Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `data` and return a handle to it.
    pub async fn create(&self, data: Bytes, mime_type: impl Into<String>) -> BlobHandle {
        let id = Uuid::new_v4();
        let blob = Blob {
            mime_type: mime_type.into(),
            data,
        };
        self.inner.write().await.insert(id, blob);
        BlobHandle { id }
    }

    /// Cheap clone of the blob behind `handle`, if it is still held.
    pub async fn get(&self, handle: &BlobHandle) -> Option<Blob> {
        self.inner.read().await.get(&handle.id).cloned()
    }

    /// Release the blob. Returns `true` if it was still held.
    pub async fn revoke(&self, handle: &BlobHandle) -> bool {
        let released = self.inner.write().await.remove(&handle.id).is_some();
        if released {
            debug!(blob = %handle.url(), "blob released");
        }
        released
    }

    /// Schedule [`BlobStore::revoke`] after `grace` has elapsed.
    pub fn revoke_after(
        &self,
        handle: BlobHandle,
        grace: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            store.revoke(&handle).await;
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_get_revoke() {
        let store = BlobStore::new();
        let handle = store
            .create(Bytes::from_static(b"frame"), "image/png")
            .await;
        assert!(handle.url().starts_with("blob:"));

        let blob = store.get(&handle).await.expect("blob should be held");
        assert_eq!(blob.data, Bytes::from_static(b"frame"));
        assert_eq!(blob.mime_type, "image/png");

        assert!(store.revoke(&handle).await);
        assert!(!store.revoke(&handle).await);
        assert!(store.get(&handle).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn revoke_after_waits_for_grace_period() {
        let store = BlobStore::new();
        let handle = store.create(Bytes::from_static(b"clip"), "video/mp4").await;

        let task = store.revoke_after(handle.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(store.len().await, 1, "blob must survive the grace period");

        task.await.expect("revoke task should not panic");
        assert!(store.get(&handle).await.is_none());
    }
}
