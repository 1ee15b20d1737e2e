//! Read-only storage backend.
//!
//! Wraps another backend for consumers that only browse the archive (the
//! listing and export commands, or anything serving the image directory).
//! Write operations are dropped but report success.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, FileInfo, StorageBackend, backend::FileInfoStream, error::Result};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        self.inner.list_stream()
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), bytes = data.len(), "Skipping write to read-only image store");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), "Skipping delete from read-only image store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reads_pass_through_writes_are_dropped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let local = LocalBackend::new("imgs", temp_dir.path()).unwrap();
        local.write(Path::new("0.gif"), b"GIF89a").await.unwrap();
        let backend = ReadOnlyBackend::new(Arc::new(local));
        assert_eq!(backend.name(), "imgs");
        assert_eq!(backend.read(Path::new("0.gif")).await.unwrap(), b"GIF89a");
        assert_eq!(backend.list().await.unwrap().len(), 1);

        backend.write(Path::new("1.gif"), b"data").await.unwrap();
        assert!(!backend.exists(Path::new("1.gif")).await.unwrap());
        backend.delete(Path::new("0.gif")).await.unwrap();
        assert!(backend.exists(Path::new("0.gif")).await.unwrap());
    }
}
