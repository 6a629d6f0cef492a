use std::future::Future;
use std::path::PathBuf;

use anyhow::{Result, bail};
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Keyed object storage for picto images.
pub trait BlobStore: Send + Sync + 'static {
    /// Whether `bucket` is present. Says nothing about individual keys.
    fn exists(&self, bucket: &str) -> impl Future<Output = Result<bool>> + Send;

    fn put(&self, key: &str, content: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Delete the object at `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Blob store backed by a directory tree.
///
/// Buckets are subdirectories of `root`; objects live at `{root}/{bucket}/{key}`.
pub struct FsBlobStore {
    root: PathBuf,
    bucket: String,
}

impl FsBlobStore {
    pub async fn new(root: PathBuf, bucket: &str) -> Result<Self> {
        validate_key(bucket)?;
        fs::create_dir_all(root.join(bucket)).await?;
        info!("Blob storage directory: {}/{}", root.display(), bucket);
        Ok(Self {
            root,
            bucket: bucket.to_string(),
        })
    }

    /// Path to the object for a given key.
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(&self.bucket).join(key))
    }
}

impl BlobStore for FsBlobStore {
    async fn exists(&self, bucket: &str) -> Result<bool> {
        validate_key(bucket)?;
        match fs::metadata(self.root.join(bucket)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        let path = self.object_path(key)?;
        let mut file = fs::File::create(&path).await?;
        file.write_all(&content).await?;
        file.flush().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys are single path components, so a key can never escape its bucket.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\', '\0']) {
        bail!("Invalid blob key: {:?}", key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pictalk-blob-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_then_remove() {
        let root = scratch_dir();
        let store = FsBlobStore::new(root.clone(), "pictalk").await.unwrap();
        assert!(store.exists("pictalk").await.unwrap());
        assert!(!store.exists("elsewhere").await.unwrap());

        store.put("cat.png", Bytes::from_static(b"meow")).await.unwrap();
        let path = store.object_path("cat.png").unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"meow");

        store.remove("cat.png").await.unwrap();
        assert!(fs::metadata(&path).await.is_err());

        // idempotent
        store.remove("cat.png").await.unwrap();

        fs::remove_dir_all(root).await.ok();
    }

    #[tokio::test]
    async fn traversal_keys_rejected() {
        let root = scratch_dir();
        let store = FsBlobStore::new(root.clone(), "pictalk").await.unwrap();
        assert!(store.put("../escape.png", Bytes::new()).await.is_err());
        assert!(store.remove("..").await.is_err());
        assert!(store.exists("a/b").await.is_err());
        fs::remove_dir_all(root).await.ok();
    }
}
