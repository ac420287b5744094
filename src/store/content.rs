use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, info, warn};

use super::{location, Backend};
use crate::error::StoreError;

/// Prefix under which post bodies live in the object store.
pub const CONTENT_BUCKET: &str = "content";

const HEALTH_KEY: &str = "_health";

/// Object-store backed storage for post bodies.
///
/// Bodies are stored gzip-compressed and decompressed on read.
pub struct ContentStore {
    inner: Arc<dyn ObjectStore>,
    location: String,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("location", &self.location)
            .finish()
    }
}

impl ContentStore {
    pub fn from_url(location: &str) -> Result<Self, StoreError> {
        let inner = location::open(location)?;
        info!("Content store at {}", location);
        Ok(Self {
            inner,
            location: location.to_string(),
        })
    }

    pub fn memory() -> Self {
        Self {
            inner: Arc::new(object_store::memory::InMemory::new()),
            location: "memory://".to_string(),
        }
    }

    /// Local directory, created if missing.
    pub fn local(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        Ok(Self {
            inner: location::local(&root)?,
            location: format!("file://{}", root.display()),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn key(slug: &str) -> Result<Path, StoreError> {
        if slug.is_empty() || slug.contains('/') || slug.starts_with('.') {
            return Err(StoreError::InvalidKey(slug.to_string()));
        }
        Ok(Path::from(format!("{}/{}", CONTENT_BUCKET, slug)))
    }

    pub async fn put(&self, slug: &str, html: &str) -> Result<(), StoreError> {
        let key = Self::key(slug)?;
        let encoded = gzip(html.as_bytes())?;
        debug!("Writing {} ({} bytes, {} compressed)", key, html.len(), encoded.len());
        self.inner.put(&key, PutPayload::from(encoded)).await?;
        Ok(())
    }

    pub async fn get(&self, slug: &str) -> Result<String, StoreError> {
        let key = Self::key(slug)?;
        let result = self.inner.get(&key).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StoreError::NotFound(key.to_string()),
            other => StoreError::ObjectStore(other),
        })?;
        let encoded = result.bytes().await?;
        gunzip(&encoded)
    }

    /// Deleting a missing object is not an error.
    pub async fn delete(&self, slug: &str) -> Result<(), StoreError> {
        let key = Self::key(slug)?;
        match self.inner.delete(&key).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                info!("Deleted {}", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gunzip(data: &[u8]) -> Result<String, StoreError> {
    let mut decoded = String::new();
    GzDecoder::new(data).read_to_string(&mut decoded)?;
    Ok(decoded)
}

#[async_trait]
impl Backend for ContentStore {
    fn name(&self) -> &str {
        "content"
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let health_key = Path::from(format!("{}/{}", CONTENT_BUCKET, HEALTH_KEY));
        match self.inner.head(&health_key).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(true),
            Err(e) => {
                warn!("Content store at {} is unreachable: {}", self.location, e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::test;

    #[test]
    async fn test_memory_roundtrip() {
        let store = ContentStore::memory();
        store.put("test", "<p>hello</p>").await.unwrap();
        assert_eq!(store.get("test").await.unwrap(), "<p>hello</p>");

        store.put("test", "<p>updated</p>").await.unwrap();
        assert_eq!(store.get("test").await.unwrap(), "<p>updated</p>");
    }

    #[test]
    async fn test_missing_is_not_found() {
        let store = ContentStore::memory();
        assert!(matches!(
            store.get("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    async fn test_delete() {
        let store = ContentStore::memory();
        store.put("gone", "<p>bye</p>").await.unwrap();
        store.delete("gone").await.unwrap();
        assert!(matches!(store.get("gone").await, Err(StoreError::NotFound(_))));
        store.delete("gone").await.unwrap();
    }

    #[test]
    async fn test_local_files_are_gzipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ContentStore::local(temp_dir.path()).unwrap();
        store.put("post", "<h1>title</h1>").await.unwrap();

        let raw = std::fs::read(temp_dir.path().join(CONTENT_BUCKET).join("post")).unwrap();
        assert_eq!(&raw[..2], &[0x1f_u8, 0x8b]);
        assert_eq!(store.get("post").await.unwrap(), "<h1>title</h1>");

        store.delete("post").await.unwrap();
        store.delete("post").await.unwrap();
        assert!(store.health_check().await.unwrap());
    }

    #[test]
    async fn test_invalid_keys() {
        let store = ContentStore::memory();
        assert!(matches!(store.put("", "x").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.get("a/b").await, Err(StoreError::InvalidKey(_))));
    }

    #[test]
    async fn test_from_url() {
        assert!(ContentStore::from_url("memory://").is_ok());
        assert!(ContentStore::from_url("ftp://host").is_err());
        assert!(ContentStore::from_url("no-scheme").is_err());

        let temp_dir = tempfile::tempdir().unwrap();
        let url = url::Url::from_directory_path(temp_dir.path()).unwrap();
        let store = ContentStore::from_url(url.as_str()).unwrap();
        assert!(store.location().starts_with("file://"));
    }
}
