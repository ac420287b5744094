use std::sync::Arc;

use async_trait::async_trait;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use tracing::{debug, info, warn};

use super::{location, metadata_key, Backend, MetadataStore, PostMetadata};
use crate::error::StoreError;

/// Prefix under which metadata records live in the object store.
pub const METADATA_BUCKET: &str = "metadata";

const HEALTH_KEY: &str = "_health";

/// Post metadata kept as one JSON object per slug, so it survives restarts
/// alongside the post bodies.
pub struct ObjectMetadataStore {
    inner: Arc<dyn ObjectStore>,
    location: String,
}

impl ObjectMetadataStore {
    pub fn from_url(location: &str) -> Result<Self, StoreError> {
        let inner = location::open(location)?;
        info!("Metadata store at {}", location);
        Ok(Self {
            inner,
            location: location.to_string(),
        })
    }

    fn key(slug: &str) -> Result<Path, StoreError> {
        metadata_key(slug)?;
        if slug.contains('/') || slug.starts_with('.') {
            return Err(StoreError::InvalidKey(slug.to_string()));
        }
        Ok(Path::from(format!("{}/{}.json", METADATA_BUCKET, slug)))
    }
}

#[async_trait]
impl Backend for ObjectMetadataStore {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let health_key = Path::from(format!("{}/{}", METADATA_BUCKET, HEALTH_KEY));
        match self.inner.head(&health_key).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(true),
            Err(e) => {
                warn!("Metadata store at {} is unreachable: {}", self.location, e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl MetadataStore for ObjectMetadataStore {
    async fn get(&self, slug: &str) -> Result<Option<PostMetadata>, StoreError> {
        let key = Self::key(slug)?;
        let result = match self.inner.get(&key).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!("Metadata lookup for {}: miss", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let raw = result.bytes().await?;
        debug!("Metadata lookup for {}: hit", key);
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn insert(&self, slug: &str, metadata: PostMetadata) -> Result<bool, StoreError> {
        let key = Self::key(slug)?;
        let payload = PutPayload::from(serde_json::to_vec(&metadata)?);
        // 只在对象不存在时写入
        match self
            .inner
            .put_opts(&key, payload, PutOptions::from(PutMode::Create))
            .await
        {
            Ok(_) => {
                info!("Stored metadata under {}", key);
                Ok(true)
            }
            Err(object_store::Error::AlreadyExists { .. }) => {
                debug!("Metadata key {} already taken", key);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, slug: &str) -> Result<bool, StoreError> {
        let key = Self::key(slug)?;
        match self.inner.head(&key).await {
            Ok(_) => {}
            Err(object_store::Error::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        match self.inner.delete(&key).await {
            Ok(()) => {
                info!("Deleted metadata {}", key);
                Ok(true)
            }
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::test;

    fn store_at(dir: &std::path::Path) -> ObjectMetadataStore {
        let url = url::Url::from_directory_path(dir).unwrap();
        ObjectMetadataStore::from_url(url.as_str()).unwrap()
    }

    #[test]
    async fn test_insert_only_if_absent() {
        let store = ObjectMetadataStore::from_url("memory://").unwrap();
        assert!(store.insert("test", PostMetadata::new("Test", "h1")).await.unwrap());
        assert!(!store.insert("test", PostMetadata::new("Other", "h2")).await.unwrap());
        assert_eq!(store.get("test").await.unwrap().unwrap().secret_hash, "h1");
    }

    #[test]
    async fn test_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let metadata = PostMetadata::new("Keep", "hash");
        assert!(store_at(temp_dir.path())
            .insert("keep", metadata.clone())
            .await
            .unwrap());

        let reopened = store_at(temp_dir.path());
        assert_eq!(reopened.get("keep").await.unwrap(), Some(metadata));
        assert!(!reopened
            .insert("keep", PostMetadata::new("Keep", "other"))
            .await
            .unwrap());
        assert!(temp_dir
            .path()
            .join(METADATA_BUCKET)
            .join("keep.json")
            .exists());
    }

    #[test]
    async fn test_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_at(temp_dir.path());
        store.insert("gone", PostMetadata::new("Gone", "h")).await.unwrap();
        assert!(store.delete("gone").await.unwrap());
        assert!(!store.delete("gone").await.unwrap());
        assert_eq!(store.get("gone").await.unwrap(), None);
        assert!(store.health_check().await.unwrap());
    }

    #[test]
    async fn test_invalid_keys() {
        let store = ObjectMetadataStore::from_url("memory://").unwrap();
        assert!(matches!(store.get("").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.get("a/b").await, Err(StoreError::InvalidKey(_))));
    }
}
