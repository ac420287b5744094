use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{metadata_key, Backend, MetadataStore, PostMetadata};
use crate::error::StoreError;

/// In-process key-value store for post metadata.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    entries: RwLock<HashMap<String, PostMetadata>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Backend for MemoryMetadataStore {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn init(&self) -> Result<(), StoreError> {
        info!("Initializing in-memory metadata store");
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        let entries = self.entries.read().await;
        info!("Dropping {} metadata entries", entries.len());
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, slug: &str) -> Result<Option<PostMetadata>, StoreError> {
        let key = metadata_key(slug)?;
        let entries = self.entries.read().await;
        let found = entries.get(&key).cloned();
        debug!("Metadata lookup for {}: {}", key, if found.is_some() { "hit" } else { "miss" });
        Ok(found)
    }

    async fn insert(&self, slug: &str, metadata: PostMetadata) -> Result<bool, StoreError> {
        let key = metadata_key(slug)?;
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            debug!("Metadata key {} already taken", key);
            return Ok(false);
        }
        entries.insert(key.clone(), metadata);
        info!("Stored metadata under {}", key);
        Ok(true)
    }

    async fn delete(&self, slug: &str) -> Result<bool, StoreError> {
        let key = metadata_key(slug)?;
        let removed = self.entries.write().await.remove(&key).is_some();
        if removed {
            info!("Deleted metadata {}", key);
        }
        Ok(removed)
    }
}
