use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

mod content;
mod location;
mod metadata;
mod object_metadata;
mod registry;

pub use content::{ContentStore, CONTENT_BUCKET};
pub use location::is_memory;
pub use metadata::MemoryMetadataStore;
pub use object_metadata::{ObjectMetadataStore, METADATA_BUCKET};
pub use registry::BackendRegistry;

/// External service the application depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// 后端名称（健康检查报告中的键）
    fn name(&self) -> &str;

    /// 初始化后端
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// 清理后端资源
    async fn cleanup(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// 健康检查
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Key-value record kept for each published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub title: String,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

impl PostMetadata {
    pub fn new(title: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            secret_hash: secret_hash.into(),
            created_at: Utc::now(),
        }
    }
}

pub fn metadata_key(slug: &str) -> Result<String, StoreError> {
    if slug.is_empty() {
        return Err(StoreError::InvalidKey(
            "slug must be a non-empty string".into(),
        ));
    }
    Ok(format!("metadata:{}", slug))
}

#[async_trait]
pub trait MetadataStore: Backend {
    async fn get(&self, slug: &str) -> Result<Option<PostMetadata>, StoreError>;

    async fn exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.get(slug).await?.is_some())
    }

    /// Stores `metadata` unless the slug is taken. Returns whether it was stored.
    async fn insert(&self, slug: &str, metadata: PostMetadata) -> Result<bool, StoreError>;

    /// Returns whether anything was removed.
    async fn delete(&self, slug: &str) -> Result<bool, StoreError>;
}
