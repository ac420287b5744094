use std::path::Path;
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use tracing::info;

use crate::error::StoreError;

/// Opens the object store named by `location`:
/// - `memory://`
/// - `file:///absolute/path` (created if missing)
/// - `s3://bucket` (credentials and region from the environment)
pub(crate) fn open(location: &str) -> Result<Arc<dyn ObjectStore>, StoreError> {
    let (scheme, rest) = location
        .split_once("://")
        .ok_or_else(|| StoreError::InvalidUrl(location.to_string()))?;

    match scheme {
        "memory" => Ok(Arc::new(InMemory::new())),
        "file" => {
            let path = url::Url::parse(location)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| StoreError::InvalidUrl(location.to_string()))?;
            local(&path)
        }
        "s3" => {
            let bucket = rest.trim_end_matches('/');
            if bucket.is_empty() || bucket.contains('/') {
                return Err(StoreError::InvalidUrl(format!(
                    "{}: expected s3://<bucket>",
                    location
                )));
            }
            info!("Opening S3 bucket {}", bucket);
            Ok(Arc::new(
                object_store::aws::AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .build()?,
            ))
        }
        other => Err(StoreError::InvalidUrl(format!(
            "unsupported scheme \"{}\"",
            other
        ))),
    }
}

pub(crate) fn local(root: &Path) -> Result<Arc<dyn ObjectStore>, StoreError> {
    std::fs::create_dir_all(root)?;
    info!("Opening local store at {:?}", root);
    Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
}

/// `true` for locations whose data does not outlive the process.
pub fn is_memory(location: &str) -> bool {
    location.starts_with("memory://")
}
