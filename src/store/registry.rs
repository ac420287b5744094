use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::Backend;
use crate::error::StoreError;

/// Keeps track of the backends the service talks to.
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<BTreeMap<String, Arc<dyn Backend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes `backend` and registers it under its name.
    pub async fn register(&self, backend: Arc<dyn Backend>) -> Result<(), StoreError> {
        let name = backend.name().to_string();
        info!("Registering backend: {}", name);

        let mut backends = self.backends.write().await;
        if backends.contains_key(&name) {
            return Err(StoreError::AlreadyRegistered(name));
        }

        match backend.init().await {
            Ok(()) => {
                backends.insert(name.clone(), backend);
                info!("Successfully registered backend: {}", name);
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize backend {}: {}", name, e);
                Err(e)
            }
        }
    }

    pub async fn names(&self) -> Vec<String> {
        self.backends.read().await.keys().cloned().collect()
    }

    pub async fn cleanup(&self) {
        let backends = self.backends.read().await;
        for (name, backend) in backends.iter() {
            if let Err(e) = backend.cleanup().await {
                error!("Error cleaning up backend {}: {}", name, e);
            }
        }
    }

    /// Health of every backend; a failing check counts as unhealthy.
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        let backends = self.backends.read().await;

        for (name, backend) in backends.iter() {
            let healthy = match backend.health_check().await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Health check for {} failed: {}", name, e);
                    false
                }
            };
            results.insert(name.clone(), healthy);
        }
        results
    }
}
