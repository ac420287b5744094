use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use tracing::debug;

use crate::handler::Handler;
use crate::response;
use crate::store::BackendRegistry;

/// `GET /api/health`: one boolean per registered backend.
pub struct HealthEndpoint {
    registry: Arc<BackendRegistry>,
}

impl HealthEndpoint {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Handler for HealthEndpoint {
    async fn call(&self, _req: Request<Body>) -> Response<Body> {
        let health = self.registry.health_check().await;
        debug!("Health: {:?}", health);
        response::json(StatusCode::OK, &health)
    }
}
