use std::time::Duration;

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use tracing::warn;

use super::{Middleware, Next};
use crate::response;

/// Answers `408 Request Timeout` when the rest of the chain takes longer
/// than `timeout`. The unfinished handler future is dropped.
#[derive(Debug, Clone)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    async fn handle(&self, req: Request<Body>, next: Next<'_>) -> Response<Body> {
        let path = req.uri().path().to_string();
        match tokio::time::timeout(self.timeout, next.run(req)).await {
            Ok(res) => res,
            Err(_) => {
                warn!("Request to {} timed out after {:?}", path, self.timeout);
                response::status(StatusCode::REQUEST_TIMEOUT)
            }
        }
    }
}
