use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Request, Response};

use super::{Middleware, Next};
use crate::caching::{AppState, CacheControl, CacheOptions};
use crate::error::CacheControlError;

/// Applies a [`CacheControl`] policy to every response passing through.
///
/// Only the response head is inspected: the body stream is handed back
/// unchanged without being polled or buffered.
pub struct CacheControlMiddleware {
    policy: CacheControl,
}

impl CacheControlMiddleware {
    pub fn new(options: &CacheOptions) -> Result<Self, CacheControlError> {
        Ok(Self {
            policy: CacheControl::new(options)?,
        })
    }

    pub fn with_state(mut self, state: Arc<AppState>) -> Self {
        self.policy = self.policy.with_state(state);
        self
    }
}

#[async_trait]
impl Middleware for CacheControlMiddleware {
    async fn handle(&self, req: Request<Body>, next: Next<'_>) -> Response<Body> {
        let method = req.method().clone();
        let (mut head, body) = next.run(req).await.into_parts();
        self.policy.apply(&method, head.status, &mut head.headers);
        Response::from_parts(head, body)
    }
}
