use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Request, Response};

use crate::handler::Handler;

mod cache_control;
mod timeout;

pub use cache_control::CacheControlMiddleware;
pub use timeout::TimeoutMiddleware;

/// Request interceptor sitting in front of a [`Handler`].
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, req: Request<Body>, next: Next<'_>) -> Response<Body>;
}

/// The rest of the chain after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    endpoint: &'a dyn Handler,
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub async fn run(self, req: Request<Body>) -> Response<Body> {
        match self.chain.split_first() {
            Some((current, rest)) => {
                current
                    .handle(
                        req,
                        Next {
                            endpoint: self.endpoint,
                            chain: rest,
                        },
                    )
                    .await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

/// An endpoint with middleware in front of it.
///
/// Middleware runs in the order it was added: the first layer sees the
/// request first and the response last.
pub struct Stack {
    middleware: Vec<Arc<dyn Middleware>>,
    endpoint: Arc<dyn Handler>,
}

impl Stack {
    pub fn new<H: Handler>(endpoint: H) -> Self {
        Self {
            middleware: Vec::new(),
            endpoint: Arc::new(endpoint),
        }
    }

    pub fn layer<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

#[async_trait]
impl Handler for Stack {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        Next {
            endpoint: self.endpoint.as_ref(),
            chain: &self.middleware,
        }
        .run(req)
        .await
    }
}
