use std::future::Future;

use async_trait::async_trait;
use hyper::{Body, Request, Response};

use crate::caching::CacheControl;

/// Anything that turns a request into a response.
///
/// Implemented for async closures `Fn(Request<Body>) -> impl Future`, for
/// synchronous functions through [`SyncHandler`], and for the endpoint types.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: Request<Body>) -> Response<Body>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        (self)(req).await
    }
}

/// Adapts a blocking-free synchronous function to [`Handler`].
pub struct SyncHandler<F>(pub F);

pub fn sync_handler<F>(f: F) -> SyncHandler<F>
where
    F: Fn(Request<Body>) -> Response<Body> + Send + Sync + 'static,
{
    SyncHandler(f)
}

#[async_trait]
impl<F> Handler for SyncHandler<F>
where
    F: Fn(Request<Body>) -> Response<Body> + Send + Sync + 'static,
{
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        (self.0)(req)
    }
}

/// Handler wrapper that applies a [`CacheControl`] policy to whatever the
/// inner handler returns. Arguments and the response are passed through as is.
pub struct CacheControlled<H> {
    inner: H,
    policy: CacheControl,
}

#[async_trait]
impl<H: Handler> Handler for CacheControlled<H> {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let mut response = self.inner.call(req).await;
        let status = response.status();
        self.policy.apply(&method, status, response.headers_mut());
        response
    }
}

impl CacheControl {
    /// Decorates `handler` with this policy.
    pub fn wrap<H: Handler>(&self, handler: H) -> CacheControlled<H> {
        CacheControlled {
            inner: handler,
            policy: self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::{AppState, CacheOptions};
    use std::sync::Arc;
    use crate::response;
    use hyper::header::CACHE_CONTROL;
    use hyper::{Method, StatusCode};

    const CASES: [(Method, u16, bool); 5] = [
        (Method::GET, 200, true),
        (Method::GET, 304, false),
        (Method::GET, 500, false),
        (Method::POST, 200, false),
        (Method::HEAD, 200, false),
    ];

    fn policy() -> CacheControl {
        CacheControl::new(&CacheOptions::new().max_age("1s")).unwrap()
    }

    fn request(method: Method, status: u16) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/")
            .header("x-status", status.to_string())
            .body(Body::empty())
            .unwrap()
    }

    fn status_from(req: &Request<Body>) -> StatusCode {
        let raw = req.headers()["x-status"].to_str().unwrap().parse().unwrap();
        StatusCode::from_u16(raw).unwrap()
    }

    async fn check<H: Handler>(handler: &H, method: Method, status: u16, expected: bool) {
        let res = handler.call(request(method.clone(), status)).await;
        assert_eq!(res.status().as_u16(), status);
        assert_eq!(
            res.headers().contains_key(CACHE_CONTROL),
            expected,
            "{} {}",
            method,
            status
        );
        if expected {
            assert_eq!(res.headers()[CACHE_CONTROL], "max-age=1");
        }
    }

    #[tokio::test]
    async fn test_sync_handler() {
        let handler = policy().wrap(sync_handler(|req: Request<Body>| {
            response::status(status_from(&req))
        }));
        for (method, status, expected) in CASES {
            check(&handler, method, status, expected).await;
        }
    }

    #[tokio::test]
    async fn test_async_handler() {
        let handler = policy().wrap(|req: Request<Body>| async move {
            tokio::task::yield_now().await;
            response::status(status_from(&req))
        });
        for (method, status, expected) in CASES {
            check(&handler, method, status, expected).await;
        }
    }

    #[tokio::test]
    async fn test_globally_disabled() {
        for enabled in [true, false] {
            let state = Arc::new(AppState::with_cache_control(Some(enabled)));
            let handler = policy()
                .with_state(state)
                .wrap(sync_handler(|_req: Request<Body>| response::status(StatusCode::OK)));
            let res = handler.call(request(Method::GET, 200)).await;
            assert_eq!(res.headers().contains_key(CACHE_CONTROL), enabled);
        }
    }

    #[tokio::test]
    async fn test_body_forwarded_untouched() {
        let handler = policy().wrap(sync_handler(|_req: Request<Body>| {
            response::html(StatusCode::OK, "<p>hello</p>".to_string())
        }));
        let res = handler.call(request(Method::GET, 200)).await;
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], b"<p>hello</p>");
    }
}
