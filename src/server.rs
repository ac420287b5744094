use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use hyper::server::conn::AddrStream;
use hyper::service::make_service_fn;
use hyper::{Body, Request, Response, Server};
use tower::{Service, ServiceBuilder};
use tower_http::compression::{Compression, CompressionLayer};
use tracing::{debug, error, info};

use crate::error::PublishError;
use crate::handler::Handler;
use crate::logger::log_request;
use crate::ratelimit::ClientAddr;

/// HTTP front end: accepts connections and hands each request to the app.
pub struct PublishServer {
    addr: SocketAddr,
    app: Arc<dyn Handler>,
}

impl PublishServer {
    pub fn new<H: Handler>(addr: SocketAddr, app: H) -> Self {
        info!("Creating publish server on {}", addr);
        Self {
            addr,
            app: Arc::new(app),
        }
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    #[tracing::instrument(skip(self, shutdown))]
    pub async fn run<F>(self, shutdown: F) -> Result<(), PublishError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.app.clone();

        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let remote_addr = conn.remote_addr();
            debug!("New connection from: {}", remote_addr);

            let app = app.clone();
            async move { Ok::<_, Infallible>(http_service(app, remote_addr)) }
        });

        let server = Server::try_bind(&self.addr)
            .map_err(|e| PublishError::Network(format!("cannot bind {}: {}", self.addr, e)))?
            .serve(make_svc)
            .with_graceful_shutdown(shutdown);
        info!("Listening on http://{}", self.addr);

        if let Err(e) = server.await {
            error!("Server error: {}", e);
            return Err(PublishError::Network(e.to_string()));
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Per-connection service: the app behind gzip negotiation.
pub fn http_service(app: Arc<dyn Handler>, remote_addr: SocketAddr) -> Compression<AppService> {
    ServiceBuilder::new()
        .layer(CompressionLayer::new())
        .service(AppService { app, remote_addr })
}

/// Adapts a [`Handler`] to `tower::Service` for one connection.
#[derive(Clone)]
pub struct AppService {
    app: Arc<dyn Handler>,
    remote_addr: SocketAddr,
}

impl Service<Request<Body>> for AppService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let app = self.app.clone();
        req.extensions_mut().insert(ClientAddr(self.remote_addr));

        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            let response = app.call(req).await;
            log_request(&method, &path, response.status(), started.elapsed());
            Ok(response)
        })
    }
}
