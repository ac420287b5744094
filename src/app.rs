//! Wires endpoints, routes and middleware into one handler.

use std::sync::Arc;

use hyper::Method;
use tracing::{info, warn};

use crate::caching::{AppState, CacheControl, CacheOptions};
use crate::config::Config;
use crate::endpoints::{
    home, AdminEndpoint, DeleteEndpoint, HealthEndpoint, PublishEndpoint, ReadEndpoint,
    Services, StaticFiles, UpdateEndpoint,
};
use crate::error::PublishError;
use crate::fields::AllowlistSanitizer;
use crate::middleware::{CacheControlMiddleware, Stack, TimeoutMiddleware};
use crate::ratelimit::RateLimit;
use crate::router::Router;
use crate::store::{
    is_memory, Backend, BackendRegistry, ContentStore, MemoryMetadataStore, MetadataStore,
    ObjectMetadataStore,
};

/// Opens the stores named by `config` and registers them for health checks.
///
/// Metadata follows `content_url` unless `metadata_url` says otherwise, so a
/// durable content store gets durable metadata next to it.
pub async fn build_services(config: &Config) -> Result<Arc<Services>, PublishError> {
    let metadata_url = config.metadata_url();
    let (metadata, metadata_backend): (Arc<dyn MetadataStore>, Arc<dyn Backend>) =
        if is_memory(metadata_url) {
            if !is_memory(&config.storage.content_url) {
                warn!("Post metadata is kept in memory and will be lost on restart");
            }
            let store = Arc::new(MemoryMetadataStore::new());
            (store.clone(), store)
        } else {
            let store = Arc::new(ObjectMetadataStore::from_url(metadata_url)?);
            (store.clone(), store)
        };
    let content = Arc::new(ContentStore::from_url(&config.storage.content_url)?);

    let registry = Arc::new(BackendRegistry::new());
    registry.register(metadata_backend).await?;
    registry.register(content.clone()).await?;

    Ok(Arc::new(Services {
        metadata,
        content,
        registry,
        sanitizer: Arc::new(AllowlistSanitizer::new()),
        public_url: config.public_url()?,
    }))
}

pub fn build_app(
    config: &Config,
    services: Arc<Services>,
    state: Arc<AppState>,
) -> Result<Stack, PublishError> {
    let limits_enabled = !config.debug;
    if !limits_enabled {
        info!("Debug mode: rate limits disabled");
    }

    let page_cache = CacheControl::new(&CacheOptions::new().max_age("1h"))?.with_state(state.clone());
    let static_cache =
        CacheControlMiddleware::new(&CacheOptions::new().immutable(true))?.with_state(state);

    let static_files =
        Stack::new(StaticFiles::new(&config.storage.static_dir)).layer(static_cache);

    let router = Router::new()
        .route("/", Method::GET, page_cache.wrap(home))
        .mount("/static", static_files)
        .route(
            "/api/health",
            Method::GET,
            RateLimit::with_enabled(config.health_rate()?, limits_enabled)
                .wrap(HealthEndpoint::new(services.registry.clone())),
        )
        .route(
            "/api/publish",
            Method::POST,
            RateLimit::with_enabled(config.publish_rate()?, limits_enabled)
                .wrap(PublishEndpoint::new(services.clone())),
        )
        .route(
            "/api/{slug}/update",
            Method::POST,
            UpdateEndpoint::new(services.clone()),
        )
        .route(
            "/api/{slug}/delete",
            Method::POST,
            DeleteEndpoint::new(services.clone()),
        )
        .route(
            "/{slug}",
            Method::GET,
            RateLimit::with_enabled(config.read_rate()?, limits_enabled)
                .wrap(page_cache.wrap(ReadEndpoint::new(services.clone()))),
        )
        .route("/{slug}/admin", Method::GET, AdminEndpoint::new(services));

    Ok(Stack::new(router).layer(TimeoutMiddleware::new(config.request_timeout())))
}
