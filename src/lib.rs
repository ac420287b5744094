pub mod app;
pub mod caching;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod fields;
pub mod handler;
pub mod logger;
pub mod middleware;
pub mod ratelimit;
pub mod response;
pub mod router;
pub mod server;
pub mod store;
pub mod templates;

pub use config::Config;
pub use error::{CacheControlError, PublishError, StoreError};

pub mod prelude {
    pub use crate::app::{build_app, build_services};
    pub use crate::caching::{AppState, CacheControl, CacheOptions};
    pub use crate::handler::Handler;
    pub use crate::middleware::{CacheControlMiddleware, Middleware, Stack};
    pub use crate::server::PublishServer;
    pub use crate::store::{Backend, BackendRegistry, MetadataStore};
}
