//! HTTP endpoints of the publishing service.

use std::sync::Arc;

use hyper::body::HttpBody;
use hyper::header::HOST;
use hyper::{Body, Request};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{FieldErrors, PublishError};
use crate::fields::{HtmlSanitizer, Slug};
use crate::router::PathParams;
use crate::store::{BackendRegistry, ContentStore, MetadataStore};

mod health;
mod home;
mod manage;
mod publish;
mod read;
mod static_files;

pub use health::HealthEndpoint;
pub use home::home;
pub use manage::{DeleteEndpoint, UpdateEndpoint};
pub use publish::PublishEndpoint;
pub use read::{AdminEndpoint, ReadEndpoint};
pub use static_files::StaticFiles;

/// Largest JSON body accepted by the API.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Collaborators shared by the endpoints.
pub struct Services {
    pub metadata: Arc<dyn MetadataStore>,
    pub content: Arc<ContentStore>,
    pub registry: Arc<BackendRegistry>,
    pub sanitizer: Arc<dyn HtmlSanitizer>,
    pub public_url: Option<Url>,
}

/// Reads and decodes a JSON request body.
pub(crate) async fn read_json<T: DeserializeOwned>(req: Request<Body>) -> Result<T, PublishError> {
    let mut body = req.into_body();
    let mut data = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| PublishError::Network(e.to_string()))?;
        if data.len() + chunk.len() > MAX_BODY_SIZE {
            return Err(PublishError::Validation(FieldErrors::single(
                "body",
                format!("must be at most {} bytes", MAX_BODY_SIZE),
            )));
        }
        data.extend_from_slice(&chunk);
    }
    serde_json::from_slice(&data).map_err(|e| {
        PublishError::Validation(FieldErrors::single("body", format!("invalid JSON: {}", e)))
    })
}

/// The `{slug}` path parameter. Anything that is not a valid slug cannot
/// name a post, so it is reported as missing.
pub(crate) fn slug_param(req: &Request<Body>) -> Result<Slug, PublishError> {
    req.extensions()
        .get::<PathParams>()
        .and_then(|params| params.get("slug"))
        .and_then(|raw| Slug::parse(raw).ok())
        .ok_or(PublishError::NotFound)
}

/// Public address of a post: the configured base URL, or the request's
/// `Host`, with the path replaced by the slug.
pub(crate) fn post_url(
    public_url: Option<&Url>,
    req: &Request<Body>,
    slug: &Slug,
) -> Result<String, PublishError> {
    let mut url = match public_url {
        Some(base) => base.clone(),
        None => {
            let host = req
                .headers()
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .or_else(|| req.uri().authority().map(|a| a.as_str()))
                .unwrap_or("localhost");
            Url::parse(&format!("http://{}", host))
                .map_err(|e| PublishError::Config(format!("bad host {:?}: {}", host, e)))?
        }
    };
    url.set_path(slug.as_str());
    url.set_query(None);
    Ok(url.to_string())
}
