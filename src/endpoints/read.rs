use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use tracing::{debug, instrument};

use super::{slug_param, Services};
use crate::error::PublishError;
use crate::handler::Handler;
use crate::response;
use crate::store::PostMetadata;
use crate::templates;

async fn load(services: &Services, slug: &str) -> Result<(PostMetadata, String), PublishError> {
    let metadata = services
        .metadata
        .get(slug)
        .await?
        .ok_or(PublishError::NotFound)?;
    let content = services.content.get(slug).await?;
    debug!("Loaded {} ({} bytes)", slug, content.len());
    Ok((metadata, content))
}

/// `GET /{slug}`: renders a published post.
pub struct ReadEndpoint {
    services: Arc<Services>,
}

impl ReadEndpoint {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    #[instrument(skip_all)]
    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, PublishError> {
        let slug = slug_param(&req)?;
        let (metadata, content) = load(&self.services, &slug).await?;
        Ok(response::html(
            StatusCode::OK,
            templates::read_page(&metadata.title, &content),
        ))
    }
}

#[async_trait]
impl Handler for ReadEndpoint {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        self.handle(req)
            .await
            .unwrap_or_else(PublishError::into_response)
    }
}

/// `GET /{slug}/admin`: edit and delete form for a post.
pub struct AdminEndpoint {
    services: Arc<Services>,
}

impl AdminEndpoint {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, PublishError> {
        let slug = slug_param(&req)?;
        let (metadata, content) = load(&self.services, &slug).await?;
        Ok(response::html(
            StatusCode::OK,
            templates::admin_page(&slug, &metadata.title, &content),
        ))
    }
}

#[async_trait]
impl Handler for AdminEndpoint {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        self.handle(req)
            .await
            .unwrap_or_else(PublishError::into_response)
    }
}
