use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{post_url, read_json, slug_param, Services};
use crate::credentials::verify_secret;
use crate::error::{FieldErrors, PublishError};
use crate::fields::{SafeHtml, Slug};
use crate::handler::Handler;
use crate::response;

fn required(value: Option<String>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    if value.is_none() {
        errors.add(field, "field required");
    }
    value
}

/// Looks the post up and checks the caller's secret against it.
async fn authorize(services: &Services, slug: &Slug, secret: &str) -> Result<(), PublishError> {
    let metadata = services
        .metadata
        .get(slug)
        .await?
        .ok_or(PublishError::NotFound)?;
    if !verify_secret(secret, &metadata.secret_hash).await {
        warn!("Rejected secret for {}", slug);
        return Err(PublishError::Validation(FieldErrors::single(
            "secret",
            "is incorrect",
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct UpdateForm {
    secret: Option<String>,
    content: Option<String>,
}

/// `POST /api/{slug}/update`: replaces the body of a post.
pub struct UpdateEndpoint {
    services: Arc<Services>,
}

impl UpdateEndpoint {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    #[instrument(skip_all)]
    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, PublishError> {
        let slug = slug_param(&req)?;
        let (parts, body) = req.into_parts();
        let form: UpdateForm = read_json(Request::new(body)).await?;

        let mut errors = FieldErrors::new();
        let secret = required(form.secret, "secret", &mut errors);
        let content = required(form.content, "content", &mut errors);
        let (secret, content) = match (secret, content) {
            (Some(secret), Some(content)) => (secret, content),
            _ => return Err(PublishError::Validation(errors)),
        };

        authorize(&self.services, &slug, &secret).await?;
        let content = SafeHtml::new(&content, self.services.sanitizer.as_ref());
        self.services.content.put(&slug, content.as_str()).await?;

        let req = Request::from_parts(parts, Body::empty());
        let url = post_url(self.services.public_url.as_ref(), &req, &slug)?;
        info!("Updated {}", slug);
        Ok(response::json(StatusCode::OK, &json!({ "url": url })))
    }
}

#[async_trait]
impl Handler for UpdateEndpoint {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        self.handle(req)
            .await
            .unwrap_or_else(PublishError::into_response)
    }
}

#[derive(Debug, Deserialize)]
struct DeleteForm {
    secret: Option<String>,
}

/// `POST /api/{slug}/delete`: removes a post and its body.
pub struct DeleteEndpoint {
    services: Arc<Services>,
}

impl DeleteEndpoint {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    #[instrument(skip_all)]
    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, PublishError> {
        let slug = slug_param(&req)?;
        let form: DeleteForm = read_json(req).await?;

        let mut errors = FieldErrors::new();
        let secret = match required(form.secret, "secret", &mut errors) {
            Some(secret) => secret,
            None => return Err(PublishError::Validation(errors)),
        };

        authorize(&self.services, &slug, &secret).await?;
        self.services.metadata.delete(&slug).await?;
        self.services.content.delete(&slug).await?;

        info!("Deleted {}", slug);
        Ok(response::json(StatusCode::OK, &json!({})))
    }
}

#[async_trait]
impl Handler for DeleteEndpoint {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        self.handle(req)
            .await
            .unwrap_or_else(PublishError::into_response)
    }
}
