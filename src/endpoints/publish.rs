use std::sync::Arc;

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

use super::{post_url, read_json, Services};
use crate::credentials::generate_post_creds;
use crate::error::{FieldErrors, PublishError};
use crate::fields::{SafeHtml, Title};
use crate::handler::Handler;
use crate::response;
use crate::store::PostMetadata;

#[derive(Debug, Deserialize)]
struct PublishForm {
    title: Option<String>,
    content: Option<String>,
}

/// `POST /api/publish`: stores a new post and hands back its secret.
pub struct PublishEndpoint {
    services: Arc<Services>,
}

impl PublishEndpoint {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn validate(&self, form: PublishForm) -> Result<(Title, SafeHtml), PublishError> {
        let mut errors = FieldErrors::new();

        let title = match form.title.as_deref().map(Title::parse) {
            Some(Ok(title)) => Some(title),
            Some(Err(message)) => {
                errors.add("title", message);
                None
            }
            None => {
                errors.add("title", "field required");
                None
            }
        };
        let content = match form.content {
            Some(raw) => Some(SafeHtml::new(&raw, self.services.sanitizer.as_ref())),
            None => {
                errors.add("content", "field required");
                None
            }
        };

        match (title, content) {
            (Some(title), Some(content)) => Ok((title, content)),
            _ => Err(PublishError::Validation(errors)),
        }
    }

    #[instrument(skip_all)]
    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, PublishError> {
        let (parts, body) = req.into_parts();
        let form: PublishForm = read_json(Request::new(body)).await?;
        let (title, content) = self.validate(form)?;
        let slug = title.slug();

        if self.services.metadata.exists(&slug).await? {
            return Err(PublishError::Validation(FieldErrors::single(
                "title",
                "is already being used",
            )));
        }

        let (secret, secret_hash) = generate_post_creds().await?;
        let metadata = PostMetadata::new(title.as_str(), secret_hash);
        // 并发发布同一标题时只有一个能写入
        if !self.services.metadata.insert(&slug, metadata).await? {
            return Err(PublishError::Validation(FieldErrors::single(
                "title",
                "is already being used",
            )));
        }
        if let Err(e) = self.services.content.put(&slug, content.as_str()).await {
            // 内容写入失败时释放标题
            if let Err(cleanup) = self.services.metadata.delete(&slug).await {
                error!("Failed to release {} after content error: {}", slug, cleanup);
            }
            return Err(e.into());
        }

        let req = Request::from_parts(parts, Body::empty());
        let url = post_url(self.services.public_url.as_ref(), &req, &slug)?;
        info!("Published {}", slug);
        Ok(response::json(
            StatusCode::OK,
            &json!({ "secret": secret, "url": url }),
        ))
    }
}

#[async_trait]
impl Handler for PublishEndpoint {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        self.handle(req)
            .await
            .unwrap_or_else(PublishError::into_response)
    }
}
