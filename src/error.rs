use std::collections::BTreeMap;

use hyper::{Body, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::response;

/// Errors raised while building a `Cache-Control` value.
///
/// These only ever surface at configuration time; the per-response policy
/// never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheControlError {
    #[error("invalid duration \"{value}\": {reason}")]
    InvalidDuration { value: String, reason: String },
    #[error("invalid directive name: \"{0}\"")]
    InvalidDirective(String),
    #[error("cache-control header should not be empty")]
    EmptyDirectiveSet,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Backend already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Invalid store url: {0}")]
    InvalidUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Validation messages keyed by field name, rendered as a 422 body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), PublishError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Validation(self))
        }
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Not found")]
    NotFound,
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("Credential error: {0}")]
    Credentials(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Cache control error: {0}")]
    CacheControl(#[from] CacheControlError),
    #[error("Network error: {0}")]
    Network(String),
}

impl From<StoreError> for PublishError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => PublishError::NotFound,
            other => PublishError::Store(other),
        }
    }
}

impl PublishError {
    pub fn status(&self) -> StatusCode {
        match self {
            PublishError::NotFound => StatusCode::NOT_FOUND,
            PublishError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PublishError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        match self {
            PublishError::NotFound => response::text(status, "Not Found"),
            PublishError::Validation(errors) => response::json(status, &errors),
            PublishError::RateLimited(limit) => response::json(
                status,
                &serde_json::json!({ "error": format!("Rate limit exceeded: {}", limit) }),
            ),
            other => {
                error!("Request failed: {}", other);
                response::text(status, "Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_accumulate() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());

        errors.add("title", "field required");
        errors.add("title", "too long");
        errors.add("content", "field required");

        assert_eq!(errors.get("title").unwrap().len(), 2);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["content"][0], "field required");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err: PublishError = StoreError::NotFound("content/test".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: PublishError = StoreError::InvalidKey("".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_response_is_unprocessable() {
        let res = PublishError::Validation(FieldErrors::single("title", "is already being used"))
            .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.headers().get(hyper::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
