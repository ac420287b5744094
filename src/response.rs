use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;
use tracing::error;

/// Empty response with the given status.
pub fn status(status: StatusCode) -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = status;
    res
}

pub fn text(status: StatusCode, body: &'static str) -> Response<Body> {
    with_type(status, Body::from(body), "text/plain; charset=utf-8")
}

pub fn html(status: StatusCode, body: String) -> Response<Body> {
    with_type(status, Body::from(body), "text/html; charset=utf-8")
}

pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => with_type(status, Body::from(body), "application/json"),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            self::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub fn with_type(status: StatusCode, body: Body, content_type: &'static str) -> Response<Body> {
    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}
