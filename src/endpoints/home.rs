use hyper::{Body, Request, Response, StatusCode};

use crate::response;
use crate::templates;

/// Landing page with the publish form.
pub async fn home(_req: Request<Body>) -> Response<Body> {
    response::html(StatusCode::OK, templates::home_page())
}
