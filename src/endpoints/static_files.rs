use std::path::PathBuf;

use async_trait::async_trait;
use hyper::{Body, Method, Request, Response, StatusCode, Uri};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, error};

use crate::handler::Handler;
use crate::response;
use crate::router::MountPath;

/// Serves files below `root` for the part of the path under the mount point.
pub struct StaticFiles {
    dir: ServeDir,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!("Serving static files from {}", root.display());
        Self {
            dir: ServeDir::new(root).append_index_html_on_directories(false),
        }
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn call(&self, mut req: Request<Body>) -> Response<Body> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return response::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        // ServeDir 按请求路径查找文件, 这里换成挂载点下面的部分
        let relative = req
            .extensions()
            .get::<MountPath>()
            .map(|m| m.0.clone())
            .unwrap_or_default();
        match format!("/{}", relative).parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(_) => return response::text(StatusCode::NOT_FOUND, "Not Found"),
        }

        let res = match self.dir.clone().oneshot(req).await {
            Ok(res) => res,
            Err(never) => match never {},
        };
        let (parts, body) = res.into_parts();
        match hyper::body::to_bytes(body).await {
            Ok(bytes) => Response::from_parts(parts, Body::from(bytes)),
            Err(e) => {
                error!("Failed to read /{}: {}", relative, e);
                response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::CONTENT_TYPE;
    use tempfile::TempDir;

    fn request(method: Method, relative: &str) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(format!("/static/{}", relative))
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(MountPath(relative.to_string()));
        req
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_serves_file_with_type() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path());
        let res = files.call(request(Method::GET, "style.css")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "text/css");
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], b"body {}");
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path().join("nested"));
        for relative in ["../style.css", "", "missing.js"] {
            let res = files.call(request(Method::GET, relative)).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", relative);
        }
    }

    #[tokio::test]
    async fn test_rejects_writes() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path());
        let res = files.call(request(Method::POST, "style.css")).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
