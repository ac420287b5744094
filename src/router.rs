use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::header::{HeaderValue, ALLOW};
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::debug;

use crate::handler::Handler;
use crate::response;

/// Values captured by `{name}` segments of the matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

/// Part of the path below a mount point, without a leading slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPath(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

struct Route {
    segments: Vec<Segment>,
    method: Method,
    handler: Arc<dyn Handler>,
}

impl Route {
    fn matches(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(PathParams(params))
    }

    /// `GET` routes also answer `HEAD`.
    fn accepts(&self, method: &Method) -> bool {
        self.method == method || (self.method == Method::GET && method == Method::HEAD)
    }
}

struct Mount {
    prefix: Vec<String>,
    handler: Arc<dyn Handler>,
}

enum Entry {
    Route(Route),
    Mount(Mount),
}

/// Dispatches by path and method. Entries are tried in registration order.
#[derive(Default)]
pub struct Router {
    entries: Vec<Entry>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` on `pattern`, e.g. `/api/{slug}/update`.
    pub fn route<H: Handler>(mut self, pattern: &str, method: Method, handler: H) -> Self {
        self.entries.push(Entry::Route(Route {
            segments: parse_pattern(pattern),
            method,
            handler: Arc::new(handler),
        }));
        self
    }

    /// Sends every request under `prefix` to `handler`, whatever the method.
    pub fn mount<H: Handler>(mut self, prefix: &str, handler: H) -> Self {
        self.entries.push(Entry::Mount(Mount {
            prefix: split_path(prefix).map(str::to_string).collect(),
            handler: Arc::new(handler),
        }));
        self
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, mut req: Request<Body>) -> Response<Body> {
        let path = req.uri().path().to_string();
        let parts: Vec<&str> = split_path(&path).collect();
        let mut allowed: Vec<Method> = Vec::new();

        for entry in &self.entries {
            match entry {
                Entry::Mount(mount) => {
                    if parts.len() >= mount.prefix.len()
                        && mount.prefix.iter().zip(&parts).all(|(a, b)| a == b)
                    {
                        let rest = parts[mount.prefix.len()..].join("/");
                        debug!("{} routed to mount /{}", path, mount.prefix.join("/"));
                        req.extensions_mut().insert(MountPath(rest));
                        return mount.handler.call(req).await;
                    }
                }
                Entry::Route(route) => {
                    if let Some(params) = route.matches(&parts) {
                        if route.accepts(req.method()) {
                            req.extensions_mut().insert(params);
                            return route.handler.call(req).await;
                        }
                        allowed.push(route.method.clone());
                    }
                }
            }
        }

        if allowed.is_empty() {
            debug!("No route for {}", path);
            return response::text(StatusCode::NOT_FOUND, "Not Found");
        }

        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let mut res = response::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            res.headers_mut().insert(ALLOW, value);
        }
        res
    }
}
