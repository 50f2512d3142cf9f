//! Versioned router composition: handler groups mounted under path prefixes.
//! Requests are resolved by longest mounted prefix (on segment boundaries) and forwarded with the prefix stripped.

use crate::config::validate_prefix;
use crate::error::{AppError, ConfigError};
use axum::{
    extract::Request,
    handler::Handler,
    http::{header, HeaderValue, Method, Uri},
    response::{IntoResponse, Response},
    routing::{self, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

/// One documented route of a handler group. `path` is relative to the mount and uses `:param` segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub summary: String,
    pub tag: String,
}

/// A handler group: an axum router plus the list of routes it serves.
#[derive(Clone)]
pub struct ApiRouter<S = ()> {
    tag: String,
    router: Router<S>,
    routes: Vec<RouteSpec>,
}

impl<S> ApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(tag: impl Into<String>) -> Self {
        ApiRouter {
            tag: tag.into(),
            router: Router::new(),
            routes: Vec::new(),
        }
    }

    fn add(mut self, method: Method, path: &str, summary: &str, method_router: MethodRouter<S>) -> Self {
        self.router = self.router.route(path, method_router);
        self.routes.push(RouteSpec {
            method,
            path: path.to_string(),
            summary: summary.to_string(),
            tag: self.tag.clone(),
        });
        self
    }

    pub fn get<H, T>(self, path: &str, summary: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(Method::GET, path, summary, routing::get(handler))
    }

    pub fn post<H, T>(self, path: &str, summary: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(Method::POST, path, summary, routing::post(handler))
    }

    pub fn put<H, T>(self, path: &str, summary: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(Method::PUT, path, summary, routing::put(handler))
    }

    pub fn patch<H, T>(self, path: &str, summary: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(Method::PATCH, path, summary, routing::patch(handler))
    }

    pub fn delete<H, T>(self, path: &str, summary: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(Method::DELETE, path, summary, routing::delete(handler))
    }

    pub fn with_state<S2>(self, state: S) -> ApiRouter<S2> {
        ApiRouter {
            tag: self.tag,
            router: self.router.with_state(state),
            routes: self.routes,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }
}

/// A handler group mounted under `prefix` (relative to the version prefix).
#[derive(Clone)]
pub struct Mount {
    pub prefix: String,
    pub router: ApiRouter,
}

/// Result of resolving a request path and method against the mounted groups.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        mount_prefix: &'a str,
        route: &'a RouteSpec,
        /// Path handed to the sub-router: prefix stripped, trailing slash removed, `/` when empty.
        remainder: String,
    },
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
    NotFound,
}

/// Ordered mount table under one version prefix. Assembled at startup, read-only afterwards.
#[derive(Clone)]
pub struct RouterComposer {
    version_prefix: String,
    mounts: Vec<Mount>,
}

impl RouterComposer {
    pub fn new(version_prefix: &str) -> Result<Self, ConfigError> {
        validate_prefix(version_prefix)?;
        Ok(RouterComposer {
            version_prefix: version_prefix.to_string(),
            mounts: Vec::new(),
        })
    }

    pub fn version_prefix(&self) -> &str {
        &self.version_prefix
    }

    /// Register a handler group under `prefix`. Identical prefixes are a configuration error.
    pub fn mount(&mut self, prefix: &str, router: ApiRouter) -> Result<(), ConfigError> {
        validate_prefix(prefix)?;
        if self.mounts.iter().any(|m| m.prefix == prefix) {
            return Err(ConfigError::DuplicatePrefix(prefix.to_string()));
        }
        tracing::debug!(prefix = %prefix, tag = %router.tag(), routes = router.routes().len(), "mounted router");
        self.mounts.push(Mount {
            prefix: prefix.to_string(),
            router,
        });
        Ok(())
    }

    /// Builder form of [`mount`](Self::mount).
    pub fn with(mut self, prefix: &str, router: ApiRouter) -> Result<Self, ConfigError> {
        self.mount(prefix, router)?;
        Ok(self)
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Every mounted route with its full request path (version prefix + mount prefix + route path).
    pub fn routes(&self) -> Vec<(String, &RouteSpec)> {
        self.mounts
            .iter()
            .flat_map(|m| {
                m.router
                    .routes()
                    .iter()
                    .map(move |r| (format!("{}{}{}", self.version_prefix, m.prefix, r.path), r))
            })
            .collect()
    }

    pub fn resolve(&self, path: &str, method: &Method) -> Resolution<'_> {
        let Some(rest) = strip_segment_prefix(path, &self.version_prefix) else {
            return Resolution::NotFound;
        };

        let mut best: Option<(&Mount, &str)> = None;
        for mount in &self.mounts {
            if let Some(tail) = strip_segment_prefix(rest, &mount.prefix) {
                if best.map_or(true, |(b, _)| mount.prefix.len() > b.prefix.len()) {
                    best = Some((mount, tail));
                }
            }
        }
        let Some((mount, tail)) = best else {
            return Resolution::NotFound;
        };

        let remainder = normalize_remainder(tail);
        let candidates: Vec<&RouteSpec> = mount
            .router
            .routes()
            .iter()
            .filter(|r| path_matches(&r.path, &remainder))
            .collect();
        if candidates.is_empty() {
            return Resolution::NotFound;
        }
        let wanted = if *method == Method::HEAD { &Method::GET } else { method };
        match candidates.iter().find(|r| r.method == *wanted) {
            Some(route) => Resolution::Matched {
                mount_prefix: &mount.prefix,
                route,
                remainder,
            },
            None => Resolution::MethodNotAllowed {
                allowed: candidates.iter().map(|r| r.method.clone()).collect(),
            },
        }
    }

    fn router_for(&self, mount_prefix: &str) -> Option<Router> {
        self.mounts
            .iter()
            .find(|m| m.prefix == mount_prefix)
            .map(|m| m.router.router.clone())
    }

    /// Resolve `req` and forward it to the matched handler group.
    pub async fn dispatch(self: Arc<Self>, mut req: Request) -> Response {
        let path = req.uri().path().to_string();
        let (router, remainder) = match self.resolve(&path, req.method()) {
            Resolution::Matched {
                mount_prefix,
                remainder,
                ..
            } => match self.router_for(mount_prefix) {
                Some(router) => (router, remainder),
                None => return AppError::NotFound(path).into_response(),
            },
            Resolution::MethodNotAllowed { allowed } => {
                let mut response = AppError::MethodNotAllowed {
                    method: req.method().to_string(),
                    path,
                }
                .into_response();
                if let Ok(value) = HeaderValue::from_str(&allow_header(&allowed)) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                return response;
            }
            Resolution::NotFound => return AppError::NotFound(path).into_response(),
        };

        let target = match req.uri().query() {
            Some(q) => format!("{}?{}", remainder, q),
            None => remainder,
        };
        match target.parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(e) => return AppError::BadRequest(format!("invalid path: {}", e)).into_response(),
        }
        match router.oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

/// `Some(tail)` when `path` equals `prefix` or continues it at a `/` boundary.
fn strip_segment_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let tail = path.strip_prefix(prefix)?;
    if tail.is_empty() || tail.starts_with('/') {
        Some(tail)
    } else {
        None
    }
}

/// Rebuild the path from its non-empty segments, so `//5/` and `/5` forward identically.
fn normalize_remainder(tail: &str) -> String {
    format!("/{}", segments(tail).join("/"))
}

/// `Allow` header value; GET implies HEAD.
fn allow_header(allowed: &[Method]) -> String {
    let mut methods: Vec<&str> = Vec::new();
    for method in allowed {
        if !methods.contains(&method.as_str()) {
            methods.push(method.as_str());
        }
        if *method == Method::GET && !methods.contains(&"HEAD") {
            methods.push("HEAD");
        }
    }
    methods.join(", ")
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Match a concrete path against a route pattern with `:param` and trailing `*wildcard` segments.
fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern = segments(pattern);
    let path = segments(path);
    for (i, p) in pattern.iter().enumerate() {
        if p.starts_with('*') {
            return path.len() > i;
        }
        match path.get(i) {
            Some(seg) if p.starts_with(':') || p == seg => {}
            _ => return false,
        }
    }
    pattern.len() == path.len()
}
