//! Routing table compilation and path matching.
//!
//! # Responsibilities
//! - Compile method/path/handler triples into an immutable table
//! - Register every route under a version-prefixed and a bare form
//! - Match requests in registration order (first match wins)
//! - Fall back to a structured not-found response
//!
//! # Design Decisions
//! - Linear scan in registration order: precedence is the contract, and
//!   control-plane route counts stay small
//! - Building a table has no side effect beyond logging, so a candidate
//!   table can be built and discarded without touching live state

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;

use crate::api::errors::ApiError;
use crate::api::handler::{adapt, error_handler, Route, TransportHandler, Vars};
use crate::api::middleware::Middleware;

/// One element of a compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Captures one non-empty request segment under the given name.
    Param(String),
    /// Captures the remaining path (possibly empty) under the given name.
    Wildcard(String),
}

/// A compiled path pattern, optionally carrying the `/v{version}` prefix.
///
/// Pattern syntax: `/containers/{id}/json` captures `id`;
/// `/debug/{*rest}` captures everything after `/debug/`. Trailing
/// slashes on request paths are normalized away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathPattern {
    segments: Vec<Segment>,
    versioned: bool,
}

impl PathPattern {
    pub(crate) fn compile(path: &str, versioned: bool) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix("{*").and_then(|s| s.strip_suffix('}')) {
                    Segment::Wildcard(name.to_string())
                } else if let Some(name) =
                    s.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
                {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments, versioned }
    }

    /// Match a request path, returning captured variables on success.
    pub(crate) fn matches(&self, path: &str) -> Option<Vars> {
        let mut vars = Vars::new();
        let mut parts = path.split('/').filter(|s| !s.is_empty()).peekable();

        if self.versioned {
            let first = parts.next()?;
            let token = version_token(first)?;
            vars.insert("version".to_string(), token.to_string());
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(expected) => {
                    if parts.next()? != expected {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.next()?;
                    vars.insert(name.clone(), value.to_string());
                }
                Segment::Wildcard(name) => {
                    debug_assert_eq!(i, self.segments.len() - 1);
                    let rest: Vec<&str> = parts.collect();
                    vars.insert(name.clone(), rest.join("/"));
                    return Some(vars);
                }
            }
        }

        if parts.peek().is_some() {
            return None;
        }
        Some(vars)
    }
}

/// Parse a `v1.40`-style segment into its numeric dotted token.
fn version_token(segment: &str) -> Option<&str> {
    let token = segment.strip_prefix('v')?;
    if !token.is_empty()
        && token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && token.chars().any(|c| c.is_ascii_digit())
    {
        Some(token)
    } else {
        None
    }
}

struct TableEntry {
    /// None matches any method (the versioned not-found catch-all).
    method: Option<Method>,
    pattern: PathPattern,
    handler: TransportHandler,
}

/// The compiled, immutable routing table. Replaced wholesale on
/// reconfiguration, never mutated in place.
pub struct RoutingTable {
    entries: Vec<TableEntry>,
    not_found: TransportHandler,
}

impl RoutingTable {
    /// Compile a table from flattened routes and the middleware chain.
    ///
    /// Every route is registered twice (version-prefixed and bare),
    /// sharing the identical wrapped handler. Routes fully shadowed by
    /// an earlier registration are kept but logged: they are unreachable
    /// by the first-match-wins contract.
    pub fn build(routes: Vec<Route>, middlewares: &[Arc<dyn Middleware>]) -> Self {
        tracing::debug!("registering routes");

        let mut entries = Vec::with_capacity(routes.len() * 2 + 1);
        let mut seen: Vec<(Method, PathPattern)> = Vec::new();

        for route in routes {
            let handler = adapt(route.handler(), middlewares);

            tracing::debug!(method = %route.method(), path = route.path(), "registering route");

            for versioned in [true, false] {
                let pattern = PathPattern::compile(route.path(), versioned);
                if seen.iter().any(|(m, p)| m == route.method() && *p == pattern) {
                    tracing::warn!(
                        method = %route.method(),
                        path = route.path(),
                        "route is shadowed by an earlier registration and will never match"
                    );
                }
                seen.push((route.method().clone(), pattern.clone()));
                entries.push(TableEntry {
                    method: Some(route.method().clone()),
                    pattern,
                    handler: handler.clone(),
                });
            }
        }

        let not_found = error_handler(ApiError::NotFound("page not found".to_string()));
        entries.push(TableEntry {
            method: None,
            pattern: PathPattern::compile("/{*path}", true),
            handler: not_found.clone(),
        });

        Self { entries, not_found }
    }

    /// Match and invoke the handler for one request.
    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let path = req.uri().path().to_string();
        for entry in &self.entries {
            if let Some(method) = &entry.method {
                if method != req.method() {
                    continue;
                }
            }
            if let Some(vars) = entry.pattern.matches(&path) {
                return (entry.handler)(req, vars).await;
            }
        }
        (self.not_found)(req, Vars::new()).await
    }
}
