//! Request middleware chain.
//!
//! Middlewares wrap command handlers, not transport handlers, so they
//! see the request context and typed errors. The set is fixed once the
//! first routing table is built; only the route set changes at runtime.

use std::sync::Arc;

use axum::http::header::HeaderValue;

use crate::api::errors::ApiError;
use crate::api::handler::ApiHandler;
use crate::api::version::ApiVersion;

/// A layer wrapped around every dispatched handler.
///
/// The first middleware registered with the server observes the request
/// first and the response last.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: ApiHandler) -> ApiHandler;
}

/// Logs each dispatched request at debug level.
pub struct DebugMiddleware;

impl Middleware for DebugMiddleware {
    fn wrap(&self, next: ApiHandler) -> ApiHandler {
        Arc::new(move |ctx, req, vars| {
            tracing::debug!(
                method = %req.method(),
                uri = %req.uri(),
                user_agent = %ctx.user_agent,
                request_id = %ctx.request_id,
                "calling handler"
            );
            next(ctx, req, vars)
        })
    }
}

/// Adds CORS response headers when enabled in the daemon config.
pub struct CorsMiddleware {
    allow_origin: HeaderValue,
}

impl CorsMiddleware {
    pub fn new(cors_headers: &str) -> Self {
        let allow_origin = HeaderValue::from_str(cors_headers).unwrap_or_else(|_| {
            tracing::warn!(
                cors_headers,
                "invalid CORS header spec, falling back to \"*\""
            );
            HeaderValue::from_static("*")
        });
        Self { allow_origin }
    }
}

impl Middleware for CorsMiddleware {
    fn wrap(&self, next: ApiHandler) -> ApiHandler {
        let allow_origin = self.allow_origin.clone();
        Arc::new(move |ctx, req, vars| {
            let next = next.clone();
            let allow_origin = allow_origin.clone();
            Box::pin(async move {
                let mut response = next(ctx, req, vars).await?;
                let headers = response.headers_mut();
                headers.insert("Access-Control-Allow-Origin", allow_origin);
                headers.insert(
                    "Access-Control-Allow-Headers",
                    HeaderValue::from_static(
                        "Origin, X-Requested-With, Content-Type, Accept, X-Registry-Auth",
                    ),
                );
                headers.insert(
                    "Access-Control-Allow-Methods",
                    HeaderValue::from_static("HEAD, GET, POST, DELETE, PUT, OPTIONS"),
                );
                Ok(response)
            })
        })
    }
}

/// Negotiates the API version for each request.
///
/// The `version` path variable is captured by the version-prefixed route
/// form; bare paths negotiate the server's default version. Clients
/// newer than the server or older than the supported minimum are
/// rejected as malformed requests.
pub struct VersionMiddleware {
    server_version: ApiVersion,
    min_version: ApiVersion,
    version_header: HeaderValue,
    server_header: HeaderValue,
}

impl VersionMiddleware {
    pub fn new(server_version: ApiVersion, min_version: ApiVersion) -> Self {
        let version_header = HeaderValue::from_str(&server_version.to_string())
            .expect("numeric dotted version is a valid header value");
        let server_header = HeaderValue::from_str(&format!(
            "Stevedore/{} ({})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        ))
        .expect("version and os are valid header values");
        Self {
            server_version,
            min_version,
            version_header,
            server_header,
        }
    }
}

impl Middleware for VersionMiddleware {
    fn wrap(&self, next: ApiHandler) -> ApiHandler {
        let server_version = self.server_version.clone();
        let min_version = self.min_version.clone();
        let version_header = self.version_header.clone();
        let server_header = self.server_header.clone();
        Arc::new(move |mut ctx, req, vars| {
            let next = next.clone();
            let server_version = server_version.clone();
            let min_version = min_version.clone();
            let version_header = version_header.clone();
            let server_header = server_header.clone();
            Box::pin(async move {
                let client_version = match vars.get("version").filter(|v| !v.is_empty()) {
                    Some(raw) => raw.parse::<ApiVersion>().map_err(|_| {
                        ApiError::BadRequest(format!("invalid API version {raw:?}"))
                    })?,
                    None => server_version.clone(),
                };

                if client_version > server_version {
                    return Err(ApiError::BadRequest(format!(
                        "client version {client_version} is too new. \
                         Maximum supported API version is {server_version}"
                    )));
                }
                if client_version < min_version {
                    return Err(ApiError::BadRequest(format!(
                        "client version {client_version} is too old. \
                         Minimum supported API version is {min_version}, \
                         please upgrade your client to a newer version"
                    )));
                }

                ctx.api_version = Some(client_version);

                let mut response = next(ctx, req, vars).await?;
                let headers = response.headers_mut();
                headers.insert("API-Version", version_header);
                headers.insert("Server", server_header);
                Ok(response)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::{IntoResponse, Response};

    use crate::api::context::ApiContext;
    use crate::api::handler::Vars;

    fn terminal(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> ApiHandler {
        Arc::new(move |_ctx, _req, _vars| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push(tag);
                Ok((StatusCode::OK, "ok").into_response())
            })
        })
    }

    struct Recorder {
        log: Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    }

    impl Middleware for Recorder {
        fn wrap(&self, next: ApiHandler) -> ApiHandler {
            let log = self.log.clone();
            let tag = self.tag;
            Arc::new(move |ctx, req, vars| {
                let next = next.clone();
                let log = log.clone();
                Box::pin(async move {
                    log.lock().unwrap().push(tag);
                    next(ctx, req, vars).await
                })
            })
        }
    }

    fn ctx() -> ApiContext {
        ApiContext::from_request(
            &Request::builder().uri("/x").body(Body::empty()).unwrap(),
        )
    }

    #[tokio::test]
    async fn first_registered_middleware_runs_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Recorder {
                log: log.clone(),
                tag: "outer",
            }),
            Arc::new(Recorder {
                log: log.clone(),
                tag: "inner",
            }),
        ];

        let handler = crate::api::handler::adapt(terminal(log.clone(), "handler"), &middlewares);
        let _ = handler(
            Request::builder().uri("/x").body(Body::empty()).unwrap(),
            Vars::new(),
        )
        .await;

        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner", "handler"]);
    }

    async fn run_versioned(
        middleware: &VersionMiddleware,
        version_var: Option<&str>,
    ) -> Result<Response, ApiError> {
        let next: ApiHandler = Arc::new(|ctx, _req, _vars| {
            Box::pin(async move {
                assert!(ctx.api_version.is_some());
                Ok((StatusCode::OK, "ok").into_response())
            })
        });
        let wrapped = middleware.wrap(next);

        let mut vars = Vars::new();
        if let Some(v) = version_var {
            vars.insert("version".to_string(), v.to_string());
        }
        wrapped(
            ctx(),
            Request::builder().uri("/x").body(Body::empty()).unwrap(),
            vars,
        )
        .await
    }

    fn version_middleware() -> VersionMiddleware {
        VersionMiddleware::new("1.40".parse().unwrap(), "1.12".parse().unwrap())
    }

    #[tokio::test]
    async fn version_middleware_accepts_supported_versions() {
        let response = run_versioned(&version_middleware(), Some("1.24"))
            .await
            .unwrap();
        assert_eq!(response.headers()["API-Version"], "1.40");
        assert!(response.headers()["Server"]
            .to_str()
            .unwrap()
            .starts_with("Stevedore/"));
    }

    #[tokio::test]
    async fn version_middleware_defaults_when_unversioned() {
        assert!(run_versioned(&version_middleware(), None).await.is_ok());
    }

    #[tokio::test]
    async fn version_middleware_rejects_newer_clients() {
        let err = run_versioned(&version_middleware(), Some("9.99"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn version_middleware_rejects_ancient_clients() {
        let err = run_versioned(&version_middleware(), Some("1.2"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cors_middleware_sets_headers() {
        let middleware = CorsMiddleware::new("*");
        let next: ApiHandler = Arc::new(|_ctx, _req, _vars| {
            Box::pin(async move { Ok((StatusCode::OK, "ok").into_response()) })
        });
        let wrapped = middleware.wrap(next);
        let response = wrapped(
            ctx(),
            Request::builder().uri("/x").body(Body::empty()).unwrap(),
            Vars::new(),
        )
        .await
        .unwrap();

        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
        assert!(response.headers().contains_key("Access-Control-Allow-Methods"));
    }
}
