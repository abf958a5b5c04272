//! Command handlers, route providers, and the dispatch adapter.
//!
//! # Responsibilities
//! - Define the uniform command-handler shape every subsystem registers
//! - Collect routes from providers in registration order
//! - Adapt a command handler into the transport-facing handler: fresh
//!   request context, middleware chain, error to status translation

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::context::ApiContext;
use crate::api::errors::ApiError;
use crate::api::middleware::Middleware;

/// Path variables extracted by the routing pattern. Always present,
/// possibly empty; handlers never see an absent map.
pub type Vars = HashMap<String, String>;

/// Boxed future returned by command handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>;

/// The uniform command-handler shape: context, request, path variables,
/// returning a response or a typed error.
pub type ApiHandler = Arc<dyn Fn(ApiContext, Request<Body>, Vars) -> HandlerFuture + Send + Sync>;

/// Transport-facing handler stored in the routing table. Infallible: the
/// dispatch adapter has already translated errors into responses.
pub(crate) type TransportFuture = Pin<Box<dyn Future<Output = Response> + Send>>;
pub(crate) type TransportHandler =
    Arc<dyn Fn(Request<Body>, Vars) -> TransportFuture + Send + Sync>;

/// One method/path/handler triple contributed by a route provider.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    handler: ApiHandler,
}

impl Route {
    pub fn new<F, Fut>(method: Method, path: &str, f: F) -> Self
    where
        F: Fn(ApiContext, Request<Body>, Vars) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
    {
        Route {
            method,
            path: path.to_string(),
            handler: Arc::new(move |ctx, req, vars| Box::pin(f(ctx, req, vars))),
        }
    }

    pub fn get<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(ApiContext, Request<Body>, Vars) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
    {
        Route::new(Method::GET, path, f)
    }

    pub fn head<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(ApiContext, Request<Body>, Vars) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
    {
        Route::new(Method::HEAD, path, f)
    }

    pub fn post<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(ApiContext, Request<Body>, Vars) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
    {
        Route::new(Method::POST, path, f)
    }

    pub fn delete<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(ApiContext, Request<Body>, Vars) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
    {
        Route::new(Method::DELETE, path, f)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn handler(&self) -> ApiHandler {
        self.handler.clone()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Any component that can enumerate routes for the registry.
pub trait RouteProvider: Send + Sync {
    fn routes(&self) -> Vec<Route>;
}

/// Ordered collection of route providers.
///
/// Registration order is significant: it decides match precedence when
/// two providers contribute overlapping patterns. No deduplication is
/// performed here.
#[derive(Default)]
pub struct RouteRegistry {
    providers: Vec<Arc<dyn RouteProvider>>,
}

impl RouteRegistry {
    pub fn register(&mut self, provider: Arc<dyn RouteProvider>) {
        self.providers.push(provider);
    }

    /// Flatten all providers' routes, preserving provider order and each
    /// provider's internal order.
    pub fn all_routes(&self) -> Vec<Route> {
        self.providers.iter().flat_map(|p| p.routes()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Adapt one command handler into the transport handler shape: build a
/// fresh request context, run the middleware-wrapped handler, and turn a
/// returned error into exactly one structured response.
pub(crate) fn adapt(
    handler: ApiHandler,
    middlewares: &[Arc<dyn Middleware>],
) -> TransportHandler {
    // First registered middleware ends up outermost.
    let wrapped = middlewares
        .iter()
        .rev()
        .fold(handler, |next, m| m.wrap(next));

    Arc::new(move |req: Request<Body>, vars: Vars| {
        let wrapped = wrapped.clone();
        Box::pin(async move {
            let ctx = ApiContext::from_request(&req);
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let request_id = ctx.request_id.clone();

            match wrapped(ctx, req, vars).await {
                Ok(response) => response,
                Err(err) => {
                    if err.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
                        tracing::error!(
                            method = %method,
                            path = %path,
                            request_id = %request_id,
                            error = ?err,
                            "handler returned error"
                        );
                    } else {
                        tracing::error!(
                            method = %method,
                            path = %path,
                            request_id = %request_id,
                            error = %err,
                            "handler returned error"
                        );
                    }
                    err.into_response()
                }
            }
        })
    })
}

/// A transport handler that always answers with the given error,
/// translated through the same taxonomy as handler failures. Used for
/// the not-found fallbacks.
pub(crate) fn error_handler(err: ApiError) -> TransportHandler {
    let status = err.status_code();
    let message = err.to_string();
    Arc::new(move |_req, _vars| {
        let body = crate::api::errors::ErrorBody {
            message: message.clone(),
        };
        let response = (status, axum::Json(body)).into_response();
        Box::pin(async move { response })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok_handler(
        _ctx: ApiContext,
        _req: Request<Body>,
        _vars: Vars,
    ) -> Result<Response, ApiError> {
        Ok((StatusCode::OK, "fine").into_response())
    }

    async fn conflict_handler(
        _ctx: ApiContext,
        _req: Request<Body>,
        _vars: Vars,
    ) -> Result<Response, ApiError> {
        Err(ApiError::Conflict("name already in use".into()))
    }

    fn request(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn adapter_passes_through_success() {
        let handler = adapt(
            Arc::new(|ctx, req, vars| Box::pin(ok_handler(ctx, req, vars))),
            &[],
        );
        let response = handler(request("/x"), Vars::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn adapter_translates_error_to_structured_body() {
        let handler = adapt(
            Arc::new(|ctx, req, vars| Box::pin(conflict_handler(ctx, req, vars))),
            &[],
        );
        let response = handler(request("/x"), Vars::new()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "name already in use");
    }

    #[tokio::test]
    async fn registry_preserves_order() {
        struct One;
        struct Two;
        impl RouteProvider for One {
            fn routes(&self) -> Vec<Route> {
                vec![Route::get("/a", ok_handler), Route::get("/b", ok_handler)]
            }
        }
        impl RouteProvider for Two {
            fn routes(&self) -> Vec<Route> {
                vec![Route::get("/c", ok_handler)]
            }
        }

        let mut registry = RouteRegistry::default();
        registry.register(Arc::new(One));
        registry.register(Arc::new(Two));

        let routes = registry.all_routes();
        let paths: Vec<&str> = routes.iter().map(|r| r.path()).collect();
        assert_eq!(paths, ["/a", "/b", "/c"]);
    }
}
