//! Request-scoped context.

use axum::body::Body;
use axum::http::Request;
use uuid::Uuid;

use crate::api::version::ApiVersion;

/// Values shared with every layer of one dispatch.
///
/// A fresh context is built per request and never reused; anything
/// specific to a single handler still travels as arguments, not here.
#[derive(Debug, Clone)]
pub struct ApiContext {
    /// The caller's `User-Agent` header, empty when absent.
    pub user_agent: String,

    /// Correlation ID for log lines belonging to this request.
    pub request_id: String,

    /// API version negotiated by the version middleware, if it ran.
    pub api_version: Option<ApiVersion>,
}

impl ApiContext {
    pub(crate) fn from_request(req: &Request<Body>) -> Self {
        let user_agent = req
            .headers()
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            user_agent,
            request_id: Uuid::new_v4().to_string(),
            api_version: None,
        }
    }
}
