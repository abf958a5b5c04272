//! Diagnostics routes, toggled at runtime via a table rebuild.

use std::time::Instant;

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::errors::ApiError;
use crate::api::handler::{Route, RouteProvider, Vars};
use crate::config::schema::DaemonConfig;

/// Provides the `/debug/...` surface. Only present in the routing table
/// while diagnostics are enabled; a disabled daemon answers these paths
/// with the structured not-found error.
pub struct DiagnosticsRouter {
    cfg: DaemonConfig,
    started: Instant,
}

#[derive(Debug, Serialize)]
struct RuntimeVars {
    version: &'static str,
    api_version: String,
    uptime_secs: u64,
    pid: u32,
}

impl DiagnosticsRouter {
    pub fn new(cfg: DaemonConfig, started: Instant) -> Self {
        Self { cfg, started }
    }
}

impl RouteProvider for DiagnosticsRouter {
    fn routes(&self) -> Vec<Route> {
        let api_version = self.cfg.version.clone();
        let started = self.started;
        let cfg = self.cfg.clone();

        vec![
            Route::get("/debug/vars", move |_ctx, _req, _vars: Vars| {
                let api_version = api_version.clone();
                async move { get_vars(api_version, started) }
            }),
            Route::get("/debug/config", move |_ctx, _req, _vars: Vars| {
                let cfg = cfg.clone();
                async move { Ok(Json(cfg).into_response()) }
            }),
        ]
    }
}

fn get_vars(api_version: String, started: Instant) -> Result<Response, ApiError> {
    let vars = RuntimeVars {
        version: env!("CARGO_PKG_VERSION"),
        api_version,
        uptime_secs: started.elapsed().as_secs(),
        pid: std::process::id(),
    };
    Ok(Json(vars).into_response())
}
