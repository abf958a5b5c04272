//! System-level control-plane routes.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::context::ApiContext;
use crate::api::errors::ApiError;
use crate::api::handler::{Route, RouteProvider, Vars};
use crate::config::schema::DaemonConfig;

/// Provides `/_ping`, `/version` and `/info`.
pub struct SystemRouter {
    version: String,
    min_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct VersionInfo {
    version: String,
    api_version: String,
    #[serde(rename = "MinAPIVersion")]
    min_api_version: String,
    os: String,
    arch: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SystemInfo {
    name: String,
    server_version: String,
    operating_system: String,
    architecture: String,
    #[serde(rename = "NCPU")]
    ncpu: usize,
}

impl SystemRouter {
    pub fn new(cfg: &DaemonConfig) -> Self {
        Self {
            version: cfg.version.clone(),
            min_version: cfg.min_version.clone(),
        }
    }
}

impl RouteProvider for SystemRouter {
    fn routes(&self) -> Vec<Route> {
        let version = self.version.clone();
        let min_version = self.min_version.clone();

        vec![
            Route::head("/_ping", |_ctx, _req, _vars: Vars| async {
                Ok(StatusCode::OK.into_response())
            }),
            Route::get("/_ping", |_ctx, _req, _vars: Vars| async {
                Ok((
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    "OK",
                )
                    .into_response())
            }),
            Route::get("/version", move |_ctx: ApiContext, _req, _vars: Vars| {
                let version = version.clone();
                let min_version = min_version.clone();
                async move { get_version(version, min_version) }
            }),
            Route::get("/info", move |_ctx: ApiContext, _req, _vars: Vars| async move {
                get_info()
            }),
        ]
    }
}

fn get_version(api_version: String, min_api_version: String) -> Result<Response, ApiError> {
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version,
        min_api_version,
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };
    Ok(Json(info).into_response())
}

fn get_info() -> Result<Response, ApiError> {
    let info = SystemInfo {
        name: hostname(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        operating_system: std::env::consts::OS.to_string(),
        architecture: std::env::consts::ARCH.to_string(),
        ncpu: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    };
    Ok(Json(info).into_response())
}

fn hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| std::fs::read_to_string("/etc/hostname"))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provides_the_system_surface() {
        let provider = SystemRouter::new(&DaemonConfig::default());
        let routes = provider.routes();
        let paths: Vec<(String, String)> = routes
            .iter()
            .map(|r| (r.method().to_string(), r.path().to_string()))
            .collect();
        assert!(paths.contains(&("HEAD".into(), "/_ping".into())));
        assert!(paths.contains(&("GET".into(), "/_ping".into())));
        assert!(paths.contains(&("GET".into(), "/version".into())));
        assert!(paths.contains(&("GET".into(), "/info".into())));
    }
}
