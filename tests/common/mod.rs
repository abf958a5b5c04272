//! Shared utilities for integration testing the API server.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use tokio::sync::oneshot;

use stevedore::api::errors::ServerError;
use stevedore::api::handler::{Route, RouteProvider, Vars};
use stevedore::api::middleware::Middleware;
use stevedore::api::Server;
use stevedore::config::DaemonConfig;
use stevedore::net::BoundListener;

/// A provider answering fixed bodies on fixed paths.
pub struct StaticRouter {
    pub routes: Vec<(Method, &'static str, &'static str)>,
}

impl StaticRouter {
    pub fn single(method: Method, path: &'static str, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            routes: vec![(method, path, body)],
        })
    }
}

impl RouteProvider for StaticRouter {
    fn routes(&self) -> Vec<Route> {
        self.routes
            .iter()
            .map(|(method, path, body)| {
                let body = *body;
                Route::new(method.clone(), path, move |_ctx, _req, _vars: Vars| async move {
                    Ok((StatusCode::OK, body).into_response())
                })
            })
            .collect()
    }
}

/// A running API server bound to an ephemeral TCP port.
pub struct TestDaemon {
    pub server: Arc<Server>,
    pub addr: SocketAddr,
    pub outcome: oneshot::Receiver<Result<(), ServerError>>,
}

impl TestDaemon {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_daemon(
    providers: Vec<Arc<dyn RouteProvider>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    diagnostics: bool,
) -> TestDaemon {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::new(Server::new(DaemonConfig::default()));
    server.accept(&format!("tcp://{addr}"), vec![BoundListener::Tcp(listener)]);
    for middleware in middlewares {
        server.use_middleware(middleware);
    }
    server.init_router(diagnostics, providers);

    let (tx, rx) = oneshot::channel();
    let waiter = server.clone();
    tokio::spawn(async move { waiter.wait(tx).await });

    // Give the serving tasks a beat to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestDaemon {
        server,
        addr,
        outcome: rx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
