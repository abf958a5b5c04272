//! Listener lifecycle and live router reconfiguration.
//!
//! # Responsibilities
//! - Own the set of bound listeners for the daemon lifetime
//! - Build the initial routing table and install the swapper
//! - Run one serving task per listener, fanning terminal errors into a
//!   single outcome
//! - Rebuild and atomically swap the table when diagnostics are toggled
//!
//! # Design Decisions
//! - Providers and middlewares are registered during single-threaded
//!   setup and read-only afterwards; the swapper is the only state
//!   shared with live traffic
//! - A closed listener is a clean termination, not an error

use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::any;
use tokio::sync::{mpsc, oneshot, watch};
use tower_http::trace::TraceLayer;

use crate::api::errors::ServerError;
use crate::api::handler::{RouteProvider, RouteRegistry};
use crate::api::middleware::Middleware;
use crate::api::swapper::RouterSwapper;
use crate::api::table::RoutingTable;
use crate::config::schema::DaemonConfig;
use crate::net::listener::BoundListener;
use crate::routes::diagnostics::DiagnosticsRouter;

/// One bound endpoint plus the controls for its serving loop.
struct ListenerBinding {
    addr: String,
    /// Taken by `wait` when the serving task starts.
    listener: Option<BoundListener>,
    shutdown: watch::Sender<bool>,
    closed: bool,
}

/// The control-plane API server.
///
/// Owns its configuration and listeners for its whole running lifetime.
/// Setup (`accept`, `use_middleware`, `init_router`) happens before
/// `wait`; `close` and the diagnostics toggles are safe at any point
/// after their preconditions hold, concurrently with live traffic.
pub struct Server {
    cfg: DaemonConfig,
    bindings: Mutex<Vec<ListenerBinding>>,
    registry: Mutex<RouteRegistry>,
    middlewares: Mutex<Vec<Arc<dyn Middleware>>>,
    swapper: OnceLock<Arc<RouterSwapper>>,
    started: Instant,
}

impl Server {
    pub fn new(cfg: DaemonConfig) -> Self {
        Self {
            cfg,
            bindings: Mutex::new(Vec::new()),
            registry: Mutex::new(RouteRegistry::default()),
            middlewares: Mutex::new(Vec::new()),
            swapper: OnceLock::new(),
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.cfg
    }

    /// Register already-bound listeners under a logical address.
    pub fn accept(&self, addr: &str, listeners: Vec<BoundListener>) {
        let mut bindings = self.bindings.lock().unwrap();
        for listener in listeners {
            let (shutdown, _) = watch::channel(false);
            bindings.push(ListenerBinding {
                addr: addr.to_string(),
                listener: Some(listener),
                shutdown,
                closed: false,
            });
        }
    }

    /// Append a middleware to the request chain.
    ///
    /// Must be called before `init_router`; tables already built do not
    /// pick up later registrations.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middlewares.lock().unwrap().push(middleware);
    }

    /// Register route providers, build the initial routing table, and
    /// install it. Must be called before `wait`.
    pub fn init_router(
        &self,
        enable_diagnostics: bool,
        providers: Vec<Arc<dyn RouteProvider>>,
    ) {
        {
            let mut registry = self.registry.lock().unwrap();
            for provider in providers {
                registry.register(provider);
            }
        }

        let table = self.build_table(enable_diagnostics);
        match self.swapper.get() {
            Some(swapper) => swapper.swap(table),
            None => {
                let _ = self.swapper.set(Arc::new(RouterSwapper::new(table)));
            }
        }
    }

    /// Rebuild the routing table with the diagnostics routes and swap it
    /// in, without disturbing listeners or in-flight requests.
    pub fn enable_diagnostics(&self) -> Result<(), ServerError> {
        let swapper = self.swapper.get().ok_or(ServerError::RouterNotInitialized)?;
        swapper.swap(self.build_table(true));
        tracing::info!("diagnostics routes enabled");
        Ok(())
    }

    /// Rebuild the routing table without the diagnostics routes and swap
    /// it in.
    pub fn disable_diagnostics(&self) -> Result<(), ServerError> {
        let swapper = self.swapper.get().ok_or(ServerError::RouterNotInitialized)?;
        swapper.swap(self.build_table(false));
        tracing::info!("diagnostics routes disabled");
        Ok(())
    }

    /// Build a fresh routing table from the registered providers.
    ///
    /// Has no effect on live state; the caller decides whether to swap
    /// the result in.
    fn build_table(&self, diagnostics: bool) -> RoutingTable {
        let mut routes = self.registry.lock().unwrap().all_routes();
        if diagnostics {
            routes.extend(DiagnosticsRouter::new(self.cfg.clone(), self.started).routes());
        }
        let middlewares = self.middlewares.lock().unwrap().clone();
        RoutingTable::build(routes, &middlewares)
    }

    /// Serve every registered listener until all of them terminate, then
    /// deliver the overall outcome.
    ///
    /// The first listener error observed (in completion order) becomes
    /// the outcome; a listener closed via `close` terminates cleanly and
    /// contributes no error.
    pub async fn wait(&self, outcome: oneshot::Sender<Result<(), ServerError>>) {
        let result = self.serve_all().await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "api server terminated with error");
        }
        let _ = outcome.send(result);
    }

    async fn serve_all(&self) -> Result<(), ServerError> {
        let swapper = self
            .swapper
            .get()
            .cloned()
            .ok_or(ServerError::RouterNotInitialized)?;

        let mut serving = Vec::new();
        {
            let mut bindings = self.bindings.lock().unwrap();
            for binding in bindings.iter_mut() {
                if let Some(listener) = binding.listener.take() {
                    serving.push((binding.addr.clone(), listener, binding.shutdown.subscribe()));
                }
            }
        }

        let count = serving.len();
        if count == 0 {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<Result<(), ServerError>>(count);
        for (addr, listener, shutdown) in serving {
            let tx = tx.clone();
            let app = router_app(swapper.clone());
            tokio::spawn(async move {
                tracing::info!(address = %addr, "api listening");
                let result = serve_binding(listener, app, shutdown)
                    .await
                    .map_err(|source| ServerError::Serve {
                        addr: addr.clone(),
                        source,
                    });
                if result.is_ok() {
                    tracing::info!(address = %addr, "api listener stopped");
                }
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut first_error = None;
        for _ in 0..count {
            match rx.recv().await {
                Some(Err(err)) if first_error.is_none() => first_error = Some(err),
                Some(_) => {}
                None => break,
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Close every listener binding. All bindings are attempted even if
    /// one fails; every failure is logged and returned.
    pub fn close(&self) -> Vec<ServerError> {
        let mut errors = Vec::new();
        let mut bindings = self.bindings.lock().unwrap();
        for binding in bindings.iter_mut() {
            if binding.closed {
                let err = ServerError::AlreadyClosed(binding.addr.clone());
                tracing::error!(error = %err, "close failed");
                errors.push(err);
                continue;
            }
            binding.closed = true;
            binding.shutdown.send_replace(true);
        }
        errors
    }
}

/// The static per-binding transport app: every request funnels into the
/// swapper, which holds the actual routing table.
fn router_app(swapper: Arc<RouterSwapper>) -> axum::Router {
    axum::Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .with_state(swapper)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(swapper): State<Arc<RouterSwapper>>, req: Request) -> Response {
    swapper.serve(req).await
}

async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender means the server is gone; shut down then too.
    let _ = shutdown.wait_for(|closed| *closed).await;
}

async fn serve_binding(
    listener: BoundListener,
    app: axum::Router,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    match listener {
        BoundListener::Tcp(listener) => {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown))
                .await
        }
        BoundListener::Unix(listener) => {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown))
                .await
        }
        BoundListener::Tls(listener, tls) => {
            let handle = axum_server::Handle::new();
            let closer = handle.clone();
            tokio::spawn(async move {
                shutdown_signal(shutdown).await;
                closer.graceful_shutdown(Some(Duration::from_secs(5)));
            });
            axum_server::from_tcp_rustls(listener, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_without_router_reports_initialization_error() {
        let server = Server::new(DaemonConfig::default());
        let (tx, rx) = oneshot::channel();
        server.wait(tx).await;
        assert!(matches!(
            rx.await.unwrap(),
            Err(ServerError::RouterNotInitialized)
        ));
    }

    #[tokio::test]
    async fn diagnostics_toggle_requires_router() {
        let server = Server::new(DaemonConfig::default());
        assert!(matches!(
            server.enable_diagnostics(),
            Err(ServerError::RouterNotInitialized)
        ));

        server.init_router(false, Vec::new());
        assert!(server.enable_diagnostics().is_ok());
        assert!(server.disable_diagnostics().is_ok());
    }

    #[tokio::test]
    async fn double_close_surfaces_every_binding_error() {
        let server = Server::new(DaemonConfig::default());
        let first = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.accept(
            "tcp://127.0.0.1",
            vec![BoundListener::Tcp(first), BoundListener::Tcp(second)],
        );

        assert!(server.close().is_empty());

        let errors = server.close();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ServerError::AlreadyClosed(_))));
    }
}
