//! Stevedore daemon bootstrap.
//!
//! Stands up the control-plane API server: loads and validates the
//! configuration, binds the configured listeners, registers middlewares
//! and route providers, then blocks until every listener terminates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::oneshot;

use stevedore::api::middleware::{CorsMiddleware, DebugMiddleware, VersionMiddleware};
use stevedore::api::Server;
use stevedore::config::loader::ConfigError;
use stevedore::config::validation::validate_config;
use stevedore::config::{load_config, DaemonConfig};
use stevedore::routes::SystemRouter;
use stevedore::{net, observability};

#[derive(Parser, Debug)]
#[command(
    name = "stevedored",
    about = "A self-sufficient runtime for containers.",
    version
)]
struct Opts {
    /// Daemon configuration file
    #[arg(long, default_value = "/etc/stevedore/daemon.toml")]
    config: PathBuf,

    /// Enable debug mode (verbose logging plus diagnostics routes)
    #[arg(short = 'D', long)]
    debug: bool,

    /// Listener host specs, overriding the configuration file
    #[arg(short = 'H', long = "host")]
    hosts: Vec<String>,
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    observability::logging::init(opts.debug);

    if let Err(err) = run(opts).await {
        tracing::error!(error = %err, "daemon failed");
        std::process::exit(1);
    }
}

async fn run(opts: Opts) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = if opts.config.exists() {
        load_config(&opts.config)?
    } else {
        DaemonConfig::default()
    };
    if !opts.hosts.is_empty() {
        cfg.hosts = opts.hosts.clone();
    }
    if opts.debug {
        cfg.logging = true;
    }
    validate_config(&cfg).map_err(ConfigError::Validation)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api_version = %cfg.version,
        "stevedore daemon starting"
    );

    let tls = match &cfg.tls {
        Some(material) => Some(net::tls::load(material).await?),
        None => None,
    };

    let server = Arc::new(Server::new(cfg.clone()));
    for host in &cfg.hosts {
        let (addr, listener) = net::bind(host, cfg.socket_group.as_deref(), tls.as_ref()).await?;
        server.accept(&addr, vec![listener]);
    }

    if cfg.logging {
        server.use_middleware(Arc::new(DebugMiddleware));
    }
    if cfg.enable_cors {
        tracing::debug!(cors_headers = %cfg.cors_headers, "CORS enabled");
        server.use_middleware(Arc::new(CorsMiddleware::new(&cfg.cors_headers)));
    }
    server.use_middleware(Arc::new(VersionMiddleware::new(
        cfg.version.parse()?,
        cfg.min_version.parse()?,
    )));

    // Debug mode exposes the diagnostics routes from the start; they can
    // still be toggled off at runtime.
    server.init_router(opts.debug, vec![Arc::new(SystemRouter::new(&cfg))]);

    let closer = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            closer.close();
        }
    });

    let (tx, rx) = oneshot::channel();
    let waiter = server.clone();
    let serve_task = tokio::spawn(async move { waiter.wait(tx).await });

    let outcome = rx.await;
    serve_task.await?;

    match outcome {
        Ok(Ok(())) => {
            tracing::info!("daemon shut down cleanly");
            Ok(())
        }
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Ok(()),
    }
}
