//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at daemon startup
//! - Honor `RUST_LOG` when set, fall back to a sensible default
//! - Raise the default level when the daemon runs in debug mode

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` takes precedence over the `debug` flag.
pub fn init(debug: bool) {
    let default_filter = if debug {
        "stevedore=debug,tower_http=debug"
    } else {
        "stevedore=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
