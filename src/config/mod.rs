//! Daemon configuration subsystem.
//!
//! # Data Flow
//! ```text
//! daemon.toml
//!     → loader.rs (read + parse)
//!     → validation.rs (semantic checks, all errors collected)
//!     → DaemonConfig (immutable for the daemon lifetime)
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DaemonConfig, TlsMaterial};
