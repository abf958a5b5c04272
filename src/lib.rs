//! Stevedore container daemon control-plane API server.

pub mod api;
pub mod config;
pub mod net;
pub mod observability;
pub mod routes;

pub use api::errors::ApiError;
pub use api::server::Server;
pub use config::schema::DaemonConfig;
