//! Control-plane API server subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (any listener)
//!     → server.rs (per-binding accept loop)
//!     → swapper.rs (atomic snapshot of the active routing table)
//!     → table.rs (method + path match, variable extraction)
//!     → handler.rs (dispatch adapter: context, middleware chain, error mapping)
//!     → command handler
//!
//! Reconfiguration (diagnostics toggle):
//!     providers → table.rs (build fresh table) → swapper.rs (atomic replace)
//! ```
//!
//! # Design Decisions
//! - Routing tables are immutable; reconfiguration replaces them wholesale
//! - Every route is reachable under a version prefix and a bare path
//! - First-registered route wins on overlapping patterns
//! - Handlers never write error responses; the dispatch adapter does

pub mod context;
pub mod errors;
pub mod handler;
pub mod middleware;
pub mod server;
pub mod swapper;
pub mod table;
pub mod version;

pub use context::ApiContext;
pub use errors::{ApiError, ServerError};
pub use handler::{ApiHandler, Route, RouteProvider, RouteRegistry, Vars};
pub use middleware::Middleware;
pub use server::Server;
pub use swapper::RouterSwapper;
pub use table::RoutingTable;
