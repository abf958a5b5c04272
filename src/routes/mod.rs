//! Route providers registered with the API server.
//!
//! Each provider enumerates method/path/handler triples; the server
//! compiles them into the routing table. Handler business logic for
//! containers and images lives with those subsystems, not here.

pub mod diagnostics;
pub mod system;

pub use diagnostics::DiagnosticsRouter;
pub use system::SystemRouter;
