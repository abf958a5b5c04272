//! Atomic holder of the active routing table.
//!
//! # Design Decisions
//! - `arc-swap` gives lock-free snapshot reads on the request path and
//!   serialized wholesale replacement on the admin path
//! - A dispatch racing a swap sees either the old table or the new one,
//!   never a partially updated mix

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::api::table::RoutingTable;

/// Holds exactly one routing table at a time.
///
/// Created once with the first table and installed as every listener's
/// handler; lives until process shutdown. Tables themselves are
/// immutable, so replacement is the only write operation.
pub struct RouterSwapper {
    table: ArcSwap<RoutingTable>,
}

impl RouterSwapper {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Dispatch one request through the current table snapshot.
    pub async fn serve(&self, req: Request<Body>) -> Response {
        let table = self.table.load_full();
        table.dispatch(req).await
    }

    /// Replace the active table. Fully built tables only; in-flight
    /// dispatches keep using the snapshot they already loaded.
    pub fn swap(&self, table: RoutingTable) {
        self.table.store(Arc::new(table));
    }
}
