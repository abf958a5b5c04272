//! Network endpoint setup.
//!
//! The bootstrap turns host specs from the configuration into bound
//! listeners here; the API server only ever sees already-bound
//! endpoints.

pub mod listener;
pub mod tls;

pub use listener::{bind, BoundListener, ListenerError};
