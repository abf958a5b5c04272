//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the daemon
//! config file. The configuration is immutable once the server owns it;
//! runtime reconfiguration goes through the router rebuild path, never
//! through config mutation.

use serde::{Deserialize, Serialize};

/// Root configuration for the daemon API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Listener host specs, e.g. "tcp://127.0.0.1:2375" or
    /// "unix:///var/run/stevedore.sock".
    pub hosts: Vec<String>,

    /// Log every dispatched request at debug level.
    pub logging: bool,

    /// Enable CORS response headers.
    pub enable_cors: bool,

    /// Value for `Access-Control-Allow-Origin` when CORS is enabled.
    pub cors_headers: String,

    /// API version advertised by this server (numeric dotted, e.g. "1.40").
    pub version: String,

    /// Oldest client API version still accepted.
    pub min_version: String,

    /// Group that owns unix sockets created by the daemon.
    pub socket_group: Option<String>,

    /// TLS material applied to TCP listeners.
    pub tls: Option<TlsMaterial>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["unix:///var/run/stevedore.sock".to_string()],
            logging: false,
            enable_cors: false,
            cors_headers: "*".to_string(),
            version: "1.40".to_string(),
            min_version: "1.12".to_string(),
            socket_group: None,
            tls: None,
        }
    }
}

/// Certificate and key paths for TLS-terminated TCP listeners.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsMaterial {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}
