//! Binding of daemon host specs.
//!
//! # Responsibilities
//! - Parse `tcp://` and `unix://` host specs
//! - Bind TCP, TLS-terminated TCP, and unix-socket endpoints
//! - Apply socket permissions and group ownership to unix sockets

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::{TcpListener, UnixListener};

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("unsupported host spec {0:?}: expected tcp:// or unix://")]
    UnsupportedScheme(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown socket group {0:?}")]
    UnknownGroup(String),

    #[error("failed to set up socket {path}: {source}")]
    Socket {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An already-bound network endpoint, ready to be handed to the server.
#[derive(Debug)]
pub enum BoundListener {
    Tcp(TcpListener),
    Unix(UnixListener),
    /// Plain TCP listener plus the TLS material to terminate with.
    Tls(std::net::TcpListener, RustlsConfig),
}

/// Bind one host spec.
///
/// TLS material, when present, applies to TCP hosts only; unix sockets
/// stay cleartext and are protected by filesystem permissions instead.
pub async fn bind(
    host: &str,
    socket_group: Option<&str>,
    tls: Option<&RustlsConfig>,
) -> Result<(String, BoundListener), ListenerError> {
    if let Some(addr) = host.strip_prefix("tcp://") {
        let listener = bind_tcp(addr, tls).await?;
        Ok((host.to_string(), listener))
    } else if let Some(path) = host.strip_prefix("unix://") {
        let listener = bind_unix(path, socket_group)?;
        Ok((host.to_string(), listener))
    } else {
        Err(ListenerError::UnsupportedScheme(host.to_string()))
    }
}

async fn bind_tcp(addr: &str, tls: Option<&RustlsConfig>) -> Result<BoundListener, ListenerError> {
    match tls {
        Some(tls) => {
            let listener =
                std::net::TcpListener::bind(addr).map_err(|source| ListenerError::Bind {
                    addr: addr.to_string(),
                    source,
                })?;
            listener
                .set_nonblocking(true)
                .map_err(|source| ListenerError::Bind {
                    addr: addr.to_string(),
                    source,
                })?;
            Ok(BoundListener::Tls(listener, tls.clone()))
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| ListenerError::Bind {
                    addr: addr.to_string(),
                    source,
                })?;
            Ok(BoundListener::Tcp(listener))
        }
    }
}

fn bind_unix(path: &str, socket_group: Option<&str>) -> Result<BoundListener, ListenerError> {
    // A stale socket from an unclean shutdown blocks rebinding.
    if Path::new(path).exists() {
        std::fs::remove_file(path).map_err(|source| ListenerError::Socket {
            path: path.to_string(),
            source,
        })?;
    }

    let listener = UnixListener::bind(path).map_err(|source| ListenerError::Bind {
        addr: path.to_string(),
        source,
    })?;

    let socket_err = |source| ListenerError::Socket {
        path: path.to_string(),
        source,
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660))
        .map_err(socket_err)?;

    if let Some(group) = socket_group {
        let gid = lookup_gid(group)
            .ok_or_else(|| ListenerError::UnknownGroup(group.to_string()))?;
        std::os::unix::fs::chown(path, None, Some(gid)).map_err(socket_err)?;
        tracing::debug!(path, group, gid, "unix socket group ownership set");
    }

    Ok(BoundListener::Unix(listener))
}

/// Resolve a group name (or numeric gid) against the system group database.
fn lookup_gid(group: &str) -> Option<u32> {
    if let Ok(gid) = group.parse::<u32>() {
        return Some(gid);
    }
    let content = std::fs::read_to_string("/etc/group").ok()?;
    for line in content.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() >= 3 && fields[0] == group {
            return fields[2].parse().ok();
        }
    }
    None
}
