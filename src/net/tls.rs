//! TLS material loading for TCP listeners.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::schema::TlsMaterial;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file not found: {0}")]
    MissingCert(String),

    #[error("private key file not found: {0}")]
    MissingKey(String),

    #[error("failed to load TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Load PEM certificate and key into a rustls server configuration.
pub async fn load(material: &TlsMaterial) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&material.cert_path);
    let key_path = Path::new(&material.key_path);

    if !cert_path.exists() {
        return Err(TlsError::MissingCert(material.cert_path.clone()));
    }
    if !key_path.exists() {
        return Err(TlsError::MissingKey(material.key_path.clone()));
    }

    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_missing_material() {
        let material = TlsMaterial {
            cert_path: "/nonexistent/cert.pem".to_string(),
            key_path: "/nonexistent/key.pem".to_string(),
        };
        let err = load(&material).await.unwrap_err();
        assert!(matches!(err, TlsError::MissingCert(_)));
    }
}
