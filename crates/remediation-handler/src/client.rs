//! HTTP client construction.

use std::path::Path;

use reqwest::{Certificate, Client};
use tracing::debug;

use crate::config::HandlerConfig;
use crate::error::{RemediationError, Result};

/// Build the client shared by the credential exchange and the dispatcher.
///
/// The configured timeout applies to every request. When a trusted CA file
/// is configured its certificates are added on top of the system roots.
///
/// # Errors
/// Returns [`RemediationError::Tls`] if the CA file cannot be read or parsed,
/// or [`RemediationError::Network`] if the client cannot be built.
pub fn build_client(config: &HandlerConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("sensu-remediation-handler/", env!("CARGO_PKG_VERSION")));

    if let Some(path) = config.trusted_ca_file.as_deref() {
        for cert in load_ca_bundle(path)? {
            builder = builder.add_root_certificate(cert);
        }
    }

    Ok(builder.build()?)
}

fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>> {
    let tls_error = |message: String| RemediationError::Tls {
        path: path.display().to_string(),
        message,
    };

    let pem = std::fs::read(path).map_err(|e| tls_error(e.to_string()))?;
    let certs = Certificate::from_pem_bundle(&pem).map_err(|e| tls_error(e.to_string()))?;
    if certs.is_empty() {
        return Err(tls_error("no PEM certificates found".to_string()));
    }

    debug!(path = %path.display(), count = certs.len(), "Loaded trusted CA certificates");
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builds_without_ca_file() {
        build_client(&HandlerConfig::default()).unwrap();
    }

    #[test]
    fn test_missing_ca_file_is_tls_error() {
        let config = HandlerConfig {
            trusted_ca_file: Some("/nonexistent/ca.pem".into()),
            ..HandlerConfig::default()
        };
        match build_client(&config).unwrap_err() {
            RemediationError::Tls { path, .. } => assert_eq!(path, "/nonexistent/ca.pem"),
            other => panic!("expected Tls, got: {other:?}"),
        }
    }

    #[test]
    fn test_ca_file_without_certificates_is_tls_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();
        let config = HandlerConfig {
            trusted_ca_file: Some(file.path().to_path_buf()),
            ..HandlerConfig::default()
        };
        assert!(matches!(
            build_client(&config).unwrap_err(),
            RemediationError::Tls { .. }
        ));
    }
}
