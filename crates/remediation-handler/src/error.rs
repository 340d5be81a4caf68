//! Error types for the remediation handler.

use thiserror::Error;

/// Errors that terminate a handler invocation.
///
/// None of these are retried. "No policy configured" and "no entry matched"
/// are reported through [`crate::HandlerOutcome`] instead.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// Missing or invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The event document could not be decoded.
    #[error("Failed to decode event: {0}")]
    EventDecode(#[source] serde_json::Error),

    /// The event decoded but is missing required data.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// The remediation policy annotation is not a valid action list.
    #[error("Failed to decode remediation actions in annotation \"{annotation}\": {source}")]
    PolicyDecode {
        annotation: String,
        #[source]
        source: serde_json::Error,
    },

    /// The authentication endpoint rejected or failed the credential exchange.
    #[error("Authentication failed ({url}): {message}")]
    Authentication {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The execute endpoint returned 404 for the requested check.
    #[error("404 Not Found ({url}); no check named \"{check}\" found in namespace \"{namespace}\"")]
    CheckNotFound {
        check: String,
        namespace: String,
        url: String,
    },

    /// The execute endpoint returned a non-success status.
    #[error("Dispatch of \"{check}\" failed ({url}): {status} {reason}")]
    Dispatch {
        check: String,
        url: String,
        status: u16,
        reason: String,
    },

    /// Transport-level failure reaching the API.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The trusted CA bundle could not be loaded.
    #[error("Failed to load trusted CA file ({path}): {message}")]
    Tls { path: String, message: String },
}

impl RemediationError {
    /// HTTP status attached to the error, when the API returned one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::CheckNotFound { .. } => Some(404),
            Self::Dispatch { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RemediationError>;
