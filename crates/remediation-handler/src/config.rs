//! Handler configuration.
//!
//! [`HandlerConfig`] is built once at startup from flags and environment
//! variables and passed by reference to every component. Individual events
//! may override options through annotations under [`KEYSPACE`]; overriding
//! produces a new value and never mutates the base configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::{RemediationError, Result};
use crate::event::Event;

/// Annotation key that holds the remediation policy unless overridden.
pub const DEFAULT_ANNOTATION: &str = "io.sensu.remediation.config.actions";

/// Default backend API location.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Default timeout for each API request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Annotation prefix for per-event configuration overrides.
pub const KEYSPACE: &str = "sensu.io/plugins/sensu-remediation-handler/config";

/// How many matching policy entries are dispatched per event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchMode {
    /// Dispatch only the first matching entry.
    #[default]
    First,
    /// Dispatch every matching entry in document order.
    All,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = RemediationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(RemediationError::Configuration(format!(
                "unknown match mode \"{other}\" (expected \"first\" or \"all\")"
            ))),
        }
    }
}

/// Immutable handler configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Check annotation holding the policy JSON.
    pub annotation: String,
    /// Backend API base URL.
    pub api_url: String,
    /// Static API key; takes precedence over username/password.
    pub api_key: String,
    /// Username for the `/auth` token exchange.
    pub api_user: String,
    /// Password for the `/auth` token exchange.
    pub api_password: String,
    /// PEM bundle added to the trusted roots.
    pub trusted_ca_file: Option<PathBuf>,
    /// Whether the first or every matching policy entry is dispatched.
    pub match_mode: MatchMode,
    /// Timeout applied to every API request.
    pub timeout: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            annotation: DEFAULT_ANNOTATION.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            api_user: String::new(),
            api_password: String::new(),
            trusted_ca_file: None,
            match_mode: MatchMode::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("annotation", &self.annotation)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_user", &self.api_user)
            .field("api_password", &redact(&self.api_password))
            .field("trusted_ca_file", &self.trusted_ca_file)
            .field("match_mode", &self.match_mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl HandlerConfig {
    /// Check that the API location and one form of credentials are present.
    ///
    /// # Errors
    /// Returns [`RemediationError::Configuration`] describing the first
    /// missing value.
    pub fn validate(&self) -> Result<()> {
        if self.annotation.is_empty() {
            return Err(RemediationError::Configuration(
                "--annotation flag or $SENSU_REMEDIATION_ANNOTATION environment variable must be set"
                    .to_string(),
            ));
        }
        if self.api_url.is_empty() {
            return Err(RemediationError::Configuration(
                "--sensu-api-url flag or $SENSU_API_URL environment variable must be set"
                    .to_string(),
            ));
        }
        if self.api_key.is_empty() && (self.api_user.is_empty() || self.api_password.is_empty())
        {
            return Err(RemediationError::Configuration(
                "--sensu-api-key (or --sensu-api-user and --sensu-api-password) flags or matching environment variables must be set"
                    .to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(RemediationError::Configuration(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Apply per-event overrides found in annotations under [`KEYSPACE`].
    ///
    /// Check annotations win over entity annotations. Empty values are
    /// ignored.
    ///
    /// # Errors
    /// Returns [`RemediationError::Configuration`] when an override value
    /// cannot be parsed.
    pub fn with_annotation_overrides(&self, event: &Event) -> Result<Self> {
        let mut config = self.clone();

        for option in OverridableOption::ALL {
            let key = format!("{KEYSPACE}/{}", option.path());
            let value = event
                .check_annotation(&key)
                .or_else(|| event.entity_annotation(&key));
            if let Some(value) = value {
                debug!(option = option.path(), "Applying configuration override from annotation");
                option.apply(&mut config, value)?;
            }
        }

        Ok(config)
    }
}

/// Options that may be overridden from event annotations.
#[derive(Debug, Clone, Copy)]
enum OverridableOption {
    Annotation,
    ApiUrl,
    ApiKey,
    ApiUser,
    ApiPassword,
    TrustedCaFile,
    MatchMode,
    Timeout,
}

impl OverridableOption {
    const ALL: [Self; 8] = [
        Self::Annotation,
        Self::ApiUrl,
        Self::ApiKey,
        Self::ApiUser,
        Self::ApiPassword,
        Self::TrustedCaFile,
        Self::MatchMode,
        Self::Timeout,
    ];

    const fn path(self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::ApiUrl => "sensu-api-url",
            Self::ApiKey => "sensu-api-key",
            Self::ApiUser => "sensu-api-user",
            Self::ApiPassword => "sensu-api-password",
            Self::TrustedCaFile => "sensu-trusted-ca-file",
            Self::MatchMode => "match-mode",
            Self::Timeout => "timeout",
        }
    }

    fn apply(self, config: &mut HandlerConfig, value: &str) -> Result<()> {
        match self {
            Self::Annotation => config.annotation = value.to_string(),
            Self::ApiUrl => config.api_url = value.to_string(),
            Self::ApiKey => config.api_key = value.to_string(),
            Self::ApiUser => config.api_user = value.to_string(),
            Self::ApiPassword => config.api_password = value.to_string(),
            Self::TrustedCaFile => config.trusted_ca_file = Some(PathBuf::from(value)),
            Self::MatchMode => config.match_mode = value.parse()?,
            Self::Timeout => {
                let secs: u64 = value.trim().parse().map_err(|_| {
                    RemediationError::Configuration(format!(
                        "invalid timeout override \"{value}\" (expected whole seconds)"
                    ))
                })?;
                config.timeout = Duration::from_secs(secs);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(path: &str) -> String {
        format!("{KEYSPACE}/{path}")
    }

    fn event() -> Event {
        serde_json::from_value(serde_json::json!({
            "check": {"metadata": {"name": "check-nginx"}, "status": 2, "occurrences": 1},
            "entity": {"metadata": {"name": "web-01", "namespace": "default"}}
        }))
        .unwrap()
    }

    fn keyed_config() -> HandlerConfig {
        HandlerConfig {
            api_key: "secret".to_string(),
            ..HandlerConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.annotation, DEFAULT_ANNOTATION);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.match_mode, MatchMode::First);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_validate_requires_credentials() {
        let err = HandlerConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("--sensu-api-key"));

        keyed_config().validate().unwrap();

        let exchange = HandlerConfig {
            api_user: "admin".to_string(),
            api_password: "P@ssw0rd!".to_string(),
            ..HandlerConfig::default()
        };
        exchange.validate().unwrap();

        let user_only = HandlerConfig {
            api_user: "admin".to_string(),
            ..HandlerConfig::default()
        };
        assert!(user_only.validate().is_err());
    }

    #[test]
    fn test_validate_requires_api_url() {
        let config = HandlerConfig {
            api_url: String::new(),
            ..keyed_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SENSU_API_URL"));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = HandlerConfig {
            api_url: "https://sensu.example.com:8080/".to_string(),
            ..keyed_config()
        };
        assert_eq!(config.base_url(), "https://sensu.example.com:8080");
    }

    #[test]
    fn test_match_mode_parsing() {
        assert_eq!("first".parse::<MatchMode>().unwrap(), MatchMode::First);
        assert_eq!(" ALL ".parse::<MatchMode>().unwrap(), MatchMode::All);
        assert!("some".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::All.to_string(), "all");
    }

    #[test]
    fn test_overrides_from_check_annotations() {
        let mut event = event();
        let annotations = &mut event.check.metadata.annotations;
        annotations.insert(keyed("annotation"), "custom.actions".to_string());
        annotations.insert(keyed("sensu-api-url"), "https://backend:8080".to_string());
        annotations.insert(keyed("match-mode"), "all".to_string());
        annotations.insert(keyed("timeout"), "5".to_string());

        let base = keyed_config();
        let config = base.with_annotation_overrides(&event).unwrap();
        assert_eq!(config.annotation, "custom.actions");
        assert_eq!(config.api_url, "https://backend:8080");
        assert_eq!(config.match_mode, MatchMode::All);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.api_key, "secret");
        // base is untouched
        assert_eq!(base.annotation, DEFAULT_ANNOTATION);
    }

    #[test]
    fn test_check_annotation_wins_over_entity() {
        let mut event = event();
        event
            .entity
            .metadata
            .annotations
            .insert(keyed("annotation"), "entity.actions".to_string());
        event
            .entity
            .metadata
            .annotations
            .insert(keyed("sensu-api-key"), "entity-key".to_string());
        event
            .check
            .metadata
            .annotations
            .insert(keyed("annotation"), "check.actions".to_string());

        let config = keyed_config().with_annotation_overrides(&event).unwrap();
        assert_eq!(config.annotation, "check.actions");
        assert_eq!(config.api_key, "entity-key");
    }

    #[test]
    fn test_invalid_override_is_configuration_error() {
        let mut event = event();
        event
            .check
            .metadata
            .annotations
            .insert(keyed("timeout"), "soon".to_string());
        let err = keyed_config().with_annotation_overrides(&event).unwrap_err();
        assert!(matches!(err, RemediationError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = HandlerConfig {
            api_password: "hunter2".to_string(),
            ..keyed_config()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
