//! Credential acquisition for the backend API.
//!
//! Two providers implement [`CredentialProvider`]:
//!
//! - [`StaticKey`] sends a preconfigured API key as `Key <value>`.
//! - [`TokenExchange`] trades a username/password for an access token via
//!   `GET /auth` and sends it as `Bearer <token>`.
//!
//! Tokens are never cached; each invocation that needs one performs a fresh
//! exchange.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::HandlerConfig;
use crate::error::{RemediationError, Result};

/// A value for the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static API key.
    ApiKey(String),
    /// Access token obtained from `/auth`.
    Bearer {
        token: String,
        expires_at: Option<DateTime<Utc>>,
    },
}

impl Credential {
    /// Render the `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::ApiKey(key) => format!("Key {key}"),
            Self::Bearer { token, .. } => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::Bearer { expires_at, .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .field("expires_at", expires_at)
                .finish(),
        }
    }
}

/// Source of the `Authorization` header for API requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Produce a credential for the next request.
    async fn credential(&self) -> Result<Credential>;
}

/// Pick the provider implied by the configuration.
///
/// An API key takes precedence over username/password.
///
/// # Errors
/// Returns [`RemediationError::Configuration`] if neither form of credentials
/// is configured.
pub fn provider_for(config: &HandlerConfig, client: &Client) -> Result<Box<dyn CredentialProvider>> {
    if !config.api_key.is_empty() {
        return Ok(Box::new(StaticKey::new(config.api_key.clone())));
    }
    if !config.api_user.is_empty() && !config.api_password.is_empty() {
        return Ok(Box::new(TokenExchange::new(
            client.clone(),
            config.base_url(),
            config.api_user.clone(),
            config.api_password.clone(),
        )));
    }
    Err(RemediationError::Configuration(
        "no API key or username/password configured".to_string(),
    ))
}

/// Preconfigured API key used verbatim.
pub struct StaticKey {
    key: String,
}

impl StaticKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticKey {
    fn name(&self) -> &'static str {
        "api-key"
    }

    async fn credential(&self) -> Result<Credential> {
        Ok(Credential::ApiKey(self.key.clone()))
    }
}

/// Response body of `GET /auth`.
#[derive(Debug, Deserialize)]
struct AuthTokens {
    access_token: String,
    #[allow(dead_code)]
    #[serde(default)]
    refresh_token: String,
    /// Unix timestamp in seconds.
    #[serde(default)]
    expires_at: i64,
}

/// Basic-auth exchange against the `/auth` endpoint.
pub struct TokenExchange {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl TokenExchange {
    #[must_use]
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn auth_url(&self) -> String {
        format!("{}/auth", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CredentialProvider for TokenExchange {
    fn name(&self) -> &'static str {
        "token-exchange"
    }

    async fn credential(&self) -> Result<Credential> {
        let url = self.auth_url();
        debug!(url = %url, user = %self.username, "Requesting access token");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemediationError::Authentication {
                url,
                status: Some(status.as_u16()),
                message: "invalid credentials".to_string(),
            });
        }
        if !status.is_success() {
            return Err(RemediationError::Authentication {
                url,
                status: Some(status.as_u16()),
                message: format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let text = response.text().await?;
        let tokens: AuthTokens =
            serde_json::from_str(&text).map_err(|e| RemediationError::Authentication {
                url: url.clone(),
                status: Some(status.as_u16()),
                message: format!("unexpected response body: {e}"),
            })?;

        let expires_at = Utc.timestamp_opt(tokens.expires_at, 0).single();
        info!(expires_at = ?expires_at, "Obtained access token");

        Ok(Credential::Bearer {
            token: tokens.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_values() {
        assert_eq!(Credential::ApiKey("abc".to_string()).header_value(), "Key abc");
        let bearer = Credential::Bearer {
            token: "tok".to_string(),
            expires_at: None,
        };
        assert_eq!(bearer.header_value(), "Bearer tok");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", Credential::ApiKey("abc123".to_string()));
        assert!(!rendered.contains("abc123"));
    }

    #[tokio::test]
    async fn test_static_key_is_used_verbatim() {
        let provider = StaticKey::new("1b2c3d");
        let credential = provider.credential().await.unwrap();
        assert_eq!(credential.header_value(), "Key 1b2c3d");
    }

    #[test]
    fn test_provider_selection() {
        let client = Client::new();

        let keyed = HandlerConfig {
            api_key: "k".to_string(),
            api_user: "admin".to_string(),
            api_password: "pw".to_string(),
            ..HandlerConfig::default()
        };
        assert_eq!(provider_for(&keyed, &client).unwrap().name(), "api-key");

        let exchange = HandlerConfig {
            api_user: "admin".to_string(),
            api_password: "pw".to_string(),
            ..HandlerConfig::default()
        };
        assert_eq!(provider_for(&exchange, &client).unwrap().name(), "token-exchange");

        assert!(matches!(
            provider_for(&HandlerConfig::default(), &client),
            Err(RemediationError::Configuration(_))
        ));
    }

    #[test]
    fn test_auth_url_joins_base() {
        let exchange = TokenExchange::new(Client::new(), "http://127.0.0.1:8080/", "a", "b");
        assert_eq!(exchange.auth_url(), "http://127.0.0.1:8080/auth");
    }
}
