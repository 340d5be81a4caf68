//! Remediation dispatch via the check execute endpoint.

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::Credential;
use crate::error::{RemediationError, Result};
use crate::matcher::MatchedAction;

/// Body of `POST /api/core/v2/namespaces/:namespace/checks/:check/execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub check: String,
    pub subscriptions: Vec<String>,
}

impl From<&MatchedAction> for ExecutionRequest {
    fn from(action: &MatchedAction) -> Self {
        Self {
            check: action.check.clone(),
            subscriptions: action.subscriptions.clone(),
        }
    }
}

/// Successful execute response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub check: String,
    pub status: u16,
    /// Response body, unmodified.
    pub body: String,
}

/// Sends execute requests to the backend API.
pub struct Dispatcher {
    client: Client,
    base_url: String,
}

impl Dispatcher {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL of the execute endpoint for `check` in `namespace`.
    ///
    /// `namespace` and `check` are percent-encoded as single path segments.
    ///
    /// # Errors
    /// Returns [`RemediationError::Configuration`] if the base URL cannot
    /// carry a path.
    pub fn execute_url(&self, namespace: &str, check: &str) -> Result<Url> {
        let invalid = |detail: String| {
            RemediationError::Configuration(format!(
                "invalid Sensu API URL \"{}\": {detail}",
                self.base_url
            ))
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "api",
                "core",
                "v2",
                "namespaces",
                namespace,
                "checks",
                check,
                "execute",
            ]);
        Ok(url)
    }

    /// Request execution of `action` in `namespace`.
    ///
    /// # Errors
    /// Returns [`RemediationError::CheckNotFound`] on 404,
    /// [`RemediationError::Dispatch`] on any other status of 300 or above,
    /// and [`RemediationError::Network`] on transport failure.
    pub async fn dispatch(
        &self,
        action: &MatchedAction,
        namespace: &str,
        credential: &Credential,
    ) -> Result<DispatchOutcome> {
        let url = self.execute_url(namespace, &action.check)?;
        let request = ExecutionRequest::from(action);

        info!(
            check = %action.check,
            subscriptions = ?action.subscriptions,
            namespace = %namespace,
            "Requesting remediation action"
        );
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(url.clone())
            .header("Authorization", credential.header_value())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemediationError::CheckNotFound {
                check: action.check.clone(),
                namespace: namespace.to_string(),
                url: url.to_string(),
            });
        }
        if status.as_u16() >= 300 {
            return Err(RemediationError::Dispatch {
                check: action.check.clone(),
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;
        info!(check = %action.check, status = status.as_u16(), "Remediation action requested");

        Ok(DispatchOutcome {
            check: action.check.clone(),
            status: status.as_u16(),
            body,
        })
    }
}
