//! Event handling pipeline: policy → match → credential → dispatch.

use tracing::info;

use crate::auth::provider_for;
use crate::client::build_client;
use crate::config::HandlerConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::event::Event;
use crate::matcher::match_actions;
use crate::policy::parse_policy;

/// How an invocation completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The check carries no policy annotation.
    NoPolicy,
    /// A policy exists but no entry triggered.
    NoMatch,
    /// One outcome per dispatched action, in document order.
    Dispatched(Vec<DispatchOutcome>),
}

/// Handles one event per call against a fixed base configuration.
#[derive(Debug, Clone)]
pub struct Handler {
    config: HandlerConfig,
}

impl Handler {
    #[must_use]
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Evaluate the event's remediation policy and dispatch matching actions.
    ///
    /// Dispatches run sequentially; the first failure stops the rest.
    ///
    /// # Errors
    /// Returns any configuration, decode, authentication, TLS, network or
    /// dispatch error encountered along the way.
    pub async fn handle(&self, event: &Event) -> Result<HandlerOutcome> {
        event.validate()?;

        let config = self.config.with_annotation_overrides(event)?;
        config.validate()?;

        let Some(actions) = parse_policy(event, &config.annotation)? else {
            info!(
                check = %event.check_name(),
                annotation = %config.annotation,
                "No remediation actions configured, nothing to do"
            );
            return Ok(HandlerOutcome::NoPolicy);
        };

        let matched = match_actions(&actions, event, config.match_mode);
        if matched.is_empty() {
            info!(
                check = %event.check_name(),
                status = event.status(),
                occurrences = event.occurrences(),
                "No remediation action matched"
            );
            return Ok(HandlerOutcome::NoMatch);
        }

        let client = build_client(&config)?;
        let provider = provider_for(&config, &client)?;
        let credential = provider.credential().await?;
        let dispatcher = Dispatcher::new(client, config.base_url());

        let mut outcomes = Vec::with_capacity(matched.len());
        for action in &matched {
            outcomes.push(
                dispatcher
                    .dispatch(action, event.namespace(), &credential)
                    .await?,
            );
        }

        Ok(HandlerOutcome::Dispatched(outcomes))
    }
}
