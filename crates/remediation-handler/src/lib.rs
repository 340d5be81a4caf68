//! Event-triggered remediation for Sensu checks.
//!
//! The handler reads a monitoring event, decodes the remediation policy
//! stored in one of the check's annotations, and asks the Sensu backend to
//! execute the configured remediation check when the event's severity and
//! occurrence count match an entry.
//!
//! # Usage
//!
//! ```no_run
//! use sensu_remediation_handler::{Event, Handler, HandlerConfig, HandlerOutcome};
//!
//! # async fn example(input: &str) -> sensu_remediation_handler::Result<()> {
//! let handler = Handler::new(HandlerConfig {
//!     api_key: "my-api-key".to_string(),
//!     ..HandlerConfig::default()
//! });
//!
//! let event = Event::from_json(input)?;
//! if let HandlerOutcome::Dispatched(outcomes) = handler.handle(&event).await? {
//!     for outcome in outcomes {
//!         println!("{} {}", outcome.status, outcome.body);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Policy format
//!
//! ```json
//! [{"request": "restart-nginx", "occurrences": [1, 2, 3], "severities": [1, 2], "subscriptions": []}]
//! ```
//!
//! An empty `subscriptions` list targets the event's entity
//! (`entity:<name>`).

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod matcher;
pub mod policy;

pub use auth::{Credential, CredentialProvider, StaticKey, TokenExchange};
pub use config::{HandlerConfig, MatchMode, DEFAULT_ANNOTATION, KEYSPACE};
pub use dispatch::{DispatchOutcome, Dispatcher, ExecutionRequest};
pub use error::{RemediationError, Result};
pub use event::Event;
pub use handler::{Handler, HandlerOutcome};
pub use matcher::{match_actions, MatchedAction};
pub use policy::{parse_policy, RemediationAction};
