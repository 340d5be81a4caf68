//! Monitoring event model.
//!
//! Only the fields the handler reads are modelled; everything else in the
//! event document is ignored during decoding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{RemediationError, Result};

/// Object metadata shared by checks and entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Namespace the object lives in.
    #[serde(default)]
    pub namespace: String,
    /// Free-form string annotations.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// Result of a single check execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub metadata: ObjectMeta,
    /// Severity code (0 ok, 1 warning, 2 critical, anything else unknown).
    #[serde(default)]
    pub status: u32,
    /// Consecutive times the check has reported `status`.
    #[serde(default)]
    pub occurrences: i64,
}

/// The entity the check ran against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub metadata: ObjectMeta,
}

/// A monitoring event as delivered on stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub check: Check,
    pub entity: Entity,
}

impl Event {
    /// Decode an event document.
    ///
    /// # Errors
    /// Returns [`RemediationError::EventDecode`] for malformed JSON or
    /// missing `check`/`entity` objects.
    pub fn from_json(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(RemediationError::InvalidEvent(
                "event document is empty".to_string(),
            ));
        }
        serde_json::from_str(input).map_err(RemediationError::EventDecode)
    }

    /// Reject events without the identifiers needed to address a dispatch.
    ///
    /// # Errors
    /// Returns [`RemediationError::InvalidEvent`] naming the missing field.
    pub fn validate(&self) -> Result<()> {
        if self.check.metadata.name.is_empty() {
            return Err(RemediationError::InvalidEvent(
                "check name must be set".to_string(),
            ));
        }
        if self.entity.metadata.name.is_empty() {
            return Err(RemediationError::InvalidEvent(
                "entity name must be set".to_string(),
            ));
        }
        if self.entity.metadata.namespace.is_empty() {
            return Err(RemediationError::InvalidEvent(
                "entity namespace must be set".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn check_name(&self) -> &str {
        &self.check.metadata.name
    }

    #[must_use]
    pub fn status(&self) -> u32 {
        self.check.status
    }

    #[must_use]
    pub fn occurrences(&self) -> i64 {
        self.check.occurrences
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity.metadata.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.entity.metadata.namespace
    }

    /// Look up a non-empty check annotation.
    #[must_use]
    pub fn check_annotation(&self, key: &str) -> Option<&str> {
        self.check
            .metadata
            .annotations
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a non-empty entity annotation.
    #[must_use]
    pub fn entity_annotation(&self, key: &str) -> Option<&str> {
        self.entity
            .metadata
            .annotations
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
