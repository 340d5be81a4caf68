//! Remediation policy decoding.
//!
//! A policy is a JSON array of [`RemediationAction`] entries stored as a
//! string annotation on the event's check:
//!
//! ```json
//! [
//!   {
//!     "request": "restart-nginx",
//!     "occurrences": [1, 2, 3],
//!     "severities": [1, 2],
//!     "subscriptions": []
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RemediationError, Result};
use crate::event::Event;

/// One configured remediation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    /// Name of the check to execute when the rule fires.
    pub request: String,
    /// Occurrence counts that trigger the rule.
    #[serde(default)]
    pub occurrences: Vec<i64>,
    /// Check severities that trigger the rule.
    #[serde(default)]
    pub severities: Vec<i64>,
    /// Explicit subscriptions to target; empty means the event's entity.
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

/// Read the policy stored under `annotation` on the event's check.
///
/// Returns `Ok(None)` when the annotation is absent or empty.
///
/// # Errors
/// Returns [`RemediationError::PolicyDecode`] when the annotation value is
/// not a JSON array of actions.
pub fn parse_policy(event: &Event, annotation: &str) -> Result<Option<Vec<RemediationAction>>> {
    let Some(raw) = event.check_annotation(annotation) else {
        return Ok(None);
    };

    let actions: Vec<RemediationAction> =
        serde_json::from_str(raw).map_err(|source| RemediationError::PolicyDecode {
            annotation: annotation.to_string(),
            source,
        })?;

    debug!(
        annotation = %annotation,
        count = actions.len(),
        "Decoded remediation actions"
    );
    Ok(Some(actions))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "io.sensu.remediation.config.actions";

    fn event_with(annotation: Option<&str>) -> Event {
        let mut event: Event = serde_json::from_value(serde_json::json!({
            "check": {"metadata": {"name": "check-nginx"}, "status": 2, "occurrences": 1},
            "entity": {"metadata": {"name": "web-01", "namespace": "default"}}
        }))
        .unwrap();
        if let Some(value) = annotation {
            event
                .check
                .metadata
                .annotations
                .insert(KEY.to_string(), value.to_string());
        }
        event
    }

    #[test]
    fn test_missing_annotation_is_no_policy() {
        assert_eq!(parse_policy(&event_with(None), KEY).unwrap(), None);
    }

    #[test]
    fn test_empty_annotation_is_no_policy() {
        assert_eq!(parse_policy(&event_with(Some("")), KEY).unwrap(), None);
    }

    #[test]
    fn test_parses_entries_in_document_order() {
        let event = event_with(Some(
            r#"[
                {"request":"restart-nginx","occurrences":[1,2,3],"severities":[1,2],"subscriptions":[]},
                {"request":"page-oncall","occurrences":[10],"severities":[2],"subscriptions":["ops"]}
            ]"#,
        ));
        let actions = parse_policy(&event, KEY).unwrap().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].request, "restart-nginx");
        assert_eq!(actions[0].occurrences, vec![1, 2, 3]);
        assert!(actions[0].subscriptions.is_empty());
        assert_eq!(actions[1].subscriptions, vec!["ops".to_string()]);
    }

    #[test]
    fn test_absent_subscriptions_default_to_empty() {
        let event = event_with(Some(
            r#"[{"request":"restart-nginx","occurrences":[1],"severities":[2]}]"#,
        ));
        let actions = parse_policy(&event, KEY).unwrap().unwrap();
        assert!(actions[0].subscriptions.is_empty());
    }

    #[test]
    fn test_malformed_annotation_is_decode_error() {
        let err = parse_policy(&event_with(Some("{not json")), KEY).unwrap_err();
        match err {
            RemediationError::PolicyDecode { annotation, .. } => assert_eq!(annotation, KEY),
            other => panic!("expected PolicyDecode, got: {other:?}"),
        }
    }

    #[test]
    fn test_object_instead_of_array_is_decode_error() {
        let event = event_with(Some(r#"{"request":"restart-nginx"}"#));
        assert!(parse_policy(&event, KEY).is_err());
    }

    #[test]
    fn test_action_survives_json_round_trip() {
        let action = RemediationAction {
            request: "restart-nginx".to_string(),
            occurrences: vec![1, 5],
            severities: vec![2],
            subscriptions: vec!["linux".to_string(), "entity:web-01".to_string()],
        };
        let json = serde_json::to_string(&action).unwrap();
        let decoded: RemediationAction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, action);
    }
}
