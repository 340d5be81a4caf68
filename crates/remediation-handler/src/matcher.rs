//! Match engine: decides which policy entries fire for an event.

use tracing::info;

use crate::config::MatchMode;
use crate::event::Event;
use crate::policy::RemediationAction;

/// A policy entry selected for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedAction {
    /// Check to execute.
    pub check: String,
    /// Resolved subscription targets, never empty.
    pub subscriptions: Vec<String>,
}

impl MatchedAction {
    fn resolve(action: &RemediationAction, event: &Event) -> Self {
        let subscriptions = if action.subscriptions.is_empty() {
            vec![format!("entity:{}", event.entity_name())]
        } else {
            action.subscriptions.clone()
        };
        Self {
            check: action.request.clone(),
            subscriptions,
        }
    }
}

/// Whether a single entry triggers on the event's severity and occurrence count.
#[must_use]
pub fn is_triggered(action: &RemediationAction, event: &Event) -> bool {
    let status = i64::from(event.status());
    if !action.severities.contains(&status) {
        info!(
            action = %action.request,
            severities = ?action.severities,
            status,
            "Remediation action not configured for this severity, nothing to do"
        );
        return false;
    }
    if !action.occurrences.contains(&event.occurrences()) {
        info!(
            action = %action.request,
            occurrences = ?action.occurrences,
            occurrence = event.occurrences(),
            "Remediation action not configured for this occurrence, nothing to do"
        );
        return false;
    }
    true
}

/// Evaluate entries in document order and return those to dispatch.
///
/// In [`MatchMode::First`] the result holds at most one action.
#[must_use]
pub fn match_actions(
    actions: &[RemediationAction],
    event: &Event,
    mode: MatchMode,
) -> Vec<MatchedAction> {
    let mut matched = Vec::new();

    for action in actions {
        if !is_triggered(action, event) {
            continue;
        }
        matched.push(MatchedAction::resolve(action, event));
        if mode == MatchMode::First {
            break;
        }
    }

    matched
}
