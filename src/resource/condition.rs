//! Status conditions reported on managed resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition types tracked on every managed resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    /// The external object exists and is usable.
    Ready,
    /// The last reconcile pass completed without error.
    Synced,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionType,
    pub status: bool,
    pub reason: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    fn new(kind: ConditionType, status: bool, reason: &str) -> Self {
        Self {
            kind,
            status,
            reason: reason.to_string(),
            message: None,
            last_transition_time: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn available() -> Self {
        Self::new(ConditionType::Ready, true, "Available")
    }

    pub fn creating() -> Self {
        Self::new(ConditionType::Ready, false, "Creating")
    }

    pub fn deleting() -> Self {
        Self::new(ConditionType::Ready, false, "Deleting")
    }

    pub fn reconcile_success() -> Self {
        Self::new(ConditionType::Synced, true, "ReconcileSuccess")
    }

    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(ConditionType::Synced, false, "ReconcileError").with_message(message)
    }

    /// Same type, status, reason and message; timestamps are ignored.
    pub fn equivalent(&self, other: &Condition) -> bool {
        self.kind == other.kind
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Replaces the condition of the same type, keeping the original transition
/// time when nothing but the timestamp changed.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.kind == condition.kind) {
        Some(existing) if existing.equivalent(&condition) => {}
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}
