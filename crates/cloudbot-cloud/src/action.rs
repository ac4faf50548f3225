//! Asynchronous provider actions

use serde::{Deserialize, Serialize};

/// Handle to an in-flight provider operation
///
/// Returned by every mutating provider call. A handle is polled until it
/// reaches a terminal status and is never reused afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHandle {
    /// Provider action ID
    pub id: u64,

    /// Command the provider is executing (e.g. "create_server")
    pub command: String,

    /// Current status
    pub status: ActionStatus,

    /// Error reported by the provider once the action failed
    pub error: Option<ActionError>,
}

impl ActionHandle {
    pub fn running(id: u64, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
            status: ActionStatus::Running,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != ActionStatus::Running
    }

    /// Terminal outcome, or `None` while the action is still running
    pub fn outcome(&self) -> Option<ActionOutcome> {
        match self.status {
            ActionStatus::Running => None,
            ActionStatus::Success => Some(ActionOutcome::Succeeded),
            ActionStatus::Error => Some(ActionOutcome::Failed(
                self.error
                    .clone()
                    .unwrap_or_else(|| ActionError::new("unknown", "action failed")),
            )),
        }
    }
}

/// Status of a provider action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStatus::Running => write!(f, "running"),
            ActionStatus::Success => write!(f, "success"),
            ActionStatus::Error => write!(f, "error"),
        }
    }
}

/// Error attached to a failed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

impl ActionError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Result of waiting on an action
///
/// `TimedOut` only means the wait gave up; the action may still be running
/// on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed(ActionError),
    TimedOut,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded)
    }
}
