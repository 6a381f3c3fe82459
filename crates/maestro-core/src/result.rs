use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque task input/output payload.
///
/// The engine never inspects payload contents; agents define their own
/// shapes. JSON keeps the same value representation on both sides of the
/// native/scripting boundary.
pub type Payload = serde_json::Value;

/// Terminal status of a single agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// The agent produced an output.
    Completed,
    /// The agent failed; `error` carries the taxonomy kind.
    Failed,
}

/// Outcome of one task execution, produced by an [`Agent`] and stamped by the
/// scheduler with the attempt count and duration.
///
/// [`Agent`]: https://docs.rs/maestro-agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Whether the invocation completed or failed.
    pub status: AgentStatus,
    /// Output payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,
    /// Structured error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    /// Number of execution attempts actually made (set by the scheduler).
    #[serde(default)]
    pub attempts: u32,
    /// Wall-clock duration of the final attempt in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl AgentResult {
    /// Creates a successful result with the given output payload.
    pub fn completed(output: Payload) -> Self {
        Self {
            status: AgentStatus::Completed,
            output: Some(output),
            error: None,
            attempts: 0,
            duration_ms: 0,
        }
    }

    /// Creates a failed result carrying the given error.
    pub fn failed(error: TaskError) -> Self {
        Self {
            status: AgentStatus::Failed,
            output: None,
            error: Some(error),
            attempts: 0,
            duration_ms: 0,
        }
    }

    /// Records the duration of the attempt that produced this result.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Records how many attempts were consumed.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Whether the invocation completed successfully.
    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Completed
    }

    /// Whether the invocation failed.
    pub fn is_failure(&self) -> bool {
        self.status == AgentStatus::Failed
    }
}
