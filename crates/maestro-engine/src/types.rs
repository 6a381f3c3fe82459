use chrono::{DateTime, Utc};
use maestro_core::{AgentResult, Payload, RetryPolicy, TaskError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Default per-attempt timeout when a task spec does not override it.
pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 300_000;

/// Default grace period granted to an in-flight agent call after cancellation.
pub const DEFAULT_CANCEL_GRACE_MS: u64 = 500;

fn default_concurrency() -> usize {
    5
}

fn default_cancel_grace_ms() -> u64 {
    DEFAULT_CANCEL_GRACE_MS
}

/// Priority band for ready-queue ordering.
///
/// Higher bands dispatch first; order within a band is FIFO.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Background work.
    Low,
    /// The default band.
    #[default]
    Normal,
    /// Preferred over normal work.
    High,
    /// Dispatched before everything else.
    Critical,
}

/// Specification of one task, as consumed by workflow construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique id within the workflow; referenced by `depends_on`.
    pub id: String,
    /// Registered agent kind that will execute this task.
    pub agent_kind: String,
    /// Opaque input payload handed to the agent.
    #[serde(default)]
    pub input: Payload,
    /// Ids of tasks that must complete before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Ready-queue priority band.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Per-attempt timeout override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Override for the maximum number of execution attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Override for the base backoff delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,
    /// Arbitrary key-value metadata; ignored by the engine.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TaskSpec {
    /// Creates a spec with defaults for everything but id and agent kind.
    pub fn new(id: impl Into<String>, agent_kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_kind: agent_kind.into(),
            input: Payload::Null,
            depends_on: Vec::new(),
            priority: TaskPriority::default(),
            timeout_ms: None,
            max_attempts: None,
            backoff_ms: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the input payload.
    pub fn with_input(mut self, input: Payload) -> Self {
        self.input = input;
        self
    }

    /// Declares dependencies on other task ids.
    pub fn depends_on(mut self, ids: Vec<impl Into<String>>) -> Self {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the priority band.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the per-attempt timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Overrides the maximum attempt count.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Overrides the base backoff delay.
    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = Some(backoff_ms);
        self
    }

    /// Effective per-attempt timeout: spec override, then the agent's
    /// default, then the engine default.
    pub(crate) fn timeout(&self, agent_default: Option<Duration>) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .or(agent_default)
            .unwrap_or(Duration::from_millis(DEFAULT_TASK_TIMEOUT_MS))
    }

    /// Effective retry policy: spec overrides applied on top of the agent's
    /// default (or the engine default).
    pub(crate) fn retry_policy(&self, agent_default: Option<RetryPolicy>) -> RetryPolicy {
        let mut policy = agent_default.unwrap_or_default();
        if let Some(max_attempts) = self.max_attempts {
            policy.max_attempts = max_attempts.max(1);
        }
        if let Some(backoff_ms) = self.backoff_ms {
            policy.backoff_base_ms = backoff_ms;
        }
        policy
    }
}

/// What happens to the rest of the graph when a task fails.
///
/// Dependents of a failed task are skipped under either policy (all declared
/// dependencies are required); the policy only controls whether unrelated
/// branches keep running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// A failure cancels every unrelated non-terminal task.
    FailFast,
    /// Unrelated branches run to completion.
    #[default]
    ContinueOnError,
}

/// Specification of a whole workflow: tasks plus execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    /// Optional human-readable name, echoed in the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The task set; dependency edges are implied by `depends_on`.
    pub tasks: Vec<TaskSpec>,
    /// Failure handling policy.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Maximum number of concurrently in-flight agent calls.
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,
    /// Wall-clock bound for the whole execution; on expiry every non-terminal
    /// task is cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_timeout_ms: Option<u64>,
    /// Grace period for in-flight calls to observe cancellation.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
    /// Arbitrary key-value metadata; ignored by the engine.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkflowSpec {
    /// Creates a spec with default policy around the given tasks.
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self {
            name: None,
            tasks,
            failure_policy: FailurePolicy::default(),
            concurrency_limit: default_concurrency(),
            workflow_timeout_ms: None,
            cancel_grace_ms: default_cancel_grace_ms(),
            metadata: HashMap::new(),
        }
    }

    /// Sets the workflow name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sets the concurrency limit.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Sets the workflow-level timeout.
    pub fn with_workflow_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.workflow_timeout_ms = Some(timeout_ms);
        self
    }
}

/// Execution status of a task.
///
/// `Pending` is initial; `Completed`, `Failed`, `Skipped`, and `Cancelled`
/// are terminal. `Retrying` is the running-equivalent state between a failed
/// attempt and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting on dependencies.
    Pending,
    /// All dependencies completed; queued for dispatch.
    Ready,
    /// An agent call is in flight.
    Running,
    /// A retriable failure occurred; the next attempt is scheduled.
    Retrying,
    /// The agent produced an output.
    Completed,
    /// Retries exhausted or a non-retriable failure occurred.
    Failed,
    /// A dependency did not complete; never dispatched.
    Skipped,
    /// Aborted by cancellation or workflow timeout.
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A task inside a built workflow: its spec plus mutable execution state.
///
/// Owned exclusively by the workflow; status and result are mutated only by
/// the scheduler loop driving that workflow.
#[derive(Debug, Clone)]
pub struct Task {
    /// The immutable specification.
    pub spec: TaskSpec,
    /// Current status.
    pub status: TaskStatus,
    /// Final result, present once the task reaches a terminal status that
    /// produced one.
    pub result: Option<AgentResult>,
}

impl Task {
    pub(crate) fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            status: TaskStatus::Pending,
            result: None,
        }
    }

    /// The task id.
    pub fn id(&self) -> &str {
        &self.spec.id
    }
}

/// Overall outcome of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Every task completed.
    Completed,
    /// Some tasks completed, others failed or were skipped.
    PartialSuccess,
    /// No task completed.
    Failed,
    /// Execution was cancelled before the graph drained.
    Cancelled,
}

/// Terminal report for one task inside a [`WorkflowResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Terminal status.
    pub status: TaskStatus,
    /// Output payload, for completed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,
    /// Structured error, for failed, skipped, and cancelled tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    /// Number of execution attempts actually made.
    pub attempts: u32,
    /// Duration of the final attempt in milliseconds.
    pub duration_ms: u64,
}

/// The final mapping from task id to terminal status, produced once at
/// workflow termination and read-only thereafter.
///
/// Every task in the workflow has an entry, always — enough detail to
/// distinguish "this task failed" from "this task was skipped because an
/// ancestor failed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Unique id of this execution.
    pub workflow_id: Uuid,
    /// Name from the spec, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overall outcome.
    pub status: WorkflowStatus,
    /// Per-task terminal reports.
    pub tasks: HashMap<String, TaskReport>,
    /// UTC timestamp when execution started.
    pub started_at: DateTime<Utc>,
    /// UTC timestamp when execution finished.
    pub completed_at: DateTime<Utc>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl WorkflowResult {
    /// Ids of tasks that completed, sorted.
    pub fn successful_tasks(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .tasks
            .iter()
            .filter(|(_, r)| r.status == TaskStatus::Completed)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of tasks that failed (not skipped, not cancelled), sorted.
    pub fn failed_tasks(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .tasks
            .iter()
            .filter(|(_, r)| r.status == TaskStatus::Failed)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Fraction of tasks that completed, in `[0.0, 1.0]`.
    pub fn success_rate(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.successful_tasks().len() as f64 / self.tasks.len() as f64
    }
}
