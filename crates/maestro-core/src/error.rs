use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A convenience `Result` alias using [`MaestroError`].
pub type MaestroResult<T> = Result<T, MaestroError>;

/// Top-level error type for the Maestro engine.
///
/// Each variant corresponds to a subsystem that can produce errors.
/// Construction-time workflow problems surface as [`MaestroError::Validation`]
/// and are never retried; execution-time failures live inside task results as
/// [`TaskError`] instead.
#[derive(Debug, Error)]
pub enum MaestroError {
    /// A malformed workflow specification (cycle, unknown dependency, unknown
    /// agent kind). Always fatal at construction.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A lookup for an agent kind that was never registered.
    #[error("unknown agent kind '{0}'")]
    UnknownAgentKind(String),

    /// An error in configuration parsing or validation.
    #[error("config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request to an inference backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A scheduler invariant was violated. This is a bug in the engine, not a
    /// user-facing failure mode.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// A violation detected while building a [`Workflow`] from its specification.
///
/// Construction fails atomically on the first violation — no partially-built
/// workflow is ever returned.
///
/// [`Workflow`]: https://docs.rs/maestro-engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The spec contains no tasks.
    #[error("workflow contains no tasks")]
    EmptyWorkflow,

    /// Two tasks in the same spec share an id.
    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(String),

    /// A task references a dependency id that does not exist in the spec.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// The task declaring the dependency.
        task: String,
        /// The dependency id that could not be resolved.
        dependency: String,
    },

    /// A task names an agent kind the registry has never seen.
    #[error("task '{task}' uses unregistered agent kind '{kind}'")]
    UnknownAgentKind {
        /// The task declaring the agent kind.
        task: String,
        /// The unregistered kind tag.
        kind: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected involving task '{0}'")]
    Cycle(String),

    /// The workflow's concurrency limit is zero.
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
}

/// The execution-time error taxonomy.
///
/// Every failed task carries exactly one of these kinds so callers see a
/// uniform taxonomy regardless of whether the in-process or native execution
/// path ran the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The agent did not complete within its deadline. Retriable.
    Timeout,
    /// An agent-reported recoverable failure (rate limit, connection reset).
    /// Retriable.
    Transient,
    /// An agent-reported non-recoverable failure. Not retried.
    Permanent,
    /// The task was aborted by cancellation. Terminal, not retried.
    Cancelled,
    /// A malformed input rejected by the agent. Not retried.
    Validation,
    /// Synthetic kind for skipped tasks, recording which dependency caused
    /// the cascade.
    DependencyFailed,
}

impl ErrorKind {
    /// Whether a failure of this kind may be retried under the task's policy.
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Transient)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Validation => "validation",
            ErrorKind::DependencyFailed => "dependency_failed",
        };
        write!(f, "{s}")
    }
}

/// Structured error attached to a failed [`AgentResult`].
///
/// [`AgentResult`]: crate::result::AgentResult
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Taxonomy kind of the failure.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause (e.g. the transport error text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl TaskError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches an underlying cause.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// A deadline-exceeded error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// A recoverable failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    /// A non-recoverable failure.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, message)
    }

    /// A cancellation marker.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// The synthetic error recorded on a task skipped because `dependency`
    /// did not complete.
    pub fn dependency_failed(dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        Self {
            kind: ErrorKind::DependencyFailed,
            message: format!("dependency '{dependency}' did not complete"),
            cause: Some(dependency),
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
