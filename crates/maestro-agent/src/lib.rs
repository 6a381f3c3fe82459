//! Agent contract and registry for the Maestro orchestration engine.
//!
//! An [`Agent`] performs one task's actual work given an input payload and an
//! execution context carrying the attempt deadline and a cancellation token.
//! The engine treats every agent as a black box satisfying only this
//! contract; new agent kinds are added by registering a factory with the
//! [`AgentRegistry`], never by changing scheduler logic.
//!
//! # Main types
//!
//! - [`Agent`] — The single-capability execution contract.
//! - [`ExecutionContext`] — Deadline and cancellation signal for one attempt.
//! - [`AgentRegistry`] — Maps agent-kind tags to factories.
//! - [`BackendClient`] / [`BackendConfig`] — HTTP client for inference backends.
//! - [`BackendAgent`] — Built-in agent calling an inference backend with a
//!   per-kind profile (reasoning, retrieval, codegen, review, docs, testing).

/// Inference backend HTTP client.
pub mod backend;
/// Built-in backend-calling agent.
pub mod builtin;
/// Per-kind agent profiles and prompts.
pub mod profiles;
/// Agent kind registry.
pub mod registry;

use async_trait::async_trait;
use maestro_core::{AgentResult, Payload, RetryPolicy};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub use backend::{BackendClient, BackendConfig};
pub use builtin::{register_builtin_agents, BackendAgent};
pub use profiles::{default_profiles, AgentProfile};
pub use registry::{AgentFactory, AgentRegistry};

/// Deadline and cancellation signal supplied to an agent for one attempt.
///
/// Agents must return before `deadline` (with a `Timeout`-kind failure if the
/// underlying call cannot finish in time) and should observe `cancel`
/// promptly. The scheduler enforces both bounds regardless, dropping the
/// in-flight call future once they are exceeded.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Hard deadline for this attempt.
    pub deadline: Instant,
    /// Cooperative cancellation signal for this attempt.
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    /// Creates a context expiring `timeout` from now.
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a context with an explicit deadline and cancellation token.
    pub fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    /// Time remaining until the deadline, zero if already past.
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A pluggable unit of work dispatched by the scheduler.
///
/// Implementations report failures inside the returned [`AgentResult`] rather
/// than through `Result`, so the scheduler sees one uniform error taxonomy.
/// Side effects (network calls, file I/O) are the implementation's own
/// responsibility.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The kind tag this agent was registered under.
    fn kind(&self) -> &str;

    /// Executes one task attempt against the given input.
    async fn execute(&self, input: &Payload, ctx: &ExecutionContext) -> AgentResult;

    /// Per-attempt timeout applied when a task does not override it.
    fn default_timeout(&self) -> Option<Duration> {
        None
    }

    /// Retry policy applied when a task does not override it.
    fn default_retry_policy(&self) -> Option<RetryPolicy> {
        None
    }
}
