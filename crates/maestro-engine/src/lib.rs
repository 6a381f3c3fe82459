//! Workflow model and concurrent task scheduler for Maestro.
//!
//! Models a unit of work as a [`Task`], groups tasks into a validated
//! dependency graph ([`Workflow`]), dispatches each task to a pluggable
//! agent, and guarantees dependency ordering, bounded concurrency, retry,
//! timeout, and cancellation semantics across the graph.
//!
//! # Main types
//!
//! - [`Workflow`] — Immutable, cycle-checked DAG of tasks.
//! - [`Scheduler`] — Walks the graph and dispatches ready tasks under a
//!   concurrency bound.
//! - [`SchedulerController`] — Cooperative cancellation handle.
//! - [`ExecutionMonitor`] — Passive per-agent-kind metrics.
//! - [`ResultAggregator`] — Collects terminal statuses into a
//!   [`WorkflowResult`].
//! - [`boundary`] — Serialized descriptor seam for callers in other runtimes.

/// Terminal result collection.
pub mod aggregator;
/// Serialized descriptor boundary for the native/scripting call path.
pub mod boundary;
/// Per-agent-kind execution metrics.
pub mod monitor;
/// The execution engine.
pub mod scheduler;
/// Task, workflow, and result types.
pub mod types;
/// Workflow construction and validation.
pub mod workflow;

pub use aggregator::ResultAggregator;
pub use monitor::{ExecutionMonitor, KindMetrics};
pub use scheduler::{Scheduler, SchedulerController};
pub use types::{
    FailurePolicy, Task, TaskPriority, TaskReport, TaskSpec, TaskStatus, WorkflowResult,
    WorkflowSpec, WorkflowStatus,
};
pub use workflow::Workflow;
