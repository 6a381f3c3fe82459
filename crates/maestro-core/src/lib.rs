//! Core types and error definitions for the Maestro orchestration engine.
//!
//! This crate provides the foundational types shared across all Maestro
//! crates: the error taxonomy, agent execution results, and retry policy.
//!
//! # Main types
//!
//! - [`MaestroError`] — Unified error enum for all Maestro subsystems.
//! - [`MaestroResult`] — Convenience alias for `Result<T, MaestroError>`.
//! - [`ErrorKind`] — The execution-time error taxonomy attached to task results.
//! - [`TaskError`] — Structured error (kind + message + optional cause).
//! - [`AgentResult`] — Outcome of a single agent invocation.
//! - [`RetryPolicy`] — Exponential backoff configuration with optional jitter.

/// Error types and the execution-time error taxonomy.
pub mod error;
/// Agent execution results and payloads.
pub mod result;
/// Retry policy and backoff computation.
pub mod retry;

pub use error::{ErrorKind, MaestroError, MaestroResult, TaskError, ValidationError};
pub use result::{AgentResult, AgentStatus, Payload};
pub use retry::RetryPolicy;
