//! Serialized descriptor boundary for callers in other runtimes.
//!
//! A scripting layer (see the `maestro-python` crate) drives the engine
//! through this narrow seam: it hands over an immutable, serialized workflow
//! descriptor set, ownership of each task's input payload transfers to the
//! engine for the duration of execution, and exactly one terminal report per
//! task comes back — never zero, never more than once. No shared mutable
//! memory crosses the boundary.
//!
//! Errors raised on this path marshal into the same `TaskError` shape used by
//! in-process agents, so callers see one uniform taxonomy regardless of which
//! execution path ran a given task.

use crate::scheduler::Scheduler;
use crate::types::{WorkflowResult, WorkflowSpec};
use crate::workflow::Workflow;
use maestro_agent::AgentRegistry;
use maestro_core::{MaestroResult, ValidationError};
use serde::Serialize;
use std::sync::Arc;

/// Error envelope returned for descriptor sets that fail validation.
#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    kind: &'a str,
    message: String,
}

/// Parses and validates a serialized workflow descriptor set without
/// executing it.
pub fn validate_descriptors(registry: &AgentRegistry, spec_json: &str) -> MaestroResult<()> {
    let spec: WorkflowSpec = serde_json::from_str(spec_json)?;
    Workflow::build(spec, registry).map(|_| ())
}

/// Executes a serialized workflow descriptor set and returns the serialized
/// [`WorkflowResult`].
///
/// Construction-time failures surface as `Err`; use
/// [`error_envelope_json`] to marshal them for callers that only speak JSON.
pub async fn run_descriptors(
    registry: Arc<AgentRegistry>,
    spec_json: &str,
) -> MaestroResult<String> {
    let spec: WorkflowSpec = serde_json::from_str(spec_json)?;
    let workflow = Workflow::build(spec, &registry)?;
    let scheduler = Scheduler::new(registry);
    let result: WorkflowResult = scheduler.run(workflow).await?;
    Ok(serde_json::to_string(&result)?)
}

/// Marshals an engine error into the uniform `{kind, message}` JSON shape.
pub fn error_envelope_json(error: &maestro_core::MaestroError) -> String {
    let kind = match error {
        maestro_core::MaestroError::Validation(ValidationError::Cycle(_)) => "cycle",
        maestro_core::MaestroError::Validation(_) => "validation",
        maestro_core::MaestroError::UnknownAgentKind(_) => "unknown_agent_kind",
        maestro_core::MaestroError::Json(_) => "malformed_descriptor",
        maestro_core::MaestroError::Internal(_) => "internal",
        _ => "error",
    };
    let envelope = ErrorEnvelope {
        kind,
        message: error.to_string(),
    };
    serde_json::to_string(&envelope)
        .unwrap_or_else(|_| format!(r#"{{"kind":"internal","message":"{kind}"}}"#))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;
    use async_trait::async_trait;
    use maestro_agent::{Agent, ExecutionContext};
    use maestro_core::{AgentResult, MaestroError, Payload};

    struct UppercaseAgent;

    #[async_trait]
    impl Agent for UppercaseAgent {
        fn kind(&self) -> &str {
            "uppercase"
        }

        async fn execute(&self, input: &Payload, _ctx: &ExecutionContext) -> AgentResult {
            let text = input.as_str().unwrap_or_default();
            AgentResult::completed(serde_json::json!(text.to_uppercase()))
        }
    }

    fn registry() -> Arc<AgentRegistry> {
        let registry = AgentRegistry::new();
        registry.register("uppercase", Box::new(|| Arc::new(UppercaseAgent)));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn descriptor_round_trip() {
        let spec = r#"{
            "tasks": [
                {"id": "shout", "agent_kind": "uppercase", "input": "hello"},
                {"id": "echo", "agent_kind": "uppercase", "input": "again", "depends_on": ["shout"]}
            ],
            "concurrency_limit": 2
        }"#;

        let json = run_descriptors(registry(), spec).await.unwrap();
        let result: crate::types::WorkflowResult = serde_json::from_str(&json).unwrap();

        // Exactly one terminal report per descriptor.
        assert_eq!(result.tasks.len(), 2);
        assert_eq!(result.tasks["shout"].status, TaskStatus::Completed);
        assert_eq!(
            result.tasks["shout"].output,
            Some(serde_json::json!("HELLO"))
        );
        assert_eq!(result.tasks["echo"].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn malformed_descriptor_is_an_error() {
        let err = run_descriptors(registry(), "not json").await.unwrap_err();
        assert!(matches!(err, MaestroError::Json(_)));
        let envelope = error_envelope_json(&err);
        assert!(envelope.contains("malformed_descriptor"));
    }

    #[tokio::test]
    async fn cyclic_descriptor_fails_validation() {
        let spec = r#"{
            "tasks": [
                {"id": "a", "agent_kind": "uppercase", "depends_on": ["b"]},
                {"id": "b", "agent_kind": "uppercase", "depends_on": ["a"]}
            ]
        }"#;

        let err = validate_descriptors(&registry(), spec).unwrap_err();
        let envelope = error_envelope_json(&err);
        assert!(envelope.contains("cycle"));
    }
}
