#![allow(clippy::unwrap_used, clippy::expect_used)]

use maestro_core::*;
use std::time::Duration;

// ---------------------------------------------------------------------------
// 1. AgentResult serialization roundtrip
// ---------------------------------------------------------------------------

#[test]
fn agent_result_serialization_roundtrip() {
    let result = AgentResult::completed(serde_json::json!({
        "response": "three findings",
        "model": "qwen2.5-coder:14b",
    }))
    .with_attempts(2)
    .with_duration(Duration::from_millis(3150));

    let json = serde_json::to_string(&result).unwrap();
    let deserialized: AgentResult = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.status, AgentStatus::Completed);
    assert_eq!(deserialized.attempts, 2);
    assert_eq!(deserialized.duration_ms, 3150);
    assert_eq!(
        deserialized.output.unwrap()["response"],
        serde_json::json!("three findings")
    );
}

// ---------------------------------------------------------------------------
// 2. Error taxonomy: kind, display, and wire format
// ---------------------------------------------------------------------------

#[test]
fn error_taxonomy_wire_format() {
    let err = TaskError::timeout("agent did not respond within 30s");
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["kind"], "timeout");

    let err = TaskError::dependency_failed("build-index");
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["kind"], "dependency_failed");
    assert_eq!(json["cause"], "build-index");

    assert_eq!(
        TaskError::permanent("schema rejected").to_string(),
        "permanent: schema rejected"
    );
}

// ---------------------------------------------------------------------------
// 3. MaestroError Display and From impls
// ---------------------------------------------------------------------------

#[test]
fn error_display_and_from_impls() {
    let err = MaestroError::UnknownAgentKind("telepathy".to_string());
    assert_eq!(err.to_string(), "unknown agent kind 'telepathy'");

    let err: MaestroError = ValidationError::DuplicateTaskId("a".to_string()).into();
    assert_eq!(err.to_string(), "validation error: duplicate task id 'a'");

    let bad_json = serde_json::from_str::<serde_json::Value>("not json");
    let err: MaestroError = bad_json.unwrap_err().into();
    assert!(err.to_string().starts_with("JSON error:"));

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "spec missing");
    let err: MaestroError = io_err.into();
    assert!(err.to_string().starts_with("IO error:"));
}

// ---------------------------------------------------------------------------
// 4. Retry policy roundtrip through the descriptor format
// ---------------------------------------------------------------------------

#[test]
fn retry_policy_descriptor_roundtrip() {
    let policy = RetryPolicy {
        max_attempts: 4,
        backoff_base_ms: 250,
        backoff_max_ms: 10_000,
        jitter: false,
    };
    let json = serde_json::to_string(&policy).unwrap();
    let parsed: RetryPolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, policy);
    assert_eq!(parsed.delay_for_attempt(3).as_millis(), 1000);
}
