use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Counters tracked per agent kind across a scheduler's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMetrics {
    /// Tasks handed to an agent of this kind.
    pub dispatched: u64,
    /// Tasks that completed.
    pub completed: u64,
    /// Tasks that exhausted retries or failed permanently.
    pub failed: u64,
    /// Tasks cancelled while assigned to this kind.
    pub cancelled: u64,
    /// Tasks skipped before dispatch because a dependency did not complete.
    pub skipped: u64,
    /// Individual retry attempts scheduled.
    pub retries: u64,
    /// Cumulative wall-clock duration of final attempts, in milliseconds.
    pub total_duration_ms: u64,
}

/// Tracks per-agent-kind execution metrics for observability.
///
/// Purely passive: the scheduler records transitions here, and nothing in
/// here ever influences a scheduling decision.
#[derive(Default)]
pub struct ExecutionMonitor {
    metrics: RwLock<HashMap<String, KindMetrics>>,
}

impl ExecutionMonitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a task being handed to an agent of `kind`.
    pub async fn record_dispatch(&self, kind: &str) {
        let mut metrics = self.metrics.write().await;
        metrics.entry(kind.to_string()).or_default().dispatched += 1;
    }

    /// Records a retry attempt being scheduled for `kind`.
    pub async fn record_retry(&self, kind: &str) {
        let mut metrics = self.metrics.write().await;
        metrics.entry(kind.to_string()).or_default().retries += 1;
    }

    /// Records a completed task with the duration of its final attempt.
    pub async fn record_completion(&self, kind: &str, duration_ms: u64) {
        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(kind.to_string()).or_default();
        entry.completed += 1;
        entry.total_duration_ms += duration_ms;
    }

    /// Records a failed task with the duration of its final attempt.
    pub async fn record_failure(&self, kind: &str, duration_ms: u64) {
        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(kind.to_string()).or_default();
        entry.failed += 1;
        entry.total_duration_ms += duration_ms;
    }

    /// Records a cancelled task.
    pub async fn record_cancelled(&self, kind: &str) {
        let mut metrics = self.metrics.write().await;
        metrics.entry(kind.to_string()).or_default().cancelled += 1;
    }

    /// Records a task skipped before dispatch.
    pub async fn record_skipped(&self, kind: &str) {
        let mut metrics = self.metrics.write().await;
        metrics.entry(kind.to_string()).or_default().skipped += 1;
    }

    /// Snapshot of per-kind metrics.
    pub async fn snapshot(&self) -> HashMap<String, KindMetrics> {
        self.metrics.read().await.clone()
    }

    /// Aggregate metrics across all kinds.
    pub async fn aggregate(&self) -> KindMetrics {
        let metrics = self.metrics.read().await;
        let mut total = KindMetrics::default();
        for m in metrics.values() {
            total.dispatched += m.dispatched;
            total.completed += m.completed;
            total.failed += m.failed;
            total.cancelled += m.cancelled;
            total.skipped += m.skipped;
            total.retries += m.retries;
            total.total_duration_ms += m.total_duration_ms;
        }
        total
    }

    /// Serializes the current state as JSON (for dashboards and CLI output).
    pub async fn to_json(&self) -> serde_json::Value {
        let snapshot = self.snapshot().await;
        let aggregate = self.aggregate().await;
        serde_json::json!({
            "kinds": snapshot,
            "aggregate": aggregate,
        })
    }
}
