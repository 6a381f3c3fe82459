use crate::types::{Task, TaskReport, TaskStatus, WorkflowResult, WorkflowStatus};
use chrono::{DateTime, Utc};
use maestro_core::{MaestroError, MaestroResult, TaskError};
use std::collections::HashMap;
use uuid::Uuid;

/// Collects terminal task statuses into a [`WorkflowResult`].
///
/// A pure read: callable only once the scheduler reports termination, it
/// performs no mutation and is idempotent — collecting the same finished
/// state twice yields identical results.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Builds the final result from a terminated task table.
    ///
    /// Fails with an internal error if any task is still non-terminal, which
    /// would indicate a scheduler bug rather than a user-facing condition.
    pub fn collect(
        workflow_id: Uuid,
        name: Option<&str>,
        tasks: &HashMap<String, Task>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> MaestroResult<WorkflowResult> {
        let mut reports: HashMap<String, TaskReport> = HashMap::with_capacity(tasks.len());

        for (id, task) in tasks {
            if !task.status.is_terminal() {
                return Err(MaestroError::Internal(format!(
                    "aggregation requested while task '{id}' is still {}",
                    task.status
                )));
            }
            reports.insert(id.clone(), report_for(task));
        }

        let status = workflow_status(&reports);
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;

        Ok(WorkflowResult {
            workflow_id,
            name: name.map(str::to_string),
            status,
            tasks: reports,
            started_at,
            completed_at,
            duration_ms,
        })
    }
}

fn report_for(task: &Task) -> TaskReport {
    let (output, error, attempts, duration_ms) = match &task.result {
        Some(result) => (
            result.output.clone(),
            result.error.clone(),
            result.attempts,
            result.duration_ms,
        ),
        None => (None, None, 0, 0),
    };

    // Every non-completed task carries an error so callers can always
    // distinguish failure from skip from cancellation.
    let error = match (task.status, error) {
        (TaskStatus::Completed, _) => None,
        (_, Some(error)) => Some(error),
        (TaskStatus::Skipped, None) => Some(TaskError::dependency_failed("unknown")),
        (_, None) => Some(TaskError::permanent("no result recorded")),
    };

    TaskReport {
        status: task.status,
        output,
        error,
        attempts,
        duration_ms,
    }
}

fn workflow_status(reports: &HashMap<String, TaskReport>) -> WorkflowStatus {
    let completed = reports
        .values()
        .filter(|r| r.status == TaskStatus::Completed)
        .count();
    if completed == reports.len() {
        return WorkflowStatus::Completed;
    }
    if reports
        .values()
        .any(|r| r.status == TaskStatus::Cancelled)
    {
        return WorkflowStatus::Cancelled;
    }
    if completed == 0 {
        WorkflowStatus::Failed
    } else {
        WorkflowStatus::PartialSuccess
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::TaskSpec;
    use maestro_core::AgentResult;

    fn terminal_task(id: &str, status: TaskStatus, result: Option<AgentResult>) -> (String, Task) {
        let mut task = Task::new(TaskSpec::new(id, "noop"));
        task.status = status;
        task.result = result;
        (id.to_string(), task)
    }

    fn sample_tasks() -> HashMap<String, Task> {
        let mut tasks = HashMap::new();
        let (id, task) = terminal_task(
            "a",
            TaskStatus::Completed,
            Some(AgentResult::completed(serde_json::json!("out")).with_attempts(1)),
        );
        tasks.insert(id, task);
        let (id, task) = terminal_task(
            "b",
            TaskStatus::Failed,
            Some(AgentResult::failed(TaskError::permanent("boom")).with_attempts(2)),
        );
        tasks.insert(id, task);
        let (id, task) = terminal_task(
            "c",
            TaskStatus::Skipped,
            Some(AgentResult::failed(TaskError::dependency_failed("b"))),
        );
        tasks.insert(id, task);
        tasks
    }

    #[test]
    fn collect_reports_every_task() {
        let tasks = sample_tasks();
        let now = Utc::now();
        let result =
            ResultAggregator::collect(Uuid::new_v4(), Some("wf"), &tasks, now, now).unwrap();

        assert_eq!(result.tasks.len(), 3);
        assert_eq!(result.status, WorkflowStatus::PartialSuccess);
        assert_eq!(result.tasks["a"].status, TaskStatus::Completed);
        assert_eq!(result.tasks["b"].error.as_ref().unwrap().message, "boom");
        assert_eq!(
            result.tasks["c"].error.as_ref().unwrap().cause.as_deref(),
            Some("b")
        );
    }

    #[test]
    fn collect_is_idempotent() {
        let tasks = sample_tasks();
        let id = Uuid::new_v4();
        let started = Utc::now();
        let completed = started + chrono::Duration::milliseconds(250);

        let first = ResultAggregator::collect(id, None, &tasks, started, completed).unwrap();
        let second = ResultAggregator::collect(id, None, &tasks, started, completed).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.duration_ms, 250);
    }

    #[test]
    fn collect_rejects_non_terminal_state() {
        let mut tasks = sample_tasks();
        tasks.get_mut("a").unwrap().status = TaskStatus::Running;
        let now = Utc::now();
        let err = ResultAggregator::collect(Uuid::new_v4(), None, &tasks, now, now).unwrap_err();
        assert!(matches!(err, MaestroError::Internal(_)));
    }

    #[test]
    fn status_derivation() {
        let mut tasks = HashMap::new();
        let (id, task) = terminal_task(
            "a",
            TaskStatus::Completed,
            Some(AgentResult::completed(serde_json::json!(null))),
        );
        tasks.insert(id, task);
        let now = Utc::now();
        let result = ResultAggregator::collect(Uuid::new_v4(), None, &tasks, now, now).unwrap();
        assert_eq!(result.status, WorkflowStatus::Completed);

        let (id, task) = terminal_task(
            "b",
            TaskStatus::Cancelled,
            Some(AgentResult::failed(TaskError::cancelled("stop"))),
        );
        tasks.insert(id, task);
        let result = ResultAggregator::collect(Uuid::new_v4(), None, &tasks, now, now).unwrap();
        assert_eq!(result.status, WorkflowStatus::Cancelled);
    }

    #[test]
    fn all_failed_is_failed() {
        let mut tasks = HashMap::new();
        let (id, task) = terminal_task(
            "a",
            TaskStatus::Failed,
            Some(AgentResult::failed(TaskError::permanent("x"))),
        );
        tasks.insert(id, task);
        let now = Utc::now();
        let result = ResultAggregator::collect(Uuid::new_v4(), None, &tasks, now, now).unwrap();
        assert_eq!(result.status, WorkflowStatus::Failed);
    }
}
