use crate::aggregator::ResultAggregator;
use crate::monitor::ExecutionMonitor;
use crate::types::{FailurePolicy, Task, TaskPriority, TaskStatus, WorkflowResult};
use crate::workflow::Workflow;
use chrono::Utc;
use maestro_agent::{Agent, AgentRegistry, ExecutionContext};
use maestro_core::{
    AgentResult, ErrorKind, MaestroError, MaestroResult, Payload, RetryPolicy, TaskError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Control messages accepted by a running scheduler.
enum Control {
    CancelWorkflow,
    CancelTask(String),
}

/// Events reported by task workers back to the scheduler loop.
enum WorkerEvent {
    /// An attempt failed with a retriable error; the next attempt is
    /// scheduled after backoff.
    Retrying {
        id: String,
        attempt: u32,
        error: TaskError,
    },
    /// The worker finished with a terminal result.
    Finished { id: String, result: AgentResult },
}

/// Clonable handle for cancelling a running workflow or individual tasks.
///
/// Cancellation is cooperative: in-flight agent calls get a bounded grace
/// period to observe the signal before the scheduler drops them.
#[derive(Clone)]
pub struct SchedulerController {
    tx: mpsc::UnboundedSender<Control>,
}

impl SchedulerController {
    /// Cancels every non-terminal task in the current run.
    pub fn cancel(&self) {
        let _ = self.tx.send(Control::CancelWorkflow);
    }

    /// Cancels a single task; its dependents cascade to skipped.
    pub fn cancel_task(&self, id: impl Into<String>) {
        let _ = self.tx.send(Control::CancelTask(id.into()));
    }
}

/// The execution engine: walks a workflow graph, dispatches ready tasks to
/// agents under the concurrency limit, and applies retry, timeout, and
/// cancellation policy.
///
/// All state is per-instance — multiple schedulers are independently
/// constructible with no shared globals. One scheduler drives one workflow at
/// a time; concurrent `run` calls on the same instance serialize.
pub struct Scheduler {
    registry: Arc<AgentRegistry>,
    monitor: Arc<ExecutionMonitor>,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: Mutex<mpsc::UnboundedReceiver<Control>>,
}

impl Scheduler {
    /// Creates a scheduler dispatching against the given registry.
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            monitor: Arc::new(ExecutionMonitor::new()),
            control_tx,
            control_rx: Mutex::new(control_rx),
        }
    }

    /// The monitor recording this scheduler's per-kind metrics.
    pub fn monitor(&self) -> Arc<ExecutionMonitor> {
        Arc::clone(&self.monitor)
    }

    /// A handle for cancelling the current run.
    pub fn controller(&self) -> SchedulerController {
        SchedulerController {
            tx: self.control_tx.clone(),
        }
    }

    /// Executes `workflow` to completion and aggregates the result.
    ///
    /// Returns once every task is terminal. Construction-time validation has
    /// already happened in [`Workflow::build`]; the only error paths here are
    /// internal invariant violations.
    pub async fn run(&self, workflow: Workflow) -> MaestroResult<WorkflowResult> {
        let started_at = Utc::now();
        let Workflow {
            id,
            name,
            spec,
            tasks,
            order,
            dependents,
            indegree,
        } = workflow;

        let limit = spec.concurrency_limit;
        let grace = Duration::from_millis(spec.cancel_grace_ms);
        let wf_deadline = spec
            .workflow_timeout_ms
            .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));

        let mut control_rx = self.control_rx.lock().await;
        // Discard control messages left over from a previous run.
        while control_rx.try_recv().is_ok() {}

        let run_token = CancellationToken::new();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkerEvent>();

        let mut state = RunState::new(tasks, indegree, dependents, Arc::clone(&self.monitor));
        state.seed_ready(&order);

        let mut task_tokens: HashMap<String, CancellationToken> = HashMap::new();
        let mut running = 0usize;
        let mut timed_out = false;

        info!(workflow_id = %id, tasks = state.tasks.len(), limit, "workflow execution started");

        while !state.all_terminal() {
            // Fill free slots from the ready queue. The bound counts in-flight
            // agent calls; workers suspend cooperatively while awaiting them.
            while running < limit {
                let Some(task_id) = state.ready.pop() else { break };
                if state.status_of(&task_id) != Some(TaskStatus::Ready) {
                    continue; // cancelled while queued
                }
                state.check_deps_completed(&task_id).map_err(|e| {
                    run_token.cancel();
                    e
                })?;

                let (agent, input, attempt_timeout, policy, kind) = {
                    let task = &state.tasks[&task_id];
                    let agent = match self.registry.create(&task.spec.agent_kind) {
                        Ok(agent) => agent,
                        Err(e) => {
                            run_token.cancel();
                            return Err(e);
                        }
                    };
                    let attempt_timeout = task.spec.timeout(agent.default_timeout());
                    let policy = task.spec.retry_policy(agent.default_retry_policy());
                    (
                        agent,
                        task.spec.input.clone(),
                        attempt_timeout,
                        policy,
                        task.spec.agent_kind.clone(),
                    )
                };

                state.transition(&task_id, TaskStatus::Running);
                self.monitor.record_dispatch(&kind).await;

                let token = run_token.child_token();
                task_tokens.insert(task_id.clone(), token.clone());
                running += 1;

                let events = event_tx.clone();
                let worker_id = task_id.clone();
                tokio::spawn(run_attempts(
                    agent,
                    worker_id,
                    input,
                    attempt_timeout,
                    policy,
                    grace,
                    token,
                    events,
                ));
            }

            if state.all_terminal() {
                break;
            }
            if running == 0 && state.ready.is_empty() {
                run_token.cancel();
                return Err(MaestroError::Internal(
                    "scheduler stalled with non-terminal tasks and an empty ready queue"
                        .to_string(),
                ));
            }

            tokio::select! {
                Some(event) = event_rx.recv() => match event {
                    WorkerEvent::Retrying { id: task_id, attempt, error } => {
                        warn!(task_id = %task_id, attempt, error = %error, "attempt failed, retrying");
                        if let Some(kind) = state.kind_of(&task_id) {
                            self.monitor.record_retry(&kind).await;
                        }
                        state.transition(&task_id, TaskStatus::Retrying);
                    }
                    WorkerEvent::Finished { id: task_id, result } => {
                        running -= 1;
                        task_tokens.remove(&task_id);
                        let status = state.finish(&task_id, result).await;
                        match status {
                            TaskStatus::Completed => state.promote_dependents(&task_id),
                            TaskStatus::Failed => {
                                state.cascade_skip(&task_id).await;
                                if spec.failure_policy == FailurePolicy::FailFast {
                                    state.cancel_waiting("failure cancelled remaining tasks").await;
                                    run_token.cancel();
                                }
                            }
                            TaskStatus::Cancelled => state.cascade_skip(&task_id).await,
                            _ => {}
                        }
                    }
                },
                Some(ctrl) = control_rx.recv() => match ctrl {
                    Control::CancelWorkflow => {
                        info!(workflow_id = %id, "workflow cancelled by caller");
                        state.cancel_waiting("workflow cancelled").await;
                        run_token.cancel();
                    }
                    Control::CancelTask(task_id) => match state.status_of(&task_id) {
                        Some(TaskStatus::Pending | TaskStatus::Ready) => {
                            state.cancel_one(&task_id, "task cancelled").await;
                            state.cascade_skip(&task_id).await;
                        }
                        Some(TaskStatus::Running | TaskStatus::Retrying) => {
                            if let Some(token) = task_tokens.get(&task_id) {
                                token.cancel();
                            }
                        }
                        _ => {}
                    },
                },
                _ = sleep_until_deadline(wf_deadline), if wf_deadline.is_some() && !timed_out => {
                    timed_out = true;
                    warn!(workflow_id = %id, "workflow timeout elapsed, cancelling remaining tasks");
                    state.cancel_waiting("workflow timeout elapsed").await;
                    run_token.cancel();
                }
            }
        }

        let completed_at = Utc::now();
        info!(workflow_id = %id, "workflow execution finished");
        ResultAggregator::collect(id, name.as_deref(), &state.tasks, started_at, completed_at)
    }
}

async fn sleep_until_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// FIFO ready queue with priority bands; higher bands dispatch first.
///
/// FIFO within a band gives the fairness guarantee: no ready task starves
/// while slots are available.
#[derive(Default)]
struct ReadyQueue {
    bands: [VecDeque<String>; 4],
}

impl ReadyQueue {
    fn band(priority: TaskPriority) -> usize {
        match priority {
            TaskPriority::Critical => 0,
            TaskPriority::High => 1,
            TaskPriority::Normal => 2,
            TaskPriority::Low => 3,
        }
    }

    fn push(&mut self, priority: TaskPriority, id: String) {
        self.bands[Self::band(priority)].push_back(id);
    }

    fn pop(&mut self) -> Option<String> {
        self.bands.iter_mut().find_map(VecDeque::pop_front)
    }

    fn is_empty(&self) -> bool {
        self.bands.iter().all(VecDeque::is_empty)
    }
}

/// Mutable execution state for one run.
///
/// The scheduler loop is the single writer for every task transition; workers
/// only report events over the channel.
struct RunState {
    tasks: HashMap<String, Task>,
    indegree: HashMap<String, usize>,
    dependents: HashMap<String, Vec<String>>,
    ready: ReadyQueue,
    monitor: Arc<ExecutionMonitor>,
}

impl RunState {
    fn new(
        tasks: HashMap<String, Task>,
        indegree: HashMap<String, usize>,
        dependents: HashMap<String, Vec<String>>,
        monitor: Arc<ExecutionMonitor>,
    ) -> Self {
        Self {
            tasks,
            indegree,
            dependents,
            ready: ReadyQueue::default(),
            monitor,
        }
    }

    /// Moves every task with no dependencies to the ready queue, in spec
    /// order.
    fn seed_ready(&mut self, order: &[String]) {
        for id in order {
            if self.indegree.get(id).copied() == Some(0) {
                self.transition(id, TaskStatus::Ready);
                let priority = self.tasks[id].spec.priority;
                self.ready.push(priority, id.clone());
            }
        }
    }

    fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.tasks.get(id).map(|t| t.status)
    }

    fn kind_of(&self, id: &str) -> Option<String> {
        self.tasks.get(id).map(|t| t.spec.agent_kind.clone())
    }

    fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    /// Verifies the dispatch invariant: a task may only start once every
    /// dependency completed. A violation is a scheduler bug.
    fn check_deps_completed(&self, id: &str) -> MaestroResult<()> {
        let task = &self.tasks[id];
        for dep in &task.spec.depends_on {
            if self.status_of(dep) != Some(TaskStatus::Completed) {
                return Err(MaestroError::Internal(format!(
                    "task '{id}' became ready while dependency '{dep}' is not completed"
                )));
            }
        }
        Ok(())
    }

    fn transition(&mut self, id: &str, to: TaskStatus) {
        if let Some(task) = self.tasks.get_mut(id) {
            debug!(task_id = %id, from = %task.status, to = %to, "task transition");
            task.status = to;
        }
    }

    /// Applies a worker's terminal result and returns the resulting status.
    async fn finish(&mut self, id: &str, result: AgentResult) -> TaskStatus {
        let status = if result.is_success() {
            TaskStatus::Completed
        } else if result.error.as_ref().map(|e| e.kind) == Some(ErrorKind::Cancelled) {
            TaskStatus::Cancelled
        } else {
            TaskStatus::Failed
        };

        let kind = self.kind_of(id).unwrap_or_default();
        match status {
            TaskStatus::Completed => {
                self.monitor
                    .record_completion(&kind, result.duration_ms)
                    .await;
            }
            TaskStatus::Cancelled => self.monitor.record_cancelled(&kind).await,
            _ => self.monitor.record_failure(&kind, result.duration_ms).await,
        }

        info!(
            task_id = %id,
            status = %status,
            attempts = result.attempts,
            duration_ms = result.duration_ms,
            "task finished"
        );

        if let Some(task) = self.tasks.get_mut(id) {
            task.status = status;
            task.result = Some(result);
        }
        status
    }

    /// Unblocks dependents of a completed task, queueing any that became
    /// ready.
    fn promote_dependents(&mut self, completed: &str) {
        let dependents = self
            .dependents
            .get(completed)
            .cloned()
            .unwrap_or_default();
        for dep_id in dependents {
            let remaining = self.indegree.entry(dep_id.clone()).or_insert(0);
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 && self.status_of(&dep_id) == Some(TaskStatus::Pending) {
                self.transition(&dep_id, TaskStatus::Ready);
                let priority = self.tasks[&dep_id].spec.priority;
                self.ready.push(priority, dep_id);
            }
        }
    }

    /// Recursively skips every not-yet-started dependent of a failed or
    /// cancelled task, recording which dependency caused the cascade.
    async fn cascade_skip(&mut self, from: &str) {
        let mut queue = VecDeque::from([from.to_string()]);
        while let Some(cause) = queue.pop_front() {
            let dependents = self.dependents.get(&cause).cloned().unwrap_or_default();
            for dep_id in dependents {
                if self.status_of(&dep_id) != Some(TaskStatus::Pending) {
                    continue;
                }
                let error = TaskError::dependency_failed(cause.clone());
                let kind = self.kind_of(&dep_id).unwrap_or_default();
                info!(task_id = %dep_id, dependency = %cause, "task skipped");
                if let Some(task) = self.tasks.get_mut(&dep_id) {
                    task.status = TaskStatus::Skipped;
                    task.result = Some(AgentResult::failed(error));
                }
                self.monitor.record_skipped(&kind).await;
                queue.push_back(dep_id);
            }
        }
    }

    /// Cancels a single waiting (pending or ready) task.
    async fn cancel_one(&mut self, id: &str, reason: &str) {
        let kind = self.kind_of(id).unwrap_or_default();
        if let Some(task) = self.tasks.get_mut(id) {
            debug!(task_id = %id, from = %task.status, to = %TaskStatus::Cancelled, "task transition");
            task.status = TaskStatus::Cancelled;
            task.result = Some(AgentResult::failed(TaskError::cancelled(reason)));
        }
        self.monitor.record_cancelled(&kind).await;
    }

    /// Cancels every pending or ready task immediately. Running tasks are
    /// cancelled through their tokens and report back within the grace
    /// period.
    async fn cancel_waiting(&mut self, reason: &str) {
        let waiting: Vec<String> = self
            .tasks
            .values()
            .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Ready))
            .map(|t| t.spec.id.clone())
            .collect();
        for id in waiting {
            self.cancel_one(&id, reason).await;
        }
    }
}

/// Drives the attempt loop for one task: bounded execution, retriability
/// classification, and backoff between attempts.
#[allow(clippy::too_many_arguments)]
async fn run_attempts(
    agent: Arc<dyn Agent>,
    id: String,
    input: Payload,
    attempt_timeout: Duration,
    policy: RetryPolicy,
    grace: Duration,
    token: CancellationToken,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut attempt = 0u32;
    let result = loop {
        attempt += 1;
        let started = Instant::now();
        let result = bounded_execute(agent.as_ref(), &input, attempt_timeout, grace, &token)
            .await
            .with_duration(started.elapsed());

        if result.is_success() {
            break result;
        }
        let kind = result.error.as_ref().map(|e| e.kind);
        match kind {
            Some(ErrorKind::Cancelled) => break result,
            Some(k) if k.is_retriable() && attempt < policy.max_attempts => {
                let error = result
                    .error
                    .clone()
                    .unwrap_or_else(|| TaskError::transient("unspecified failure"));
                let _ = events.send(WorkerEvent::Retrying {
                    id: id.clone(),
                    attempt,
                    error,
                });
                let delay = policy.delay_for_attempt(attempt);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        break AgentResult::failed(TaskError::cancelled(
                            "cancelled during retry backoff",
                        ))
                        .with_duration(started.elapsed());
                    }
                }
            }
            _ => break result,
        }
    };

    let result = result.with_attempts(attempt);
    let _ = events.send(WorkerEvent::Finished { id, result });
}

/// Runs one agent attempt bounded by the attempt deadline and the run's
/// cancellation token.
///
/// On cancellation the agent gets a grace window (hard-bounded by the
/// remaining deadline) to return; afterwards the in-flight call future is
/// dropped, which aborts it.
async fn bounded_execute(
    agent: &dyn Agent,
    input: &Payload,
    attempt_timeout: Duration,
    grace: Duration,
    token: &CancellationToken,
) -> AgentResult {
    let deadline = Instant::now() + attempt_timeout;
    let ctx = ExecutionContext::new(deadline, token.child_token());
    let call = agent.execute(input, &ctx);
    tokio::pin!(call);

    // Phase 1: race the call against its deadline and the cancellation
    // signal. `None` means cancellation fired while the call was in flight.
    let raced = tokio::select! {
        outcome = tokio::time::timeout_at(deadline.into(), &mut call) => Some(outcome),
        _ = token.cancelled() => None,
    };

    match raced {
        Some(Ok(result)) => result,
        Some(Err(_)) => AgentResult::failed(TaskError::timeout("attempt deadline exceeded")),
        None => {
            // Phase 2: grace window for the agent to observe its token,
            // hard-bounded by the remaining attempt deadline. Once it lapses
            // the call future is dropped, which aborts it.
            let hard_bound = grace.min(deadline.saturating_duration_since(Instant::now()));
            match tokio::time::timeout(hard_bound, &mut call).await {
                Ok(result) => match result.error {
                    Some(ref e) if e.kind == ErrorKind::Cancelled => result,
                    _ => AgentResult::failed(TaskError::cancelled("task cancelled")),
                },
                Err(_) => AgentResult::failed(TaskError::cancelled(
                    "agent did not acknowledge cancellation within the grace period",
                )),
            }
        }
    }
}
