use crate::types::{Task, TaskSpec, WorkflowSpec};
use maestro_core::{MaestroResult, ValidationError};
use maestro_agent::AgentRegistry;
use std::collections::HashMap;
use uuid::Uuid;

/// An immutable, validated directed acyclic graph of tasks.
///
/// Built atomically from a [`WorkflowSpec`]: any validation failure aborts
/// construction and no partially-built workflow is ever returned. After
/// construction only the per-task status/result fields change, and only under
/// the scheduler driving the execution.
pub struct Workflow {
    pub(crate) id: Uuid,
    pub(crate) name: Option<String>,
    pub(crate) spec: WorkflowSpec,
    pub(crate) tasks: HashMap<String, Task>,
    /// Task ids in spec order, used to seed the ready queue deterministically.
    pub(crate) order: Vec<String>,
    /// Reverse dependency edges: id → ids of tasks that depend on it.
    pub(crate) dependents: HashMap<String, Vec<String>>,
    /// Number of unmet dependencies per task.
    pub(crate) indegree: HashMap<String, usize>,
}

impl Workflow {
    /// Validates `spec` against `registry` and builds the workflow.
    ///
    /// Checks, in order: the spec is non-empty, the concurrency limit is at
    /// least 1, task ids are unique, every referenced dependency exists,
    /// every agent kind is registered, and the dependency graph is acyclic.
    pub fn build(spec: WorkflowSpec, registry: &AgentRegistry) -> MaestroResult<Self> {
        if spec.tasks.is_empty() {
            return Err(ValidationError::EmptyWorkflow.into());
        }
        if spec.concurrency_limit == 0 {
            return Err(ValidationError::ZeroConcurrency.into());
        }

        let mut by_id: HashMap<&str, &TaskSpec> = HashMap::with_capacity(spec.tasks.len());
        for task in &spec.tasks {
            if by_id.insert(task.id.as_str(), task).is_some() {
                return Err(ValidationError::DuplicateTaskId(task.id.clone()).into());
            }
        }

        for task in &spec.tasks {
            for dep in &task.depends_on {
                if !by_id.contains_key(dep.as_str()) {
                    return Err(ValidationError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    }
                    .into());
                }
            }
            if !registry.contains(&task.agent_kind) {
                return Err(ValidationError::UnknownAgentKind {
                    task: task.id.clone(),
                    kind: task.agent_kind.clone(),
                }
                .into());
            }
        }

        detect_cycles(&by_id)?;

        let order: Vec<String> = spec.tasks.iter().map(|t| t.id.clone()).collect();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut indegree: HashMap<String, usize> = HashMap::new();
        for task in &spec.tasks {
            indegree.insert(task.id.clone(), task.depends_on.len());
            for dep in &task.depends_on {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(task.id.clone());
            }
        }

        let tasks: HashMap<String, Task> = spec
            .tasks
            .iter()
            .map(|t| (t.id.clone(), Task::new(t.clone())))
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            name: spec.name.clone(),
            spec,
            tasks,
            order,
            dependents,
            indegree,
        })
    }

    /// Unique id assigned to this workflow instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name from the spec, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Ids of tasks with no dependencies, in spec order.
    pub fn root_tasks(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.indegree.get(*id).copied() == Some(0))
            .map(String::as_str)
            .collect()
    }
}

/// Three-colour depth-first walk over the dependency edges.
///
/// 0 = unvisited, 1 = on the current path, 2 = fully processed; revisiting a
/// node marked 1 means a back edge, i.e. a cycle.
fn detect_cycles(by_id: &HashMap<&str, &TaskSpec>) -> Result<(), ValidationError> {
    let mut colour: HashMap<&str, u8> = HashMap::with_capacity(by_id.len());
    for &id in by_id.keys() {
        visit(id, by_id, &mut colour)?;
    }
    Ok(())
}

fn visit<'a>(
    id: &'a str,
    by_id: &HashMap<&'a str, &'a TaskSpec>,
    colour: &mut HashMap<&'a str, u8>,
) -> Result<(), ValidationError> {
    match colour.get(id) {
        Some(1) => return Err(ValidationError::Cycle(id.to_string())),
        Some(2) => return Ok(()),
        _ => {}
    }
    colour.insert(id, 1);
    if let Some(task) = by_id.get(id) {
        for dep in &task.depends_on {
            visit(dep, by_id, colour)?;
        }
    }
    colour.insert(id, 2);
    Ok(())
}
