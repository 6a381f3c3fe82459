//! Python bindings for the Maestro orchestration engine.
//!
//! The scripting layer drives the engine through the serialized descriptor
//! boundary: a workflow spec goes in as JSON, ownership of each task's input
//! transfers to the engine for the duration of execution, and exactly one
//! terminal report per task comes back in the serialized result. Engine
//! errors are marshaled into Python exceptions carrying the same
//! `{kind, message}` envelope the in-process API uses.

use maestro_agent::{register_builtin_agents, AgentRegistry, BackendConfig};
use maestro_engine::boundary;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

fn registry_from(backend_config_json: Option<&str>) -> PyResult<Arc<AgentRegistry>> {
    let config: BackendConfig = match backend_config_json {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| PyValueError::new_err(format!("invalid backend config: {e}")))?,
        None => BackendConfig::default(),
    };
    let registry = AgentRegistry::new();
    register_builtin_agents(&registry, &config)
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(Arc::new(registry))
}

/// Execute a serialized workflow spec and return the serialized result.
///
/// Blocks the calling thread for the duration of the run; the GIL is
/// released so other Python threads keep running.
#[pyfunction]
#[pyo3(signature = (spec_json, backend_config_json=None))]
fn run_workflow(
    py: Python<'_>,
    spec_json: String,
    backend_config_json: Option<String>,
) -> PyResult<String> {
    let registry = registry_from(backend_config_json.as_deref())?;
    py.allow_threads(move || {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        runtime
            .block_on(boundary::run_descriptors(registry, &spec_json))
            .map_err(|e| PyRuntimeError::new_err(boundary::error_envelope_json(&e)))
    })
}

/// Validate a serialized workflow spec against the built-in agent kinds
/// without executing it.
///
/// Raises `ValueError` with a `{kind, message}` envelope on any validation
/// failure (cycle, unknown dependency, unknown agent kind, malformed JSON).
#[pyfunction]
fn validate_workflow(spec_json: String) -> PyResult<()> {
    let registry = registry_from(None)?;
    boundary::validate_descriptors(&registry, &spec_json)
        .map_err(|e| PyValueError::new_err(boundary::error_envelope_json(&e)))
}

/// The agent kinds available without additional registration.
#[pyfunction]
fn builtin_agent_kinds() -> PyResult<Vec<String>> {
    Ok(registry_from(None)?.kinds())
}

/// Python module definition.
#[pymodule]
fn maestro(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_workflow, m)?)?;
    m.add_function(wrap_pyfunction!(validate_workflow, m)?)?;
    m.add_function(wrap_pyfunction!(builtin_agent_kinds, m)?)?;
    Ok(())
}
