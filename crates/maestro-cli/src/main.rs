//! The `maestro` command: validate and run workflow spec files against the
//! built-in agents.

use anyhow::Context;
use clap::{Parser, Subcommand};
use maestro_agent::{register_builtin_agents, AgentRegistry, BackendConfig};
use maestro_engine::{Scheduler, Workflow, WorkflowSpec, WorkflowStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maestro", about = "Maestro — multi-agent workflow orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow spec file without executing it.
    Validate {
        /// Path to a .json or .toml workflow spec.
        #[arg(long)]
        spec: PathBuf,
    },
    /// Execute a workflow spec and print the result as JSON.
    Run {
        /// Path to a .json or .toml workflow spec.
        #[arg(long)]
        spec: PathBuf,
        /// Inference backend base URL (default: http://127.0.0.1:11434).
        #[arg(long)]
        backend_url: Option<String>,
        /// Default model id for agents that do not override it.
        #[arg(long)]
        model: Option<String>,
        /// Print per-agent-kind metrics after the run.
        #[arg(long)]
        metrics: bool,
    },
    /// List the built-in agent kinds.
    Kinds,
}

fn load_spec(path: &Path) -> anyhow::Result<WorkflowSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading workflow spec {}", path.display()))?;
    let spec = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        toml::from_str(&raw).with_context(|| format!("parsing {} as TOML", path.display()))?
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing {} as JSON", path.display()))?
    };
    Ok(spec)
}

fn backend_config(backend_url: Option<String>, model: Option<String>) -> BackendConfig {
    let mut config = BackendConfig::default();
    if let Some(url) = backend_url.or_else(|| std::env::var("MAESTRO_BACKEND_URL").ok()) {
        config.base_url = url;
    }
    if let Some(model) = model.or_else(|| std::env::var("MAESTRO_MODEL").ok()) {
        config.model = model;
    }
    config
}

fn builtin_registry(config: &BackendConfig) -> anyhow::Result<Arc<AgentRegistry>> {
    let registry = AgentRegistry::new();
    register_builtin_agents(&registry, config).context("registering built-in agents")?;
    Ok(Arc::new(registry))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { spec } => {
            let spec = load_spec(&spec)?;
            let registry = builtin_registry(&BackendConfig::default())?;
            let workflow = Workflow::build(spec, &registry)?;
            println!(
                "workflow valid: {} tasks, roots: {:?}",
                workflow.task_count(),
                workflow.root_tasks()
            );
        }
        Command::Run {
            spec,
            backend_url,
            model,
            metrics,
        } => {
            let spec = load_spec(&spec)?;
            let config = backend_config(backend_url, model);
            let registry = builtin_registry(&config)?;
            let workflow = Workflow::build(spec, &registry)?;

            info!(tasks = workflow.task_count(), "starting workflow");
            let scheduler = Scheduler::new(registry);
            let monitor = scheduler.monitor();
            let result = scheduler.run(workflow).await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            if metrics {
                eprintln!("{}", serde_json::to_string_pretty(&monitor.to_json().await)?);
            }
            if result.status != WorkflowStatus::Completed {
                std::process::exit(1);
            }
        }
        Command::Kinds => {
            let registry = builtin_registry(&BackendConfig::default())?;
            for kind in registry.kinds() {
                println!("{kind}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_json_spec() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"tasks": [{{"id": "a", "agent_kind": "reasoning", "input": "hi"}}]}}"#
        )
        .unwrap();
        let spec = load_spec(file.path()).unwrap();
        assert_eq!(spec.tasks.len(), 1);
        assert_eq!(spec.tasks[0].agent_kind, "reasoning");
    }

    #[test]
    fn loads_toml_spec() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "concurrency_limit = 2\n\n[[tasks]]\nid = \"a\"\nagent_kind = \"docs\"\ninput = \"write\"\n"
        )
        .unwrap();
        let spec = load_spec(file.path()).unwrap();
        assert_eq!(spec.concurrency_limit, 2);
        assert_eq!(spec.tasks[0].id, "a");
    }

    #[test]
    fn backend_config_flag_overrides() {
        let config = backend_config(
            Some("http://gpu-box:11434".to_string()),
            Some("llama3:70b".to_string()),
        );
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, "llama3:70b");
    }
}
