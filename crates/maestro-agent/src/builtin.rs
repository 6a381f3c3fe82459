use crate::backend::{BackendClient, BackendConfig};
use crate::profiles::{default_profiles, AgentProfile};
use crate::registry::AgentRegistry;
use crate::{Agent, ExecutionContext};
use async_trait::async_trait;
use maestro_core::{AgentResult, MaestroResult, Payload, TaskError};
use std::sync::Arc;
use tracing::debug;

/// A built-in agent that forwards its task to an inference backend.
///
/// The input payload must carry a `prompt` field (or be a bare string); an
/// optional `context` string is appended to the prompt. One shared
/// [`BackendClient`] serves every profile, so connection pooling happens at
/// the HTTP layer rather than per agent kind.
pub struct BackendAgent {
    profile: AgentProfile,
    client: Arc<BackendClient>,
}

impl BackendAgent {
    /// Creates an agent for `profile` using the shared backend client.
    pub fn new(profile: AgentProfile, client: Arc<BackendClient>) -> Self {
        Self { profile, client }
    }

    fn prompt_from(input: &Payload) -> Option<String> {
        if let Some(prompt) = input.as_str() {
            return Some(prompt.to_string());
        }
        let prompt = input.get("prompt")?.as_str()?;
        match input.get("context").and_then(|c| c.as_str()) {
            Some(context) => Some(format!("{prompt}\n\nContext:\n{context}")),
            None => Some(prompt.to_string()),
        }
    }
}

#[async_trait]
impl Agent for BackendAgent {
    fn kind(&self) -> &str {
        &self.profile.kind
    }

    async fn execute(&self, input: &Payload, ctx: &ExecutionContext) -> AgentResult {
        if ctx.is_cancelled() {
            return AgentResult::failed(TaskError::cancelled("cancelled before dispatch"));
        }

        let Some(prompt) = Self::prompt_from(input) else {
            return AgentResult::failed(TaskError::new(
                maestro_core::ErrorKind::Validation,
                "input must be a string or carry a 'prompt' field",
            ));
        };

        let model = self
            .profile
            .model
            .as_deref()
            .unwrap_or_else(|| self.client.default_model());

        debug!(kind = %self.profile.kind, model = %model, "dispatching to backend");

        let call = self.client.generate(
            model,
            &self.profile.system_prompt,
            &prompt,
            self.profile.temperature,
            ctx.deadline,
        );

        // The generate call is bounded by the deadline; cancellation aborts
        // the in-flight request by dropping the future.
        let outcome = tokio::select! {
            result = call => result,
            _ = ctx.cancel.cancelled() => {
                return AgentResult::failed(TaskError::cancelled(
                    "cancelled while awaiting backend response",
                ));
            }
        };

        match outcome {
            Ok(response) => AgentResult::completed(serde_json::json!({
                "response": response,
                "model": model,
                "agent_kind": self.profile.kind,
            })),
            Err(error) => AgentResult::failed(error),
        }
    }
}

/// Registers the built-in agent kinds against a shared backend client.
///
/// Each kind pools a single agent instance; the registry factory hands out
/// clones of the same `Arc`.
pub fn register_builtin_agents(
    registry: &AgentRegistry,
    config: &BackendConfig,
) -> MaestroResult<()> {
    let client = Arc::new(BackendClient::new(config.clone())?);
    for profile in default_profiles() {
        let kind = profile.kind.clone();
        let agent: Arc<dyn Agent> = Arc::new(BackendAgent::new(profile, Arc::clone(&client)));
        registry.register(kind, Box::new(move || Arc::clone(&agent)));
    }
    Ok(())
}
