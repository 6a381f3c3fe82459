use serde::{Deserialize, Serialize};

/// Configuration for one built-in agent kind.
///
/// Profiles differ only in prompt, temperature, and (optionally) model; the
/// execution path is shared by [`BackendAgent`].
///
/// [`BackendAgent`]: crate::builtin::BackendAgent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Kind tag the profile registers under.
    pub kind: String,
    /// Model override; falls back to the backend config's default when unset.
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature for this kind.
    pub temperature: f32,
    /// System prompt establishing the agent's specialization.
    pub system_prompt: String,
}

/// The built-in agent kinds with their default prompts.
pub fn default_profiles() -> Vec<AgentProfile> {
    vec![
        reasoning_profile(),
        retrieval_profile(),
        codegen_profile(),
        review_profile(),
        docs_profile(),
        testing_profile(),
    ]
}

fn reasoning_profile() -> AgentProfile {
    AgentProfile {
        kind: "reasoning".to_string(),
        model: None,
        temperature: 0.4,
        system_prompt: REASONING_PROMPT.to_string(),
    }
}

fn retrieval_profile() -> AgentProfile {
    AgentProfile {
        kind: "retrieval".to_string(),
        model: None,
        temperature: 0.3,
        system_prompt: RETRIEVAL_PROMPT.to_string(),
    }
}

fn codegen_profile() -> AgentProfile {
    AgentProfile {
        kind: "codegen".to_string(),
        model: None,
        temperature: 0.2,
        system_prompt: CODEGEN_PROMPT.to_string(),
    }
}

fn review_profile() -> AgentProfile {
    AgentProfile {
        kind: "review".to_string(),
        model: None,
        temperature: 0.2,
        system_prompt: REVIEW_PROMPT.to_string(),
    }
}

fn docs_profile() -> AgentProfile {
    AgentProfile {
        kind: "docs".to_string(),
        model: None,
        temperature: 0.5,
        system_prompt: DOCS_PROMPT.to_string(),
    }
}

fn testing_profile() -> AgentProfile {
    AgentProfile {
        kind: "testing".to_string(),
        model: None,
        temperature: 0.2,
        system_prompt: TESTING_PROMPT.to_string(),
    }
}

const REASONING_PROMPT: &str = "\
You are an analysis specialist. Break the problem into parts, reason step by \
step, state assumptions explicitly, and finish with a concise conclusion. \
Distinguish facts from inference.";

const RETRIEVAL_PROMPT: &str = "\
You are a research specialist focused on information gathering. Prefer \
authoritative sources, cross-check claims, cite where the information came \
from, and flag gaps in what is known. Output: summary, key findings, \
references.";

const CODEGEN_PROMPT: &str = "\
You are a software development specialist. Produce working, idiomatic code \
for the requested change with minimal surrounding prose. Include error \
handling and note any assumptions about the surrounding codebase.";

const REVIEW_PROMPT: &str = "\
You are a code review specialist. Examine the supplied code for correctness, \
security issues, and maintainability problems. Report concrete findings with \
file/line references and a severity for each; do not restate the code.";

const DOCS_PROMPT: &str = "\
You are a technical documentation specialist. Write clear, accurate \
documentation for the supplied code or design: purpose, usage, parameters, \
and caveats. Match the register of existing project documentation.";

const TESTING_PROMPT: &str = "\
You are a testing specialist. Design and write tests for the supplied code: \
cover the happy path, boundary conditions, and failure modes. State what \
each test verifies and what is intentionally left uncovered.";
