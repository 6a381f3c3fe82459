use maestro_core::{MaestroError, MaestroResult, TaskError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

fn default_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5-coder:14b".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Connection settings for an inference backend exposing an Ollama-style
/// `/api/generate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `http://127.0.0.1:11434`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default model id used when a profile does not override it.
    #[serde(default = "default_model")]
    pub model: String,
    /// Default sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// HTTP client for a text-generation backend.
///
/// Each call is bounded by the caller's deadline; transport and server
/// failures are classified into the engine's error taxonomy so the scheduler
/// can decide retriability without inspecting HTTP details.
pub struct BackendClient {
    config: BackendConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl BackendClient {
    /// Creates a client from the given config.
    pub fn new(config: BackendConfig) -> MaestroResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| MaestroError::Backend(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// The configured default model id.
    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    /// The configured default temperature.
    pub fn default_temperature(&self) -> f32 {
        self.config.temperature
    }

    /// Sends one generation request, completing before `deadline` or failing
    /// with a `Timeout`-kind error.
    pub async fn generate(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        temperature: f32,
        deadline: Instant,
    ) -> Result<String, TaskError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TaskError::timeout("deadline elapsed before request was sent"));
        }

        let url = format!("{}/api/generate", self.config.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions { temperature },
        };

        let response = self
            .http
            .post(&url)
            .timeout(remaining)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TaskError::permanent("malformed backend response").with_cause(e.to_string()))?;

        Ok(parsed.response)
    }
}

fn classify_transport_error(err: reqwest::Error) -> TaskError {
    if err.is_timeout() {
        TaskError::timeout("backend request timed out").with_cause(err.to_string())
    } else if err.is_connect() {
        TaskError::transient("backend connection failed").with_cause(err.to_string())
    } else {
        TaskError::transient("backend request failed").with_cause(err.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> TaskError {
    let message = format!("backend returned {status}");
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        TaskError::transient(message).with_cause(body.to_string())
    } else {
        TaskError::permanent(message).with_cause(body.to_string())
    }
}
