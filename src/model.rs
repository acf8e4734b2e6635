use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
/// App-provided fallback credential for the hosted Gemini variant.
pub const GEMINI_FALLBACK_KEY_ENV: &str = "CASEFORGE_GEMINI_API_KEY";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const TEMPERATURE: f64 = 0.7;
const BODY_SNIPPET_LIMIT: usize = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAi,
    Custom,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini (Default)",
            Provider::OpenAi => "OpenAI / Compatible",
            Provider::Custom => "Custom (Ollama/Local)",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Provider::Gemini => Provider::OpenAi,
            Provider::OpenAi => Provider::Custom,
            Provider::Custom => Provider::Gemini,
        }
    }
}

/// Stored model configuration; serialized under the `api_config` settings key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub provider: Provider,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
}

#[derive(Debug)]
pub enum ModelError {
    /// Required provider credential absent; no call was attempted.
    Config(String),
    /// Non-success HTTP response from the model backend.
    Provider { status: u16, body: String },
    /// Network failure or a response that does not match the provider shape.
    Transport(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::Config(detail) => write!(f, "{detail}"),
            ModelError::Provider { status, body } => {
                write!(f, "Model API error ({status}): {body}")
            }
            ModelError::Transport(detail) => write!(f, "Request failed: {detail}"),
        }
    }
}

impl std::error::Error for ModelError {}

fn body_snippet(body: &str) -> String {
    if body.chars().count() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    body.chars().take(BODY_SNIPPET_LIMIT).collect()
}

/// Joins `{base}/chat/completions`, tolerating a trailing slash on the base.
pub fn chat_completions_url(base_url: &str) -> String {
    let base = if base_url.is_empty() {
        DEFAULT_OPENAI_BASE
    } else {
        base_url
    };
    if base.ends_with('/') {
        format!("{base}chat/completions")
    } else {
        format!("{base}/chat/completions")
    }
}

pub fn gemini_generate_url(model_name: &str, api_key: &str) -> String {
    let model = if model_name.is_empty() {
        DEFAULT_GEMINI_MODEL
    } else {
        model_name
    };
    format!("{GEMINI_API_BASE}/models/{model}:generateContent?key={api_key}")
}

/// The credential used for the hosted Gemini variant: the user's key when
/// set, otherwise the app-provided fallback from the environment.
pub fn effective_gemini_key(config: &ApiConfig) -> String {
    if !config.api_key.is_empty() {
        return config.api_key.clone();
    }
    std::env::var(GEMINI_FALLBACK_KEY_ENV).unwrap_or_default()
}

pub fn openai_model(config: &ApiConfig) -> &str {
    if config.model_name.is_empty() {
        DEFAULT_OPENAI_MODEL
    } else {
        &config.model_name
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

fn http_client() -> Result<reqwest::blocking::Client, ModelError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|err| ModelError::Transport(err.to_string()))
}

/// Sends `prompt` to the configured provider and returns the raw completion
/// text. No retries; retry policy belongs to the caller.
pub fn complete(config: &ApiConfig, prompt: &str) -> Result<String, ModelError> {
    match config.provider {
        Provider::Gemini => complete_gemini(config, prompt),
        Provider::OpenAi => {
            if config.api_key.is_empty() {
                return Err(ModelError::Config(
                    "API key is not configured; set it in settings".to_string(),
                ));
            }
            complete_openai_compatible(config, prompt)
        }
        // The local/custom variant speaks the same wire shape and tolerates
        // a missing key.
        Provider::Custom => complete_openai_compatible(config, prompt),
    }
}

fn complete_gemini(config: &ApiConfig, prompt: &str) -> Result<String, ModelError> {
    let api_key = effective_gemini_key(config);
    let url = gemini_generate_url(&config.model_name, &api_key);
    let body = GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
    };

    tracing::debug!(provider = "gemini", "sending completion request");
    let response = http_client()?
        .post(&url)
        .json(&body)
        .send()
        .map_err(|err| ModelError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "gemini request failed");
        return Err(ModelError::Provider {
            status: status.as_u16(),
            body: body_snippet(&text),
        });
    }

    let parsed: GeminiResponse = response
        .json()
        .map_err(|err| ModelError::Transport(format!("failed to parse response: {err}")))?;
    parsed
        .candidates
        .first()
        .and_then(|candidate| candidate.content.parts.first())
        .map(|part| part.text.clone())
        .ok_or_else(|| ModelError::Transport("empty Gemini response".to_string()))
}

fn complete_openai_compatible(config: &ApiConfig, prompt: &str) -> Result<String, ModelError> {
    let url = chat_completions_url(&config.base_url);
    let body = json!({
        "model": openai_model(config),
        "messages": [{ "role": "user", "content": prompt }],
        "temperature": TEMPERATURE,
    });

    tracing::debug!(url = %url, "sending completion request");
    let mut request = http_client()?.post(&url).json(&body);
    if !config.api_key.is_empty() {
        request = request.bearer_auth(&config.api_key);
    }
    let response = request
        .send()
        .map_err(|err| ModelError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "chat completion request failed");
        return Err(ModelError::Provider {
            status: status.as_u16(),
            body: body_snippet(&text),
        });
    }

    let parsed: serde_json::Value = response
        .json()
        .map_err(|err| ModelError::Transport(format!("failed to parse response: {err}")))?;
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| ModelError::Transport("unexpected chat completion shape".to_string()))
}

#[derive(Debug)]
pub enum ModelEvent {
    Completed(Result<String, ModelError>),
}

/// Runs completions on a worker thread and delivers exactly one event per
/// prompt over a channel, so the event loop never blocks on the network.
/// The app keeps one adapter per phase (discussion, generation).
pub struct ModelAdapter {
    event_tx: Sender<ModelEvent>,
    event_rx: Receiver<ModelEvent>,
}

impl ModelAdapter {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self { event_tx, event_rx }
    }

    pub fn send_prompt(&self, config: ApiConfig, prompt: String) {
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let result = complete(&config, &prompt);
            let _ = tx.send(ModelEvent::Completed(result));
        });
    }

    pub fn drain_events_limited(&self, max_events: usize) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }
}

impl Default for ModelAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/unit/model_tests.rs"]
mod tests;
