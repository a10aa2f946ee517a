//! Ollama HTTP client for local LLM inference.
//!
//! The backend is treated as an opaque, synchronous call: given role-tagged
//! messages (plus an optional response-format hint), it returns generated
//! text. Variants that want schema-guided generation pass a JSON Schema as
//! the format hint; free-text variants pass `"json"` or nothing and rely on
//! downstream recovery.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ExtractError;

/// Default local Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Inference backend abstraction (allows mocking).
pub trait LlmClient {
    /// Send one chat round trip and return the generated text.
    ///
    /// `format` is an optional response-format hint: the string `"json"` or a
    /// JSON Schema object, passed through verbatim.
    fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: Option<&Value>,
    ) -> Result<String, ExtractError>;

    fn list_models(&self) -> Result<Vec<String>, ExtractError>;

    fn is_model_available(&self, model: &str) -> Result<bool, ExtractError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }
}

/// Ollama HTTP client pointing at a local instance.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    temperature: Option<f32>,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            temperature: None,
        }
    }

    /// Default Ollama instance at localhost:11434 with 5-minute timeout.
    pub fn default_local() -> Self {
        Self::new(DEFAULT_BASE_URL, 300)
    }

    /// Set a fixed sampling temperature for all requests.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn request_error(&self, e: reqwest::Error) -> ExtractError {
        if e.is_connect() {
            ExtractError::BackendConnection(self.base_url.clone())
        } else if e.is_timeout() {
            ExtractError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            ExtractError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: Option<&Value>,
    ) -> Result<String, ExtractError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model,
            messages,
            format,
            options: self
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .map_err(|e| ExtractError::HttpClient(e.to_string()))?;

        Ok(parsed.message.content)
    }

    fn list_models(&self) -> Result<Vec<String>, ExtractError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| ExtractError::HttpClient(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Mock LLM client for testing — plays back a scripted response sequence.
///
/// Each call consumes the next scripted response; when the script is
/// exhausted the last response repeats. `failing()` builds a client whose
/// every call errors, for exercising per-patient error recovery.
pub struct MockLlmClient {
    responses: Vec<String>,
    next: RefCell<usize>,
    failure: Option<String>,
    available_models: Vec<String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_responses(vec![response.to_string()])
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses,
            next: RefCell::new(0),
            failure: None,
            available_models: vec!["llama3.2:latest".to_string()],
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            responses: vec![],
            next: RefCell::new(0),
            failure: Some(message.to_string()),
            available_models: vec!["llama3.2:latest".to_string()],
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }
}

impl LlmClient for MockLlmClient {
    fn chat(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _format: Option<&Value>,
    ) -> Result<String, ExtractError> {
        if let Some(message) = &self.failure {
            return Err(ExtractError::HttpClient(message.clone()));
        }
        let mut next = self.next.borrow_mut();
        let index = (*next).min(self.responses.len().saturating_sub(1));
        *next += 1;
        self.responses
            .get(index)
            .cloned()
            .ok_or_else(|| ExtractError::HttpClient("mock has no responses".into()))
    }

    fn list_models(&self) -> Result<Vec<String>, ExtractError> {
        if let Some(message) = &self.failure {
            return Err(ExtractError::HttpClient(message.clone()));
        }
        Ok(self.available_models.clone())
    }
}
