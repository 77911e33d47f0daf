//! Hosted generation backend
//!
//! An optional collaborator that phrases the policy's decision. It never
//! decides anything; callers wrap it with [`crate::resilience`] so a failure
//! degrades to the templated reply.

use crate::config::BackendConfig;
use async_trait::async_trait;
use disclosure::{Speaker, Turn};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Errors from a generation backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend not configured: {0}")]
    Unconfigured(String),

    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse backend response: {0}")]
    Parse(String),
}

/// Everything a backend needs to phrase one reply
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    /// Conversation before `message`
    pub history: Vec<Turn>,
    pub message: String,
}

/// A hosted text-generation service
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier for logs and degraded-reply metadata
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

/// Gemini `generateContent` REST backend
pub struct GeminiBackend {
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: &BackendConfig, api_key: String) -> Result<Self, BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::Unconfigured("API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self {
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }

    fn url(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }

    /// Build the request body.
    ///
    /// Agent turns before the first user turn (the greeting) are dropped:
    /// the conversation sent to the model must open with the user.
    pub fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .skip_while(|t| t.speaker == Speaker::Agent)
            .map(|t| {
                let role = match t.speaker {
                    Speaker::User => "user",
                    Speaker::Agent => "model",
                };
                json!({ "role": role, "parts": [{ "text": t.text }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": request.message }] }));

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        })
    }
}

/// Concatenate the text parts of the first candidate
pub fn extract_text(response: &Value) -> Result<String, BackendError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| BackendError::Parse("response has no candidate parts".into()))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(BackendError::Parse("candidate text is empty".into()));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(start.elapsed())
                } else {
                    BackendError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        let text = extract_text(&json)?;

        debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Backend reply received"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(&BackendConfig::default(), "test-key".into()).unwrap()
    }

    fn turn(speaker: Speaker, text: &str, ordinal: u64) -> Turn {
        Turn {
            speaker,
            text: text.into(),
            ordinal,
        }
    }

    #[test]
    fn test_empty_key_is_unconfigured() {
        let err = GeminiBackend::new(&BackendConfig::default(), " ".into())
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::Unconfigured(_)));
    }

    #[test]
    fn test_url_strips_models_prefix() {
        let config = BackendConfig {
            model: "models/gemini-pro".into(),
            endpoint: "https://example.test/v1beta/".into(),
            ..Default::default()
        };
        let b = GeminiBackend::new(&config, "k".into()).unwrap();
        assert_eq!(
            b.url(),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_request_body_drops_leading_greeting() {
        let request = GenerationRequest {
            system_instruction: "rules".into(),
            history: vec![
                turn(Speaker::Agent, "Hey 👋", 1),
                turn(Speaker::User, "invoice?", 2),
                turn(Speaker::Agent, "after delivery", 3),
            ],
            message: "office claim".into(),
        };
        let body = backend().request_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "office claim");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "rules");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }]
        });
        assert_eq!(extract_text(&resp).unwrap(), "Hello there");
    }

    #[test]
    fn test_extract_text_rejects_empty() {
        let resp = json!({ "candidates": [] });
        assert!(matches!(extract_text(&resp), Err(BackendError::Parse(_))));
        let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert!(matches!(extract_text(&blank), Err(BackendError::Parse(_))));
    }
}
