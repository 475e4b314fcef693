//! Reasoning-service contract and the bundled OpenAI-compatible client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::disclosure::PromptShape;
use crate::response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One call to the reasoning service.
///
/// `max_completion_tokens` is omitted from the wire request when `None`;
/// an unconfigured budget must not turn into an artificial cap.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub max_completion_tokens: Option<u64>,
    pub shape: PromptShape,
}

/// Raw outcome of one call. The driver decides which absences are fatal.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: Option<String>,
    pub completion_tokens: Option<u64>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    /// The service rejected the request as malformed (HTTP 400).
    #[error("request rejected by the reasoning service: {0}")]
    Rejected(String),
    /// The reply was cut off by a length limit before it could be parsed.
    #[error("response truncated by a length limit: {0}")]
    Truncated(String),
    #[error("reasoning service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed completion body: {0}")]
    Malformed(String),
    #[error("client configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Rejection and truncation become per-property failures; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LlmError::Rejected(_) | LlmError::Truncated(_))
    }
}

/// Seam between the conversation driver and whatever answers it.
///
/// The bundled implementation is [`OpenAiClient`]; tests drive the checker
/// with scripted implementations instead.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, req: CompletionRequest<'_>) -> Result<Completion, LlmError>;
}

// Lets callers hand the checker a shared handle and keep one for
// themselves (tests inspect the recorded calls through theirs).
#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for std::sync::Arc<T> {
    async fn complete(&self, req: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        (**self).complete(req).await
    }
}

/// o1 and o1-preview gave good results on proof checking; everything else
/// tried (deepseek, claude, gpt-4o, gemini, o3-mini) was noticeably worse.
pub const DEFAULT_MODEL: &str = "o1";
const DEFAULT_REASONING_EFFORT: &str = "medium";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions client with structured outputs.
///
/// Invariants (should not change lightly):
/// - request path is `POST <base_url>/chat/completions`
/// - uses `Authorization: Bearer <key>`
/// - `response_format` is the JSON schema selected by the prompt shape
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    reasoning_effort: String,
}

impl OpenAiClient {
    /// Build a client from `OPENAI_API_KEY` / `OPENAI_BASE_URL` /
    /// `OPENAI_MODEL`. `model_override` (the `--model` flag) wins over the
    /// env var.
    pub fn from_env(model_override: Option<&str>) -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LlmError::Config("OPENAI_API_KEY not set".to_string()))?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = model_override
            .map(|s| s.to_string())
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            api_key,
            model,
            reasoning_effort: DEFAULT_REASONING_EFFORT.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn payload(&self, req: &CompletionRequest<'_>) -> Value {
        let mut payload = serde_json::json!({
            "model": self.model,
            "reasoning_effort": self.reasoning_effort,
            "messages": req.messages,
            "response_format": response::response_format(req.shape),
        });
        if let Some(cap) = req.max_completion_tokens {
            payload["max_completion_tokens"] = Value::from(cap);
        }
        payload
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    completion_tokens: u64,
}

#[async_trait]
impl ReasoningService for OpenAiClient {
    async fn complete(&self, req: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.payload(&req))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status.as_u16() == 400 {
            return Err(LlmError::Rejected(body));
        }
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Malformed(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Malformed("missing choices[0]".to_string()))?;
        if choice.finish_reason.as_deref() == Some("length") {
            return Err(LlmError::Truncated(
                "completion stopped at the length limit before a full reply".to_string(),
            ));
        }

        Ok(Completion {
            content: choice.message.content,
            completion_tokens: parsed.usage.map(|u| u.completion_tokens),
        })
    }
}
