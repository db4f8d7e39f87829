//! LLM Client: the only module that talks to the Anthropic Messages API.
//!
//! Transport concerns only: request shaping, HTTP backoff on 429 / 5xx and
//! JSON extraction. Classifier semantics (what to ask, how to validate the
//! answer) live in `classifier`.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Ranking a full population can take close to a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const BASE_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// A single prompt to send. `max_tokens` differs per use: CVs are long,
/// verdict lists grow with the population.
#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub max_tokens: u32,
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    model: String,
    max_attempts: u32,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, max_attempts: u32) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            model,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the prompt and returns the first text block of the reply.
    pub async fn complete_text(&self, prompt: Prompt<'_>) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: prompt.max_tokens,
            system: prompt.system,
            messages: [Message {
                role: "user",
                content: prompt.user,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying LLM request after transient failure"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .http
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "LLM API transient error: {text}");
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: text,
                });
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let reply: MessagesResponse = response.json().await?;
            debug!(
                input_tokens = reply.usage.input_tokens,
                output_tokens = reply.usage.output_tokens,
                "LLM call succeeded"
            );

            return reply
                .content
                .into_iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text)
                .filter(|t| !t.trim().is_empty())
                .ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: self.max_attempts,
        }))
    }

    /// Sends the prompt and deserializes the JSON payload of the reply.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        prompt: Prompt<'_>,
    ) -> Result<T, LlmError> {
        let text = self.complete_text(prompt).await?;
        serde_json::from_str(extract_json(&text)).map_err(LlmError::Parse)
    }
}

/// Narrows model output to its JSON payload: drops Markdown fences and any
/// prose before the first `[`/`{` or after the matching last `]`/`}`.
pub fn extract_json(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.trim_start();
        if let Some(inner) = text.strip_suffix("```") {
            text = inner.trim_end();
        }
    }

    let start = text.find(|c: char| c == '[' || c == '{');
    let Some(start) = start else {
        return text;
    };
    let closer = if text.as_bytes()[start] == b'[' { ']' } else { '}' };
    match text.rfind(closer) {
        Some(end) if end > start => &text[start..=end],
        _ => text,
    }
}
