//! OpenAI-compatible API backend
//!
//! Implements ConversationBackend by calling the `/chat/completions` endpoint
//! of any OpenAI-compatible server (Ollama, vLLM, LM Studio, OpenAI, ...).

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::{Error, Result};

use super::{BackendHealth, ChatMessage, ConversationBackend};

// ─────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    total_tokens: u64,
}

/// Requests and tokens spent by this process
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UsageTotals {
    pub requests: u64,
    pub tokens: u64,
}

/// Outcome of one HTTP attempt
enum Attempt {
    Done(CompletionReply),
    Retry(Error),
}

// ─────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    settings: LlmSettings,
    client: Client,
    totals: Mutex<UsageTotals>,
}

impl OpenAiBackend {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(crate::version::build_info().user_agent())
            .build()
            .map_err(|e| Error::backend(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %settings.base_url,
            model = %settings.default_model,
            retries = settings.max_retries,
            "Language model endpoint configured"
        );

        Ok(Self {
            settings,
            client,
            totals: Mutex::new(UsageTotals::default()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Attach the bearer token when one is configured. Local servers need none.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.settings.api_key.as_str() {
            "" => request,
            key => request.bearer_auth(key),
        }
    }

    pub fn totals(&self) -> UsageTotals {
        *self.totals.lock()
    }

    fn take_reply(&self, reply: CompletionReply) -> Result<String> {
        {
            let mut totals = self.totals.lock();
            totals.requests += 1;
            totals.tokens += reply.usage.unwrap_or_default().total_tokens;
            debug!(requests = totals.requests, tokens = totals.tokens, "Model usage");
        }

        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
            .ok_or_else(|| Error::backend("Model returned no choices"))
    }

    async fn attempt(&self, url: &str, body: &CompletionRequest<'_>) -> Result<Attempt> {
        let response = match self.authorized(self.client.post(url).json(body)).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(Error::Timeout {
                    operation: "Language model request".to_string(),
                    timeout_secs: self.settings.timeout_secs,
                })
            }
            Err(e) if e.is_connect() => {
                return Ok(Attempt::Retry(Error::backend(format!("Cannot reach {}: {}", url, e))))
            }
            Err(e) => return Err(Error::backend(format!("Request failed: {}", e))),
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<CompletionReply>()
                .await
                .map(Attempt::Done)
                .map_err(|e| Error::backend(format!("Unreadable model reply: {}", e)));
        }

        let detail = response.text().await.unwrap_or_default();
        let error = Error::backend(format!("Model server answered {}: {}", status, detail.trim()));
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Ok(Attempt::Retry(error))
        } else {
            Err(error)
        }
    }
}

impl Drop for OpenAiBackend {
    fn drop(&mut self) {
        let totals = self.totals();
        if totals.requests > 0 {
            info!(requests = totals.requests, tokens = totals.tokens, "Language model usage this session");
        }
    }
}

/// 0.5s, 1s, 2s, ...
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(500u64 << attempt.saturating_sub(1).min(6))
}

#[async_trait]
impl ConversationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        let probe = self.authorized(self.client.get(self.endpoint("models")));
        let error = match probe.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(BackendHealth::default()),
            Ok(resp) => format!("{} answered {}", self.settings.base_url, resp.status()),
            Err(e) => format!("{} unreachable: {}", self.settings.base_url, e),
        };
        Ok(BackendHealth {
            operational: false,
            error: Some(error),
        })
    }

    /// Retries connection failures, 429 and 5xx up to `max_retries` times.
    async fn generate(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        let url = self.endpoint("chat/completions");
        let body = CompletionRequest {
            model,
            messages,
            temperature: Some(self.settings.temperature),
        };

        let mut attempt = 0;
        loop {
            match self.attempt(&url, &body).await? {
                Attempt::Done(reply) => return self.take_reply(reply),
                Attempt::Retry(error) if attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!(attempt, ?delay, error = %error, "Model request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Attempt::Retry(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(settings: LlmSettings) -> OpenAiBackend {
        OpenAiBackend::new(settings).unwrap()
    }

    #[test]
    fn test_fresh_backend_has_no_usage() {
        let backend = backend(LlmSettings::default());
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.totals(), UsageTotals::default());
    }

    #[test]
    fn test_bearer_token_only_with_key() {
        let keyed = backend(LlmSettings {
            api_key: "sk-test-123".to_string(),
            ..Default::default()
        });
        let request = keyed.authorized(keyed.client.get("http://localhost/")).build().unwrap();
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer sk-test-123"
        );

        let local = backend(LlmSettings::default());
        let request = local.authorized(local.client.get("http://localhost/")).build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let backend = backend(LlmSettings {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            backend.endpoint("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "llama3.2:1b",
            messages: &messages,
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.2:1b");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_take_reply_counts_usage() {
        let backend = backend(LlmSettings::default());
        let reply: CompletionReply = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":" Hello! "}}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
        )
        .unwrap();
        assert_eq!(backend.take_reply(reply).unwrap(), "Hello!");
        assert_eq!(backend.totals(), UsageTotals { requests: 1, tokens: 5 });

        let empty: CompletionReply = serde_json::from_str("{}").unwrap();
        assert!(matches!(backend.take_reply(empty), Err(Error::Backend { .. })));
    }

    #[test]
    fn test_retry_delay_doubles() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_millis(1000));
        assert_eq!(retry_delay(3), Duration::from_millis(2000));
    }
}
