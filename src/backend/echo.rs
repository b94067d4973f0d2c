//! Echo backend
//!
//! Replies with the last user message. Selected with `llm.provider = "echo"`
//! for offline use and for driving the REPL in tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::{BackendHealth, ChatMessage, ConversationBackend, Role};

// ─────────────────────────────────────────────────────────────────
// Echo Backend Configuration
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct EchoConfig {
    /// Simulated latency per reply (ms)
    pub latency_ms: u64,

    /// Fail every generate call
    pub fail_generate: bool,

    /// Fixed response text instead of echoing
    pub fixed_response: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Echo Backend
// ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct EchoBackend {
    config: EchoConfig,
    calls: RwLock<u32>,
    last_request: RwLock<Vec<ChatMessage>>,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_config(config: EchoConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[cfg(test)]
    /// Number of generate calls so far
    pub fn call_count(&self) -> u32 {
        *self.calls.read()
    }

    #[cfg(test)]
    /// Messages of the most recent generate call
    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.last_request.read().clone()
    }
}

#[async_trait]
impl ConversationBackend for EchoBackend {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        Ok(BackendHealth::default())
    }

    async fn generate(&self, messages: &[ChatMessage], _model: &str) -> Result<String> {
        *self.calls.write() += 1;
        *self.last_request.write() = messages.to_vec();

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
        if self.config.fail_generate {
            return Err(Error::backend("Simulated generation failure"));
        }
        if let Some(ref fixed) = self.config.fixed_response {
            return Ok(fixed.clone());
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.trim())
            .unwrap_or_default();
        Ok(format!("(echo) {}", last_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_last_user_message() {
        let backend = EchoBackend::new();
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::user("first"),
            ChatMessage::assistant("(echo) first"),
            ChatMessage::user("  second  "),
        ];
        assert_eq!(backend.generate(&messages, "any").await.unwrap(), "(echo) second");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_request().len(), 4);
    }

    #[tokio::test]
    async fn test_fixed_and_failing() {
        let fixed = EchoBackend::with_config(EchoConfig {
            fixed_response: Some("ok".to_string()),
            ..Default::default()
        });
        assert_eq!(fixed.generate(&[], "m").await.unwrap(), "ok");

        let failing = EchoBackend::with_config(EchoConfig {
            fail_generate: true,
            ..Default::default()
        });
        assert!(matches!(
            failing.generate(&[ChatMessage::user("hi")], "m").await,
            Err(Error::Backend { .. })
        ));
        assert_eq!(failing.call_count(), 1);
    }
}
