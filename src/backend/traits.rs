//! Backend trait definitions
//!
//! Defines the ConversationBackend trait that every language-model backend
//! implements, plus the chat message types passed to it.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Chat Messages
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of a chat exchange, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Backend Health
// ─────────────────────────────────────────────────────────────────

/// Health status of a backend
#[derive(Debug, Clone)]
pub struct BackendHealth {
    /// Whether the backend answered
    pub operational: bool,

    /// Any error message
    pub error: Option<String>,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self {
            operational: true,
            error: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Conversation Backend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for language-model backends
///
/// The trait is object-safe; the session holds a `Box<dyn ConversationBackend>`.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Backend name for logs and /status
    fn name(&self) -> &'static str;

    /// Probe the backend without generating anything
    async fn health_check(&self) -> Result<BackendHealth>;

    /// Produce the assistant's reply to `messages` using `model`
    async fn generate(&self, messages: &[ChatMessage], model: &str) -> Result<String>;
}
