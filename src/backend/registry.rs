//! Backend selection from `[llm]` settings.

use std::fmt;

use crate::config::LlmSettings;
use crate::error::{Error, Result};

use super::{ConversationBackend, EchoBackend, OpenAiBackend};

// ─────────────────────────────────────────────────────────────────
// Backend Type
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// OpenAI-compatible API backend
    OpenAi,
    /// Offline echo backend
    Echo,
}

impl BackendType {
    pub fn all() -> &'static [BackendType] {
        &[BackendType::OpenAi, BackendType::Echo]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendType::OpenAi => "openai",
            BackendType::Echo => "echo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(BackendType::OpenAi),
            "echo" => Some(BackendType::Echo),
            _ => None,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Backend Factory
// ─────────────────────────────────────────────────────────────────

/// Create the backend named by `settings.provider`.
pub fn create_backend(settings: &LlmSettings) -> Result<Box<dyn ConversationBackend>> {
    let backend_type = BackendType::parse(&settings.provider).ok_or_else(|| {
        Error::config_field_invalid(
            "llm.provider",
            format!(
                "Unknown provider '{}' (expected one of: {})",
                settings.provider,
                BackendType::all()
                    .iter()
                    .map(BackendType::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    })?;

    Ok(match backend_type {
        BackendType::OpenAi => Box::new(OpenAiBackend::new(settings.clone())?),
        BackendType::Echo => Box::new(EchoBackend::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_roundtrip() {
        for backend_type in BackendType::all() {
            assert_eq!(BackendType::parse(backend_type.name()), Some(*backend_type));
        }
        assert_eq!(BackendType::parse(" ECHO "), Some(BackendType::Echo));
        assert_eq!(BackendType::parse("cuda"), None);
    }

    #[test]
    fn test_create_backend() {
        let echo = LlmSettings {
            provider: "echo".to_string(),
            ..Default::default()
        };
        assert_eq!(create_backend(&echo).unwrap().name(), "echo");
        assert_eq!(create_backend(&LlmSettings::default()).unwrap().name(), "openai");

        let unknown = LlmSettings {
            provider: "llama-direct".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_backend(&unknown),
            Err(Error::ConfigValidation { .. })
        ));
    }
}
