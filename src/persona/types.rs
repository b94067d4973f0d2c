//! Core types for the persona system.
//!
//! A persona is pure data: the prompt fragments that shape the assistant's
//! tone, whether it may be used before unlocking, and an optional allow-list
//! of REPL commands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder replaced with the current identity (or "guest") in prompts.
pub const NAME_PLACEHOLDER: &str = "{name}";

// ─────────────────────────────────────────────────────────────────
// Persona Definition (loaded from TOML)
// ─────────────────────────────────────────────────────────────────

/// Full persona definition, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDefinition {
    /// Lowercase identifier used by `/switch` and the config file.
    pub id: String,

    /// Human-readable display name.
    pub display_name: String,

    /// Short human-readable description.
    #[serde(default)]
    pub description: String,

    /// System prompt sent first in every conversation.
    pub system_prompt: String,

    /// Tone and formatting rules, sent as a separate style guide.
    #[serde(default)]
    pub style: String,

    /// First line printed after switching to this persona.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Whether this persona may only be active in an unlocked session.
    #[serde(default = "default_requires_unlock")]
    pub requires_unlock: bool,

    /// Commands usable with this persona (unset = all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_commands: Option<Vec<String>>,
}

fn default_greeting() -> String {
    format!("Hello {}.", NAME_PLACEHOLDER)
}

fn default_requires_unlock() -> bool {
    true
}

impl PersonaDefinition {
    /// Parse and validate a TOML persona table.
    pub fn from_toml(source: &str, origin: &str) -> Result<Self> {
        let persona: PersonaDefinition = toml::from_str(source).map_err(|e| {
            Error::config_validation(format!("persona {}: {}", origin, e.message()))
        })?;
        persona.validate()?;
        Ok(persona)
    }

    pub fn validate(&self) -> Result<()> {
        let id_ok = !self.id.is_empty()
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !id_ok {
            return Err(Error::config_field_invalid(
                "persona.id",
                format!("persona id '{}' must be lowercase letters, digits, '-' or '_'", self.id),
            ));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "persona.system_prompt",
                format!("persona '{}' has an empty system prompt", self.id),
            ));
        }
        Ok(())
    }

    /// Whether the allow-list (if any) includes `command`.
    pub fn permits(&self, command: &str) -> bool {
        match self.allowed_commands {
            Some(ref allowed) => allowed.iter().any(|c| c.eq_ignore_ascii_case(command)),
            None => true,
        }
    }

    pub fn system_prompt_for(&self, name: &str) -> String {
        self.system_prompt.replace(NAME_PLACEHOLDER, name)
    }

    pub fn greeting_for(&self, name: &str) -> String {
        self.greeting.replace(NAME_PLACEHOLDER, name)
    }
}

impl fmt::Display for PersonaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
id = "pirate"
display_name = "Pirate"
system_prompt = "You are a pirate talking to {name}."
"#;

    #[test]
    fn test_defaults_applied() {
        let persona = PersonaDefinition::from_toml(MINIMAL, "test").unwrap();
        assert!(persona.requires_unlock);
        assert!(persona.allowed_commands.is_none());
        assert_eq!(persona.greeting_for("Ann"), "Hello Ann.");
        assert_eq!(persona.system_prompt_for("Ann"), "You are a pirate talking to Ann.");
    }

    #[test]
    fn test_permits_without_allow_list() {
        let persona = PersonaDefinition::from_toml(MINIMAL, "test").unwrap();
        assert!(persona.permits("nav"));
        assert!(persona.permits("agenda"));
    }

    #[test]
    fn test_permits_with_allow_list() {
        let source = format!("{}\nallowed_commands = [\"recognize\", \"Login\"]\n", MINIMAL);
        let persona = PersonaDefinition::from_toml(&source, "test").unwrap();
        assert!(persona.permits("recognize"));
        assert!(persona.permits("login"));
        assert!(!persona.permits("nav"));
    }

    #[test]
    fn test_rejects_bad_id() {
        let source = MINIMAL.replace("pirate", "Pirate Bob");
        assert!(PersonaDefinition::from_toml(&source, "test").is_err());
    }

    #[test]
    fn test_rejects_empty_prompt() {
        let source = MINIMAL.replace("You are a pirate talking to {name}.", " ");
        let err = PersonaDefinition::from_toml(&source, "test").unwrap_err();
        assert!(err.to_string().contains("empty system prompt"));
    }
}
