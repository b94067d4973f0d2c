//! The live session context.
//!
//! One `Session` exists per process. It is never persisted; per-identity
//! settings that must survive a restart go through `PreferencesStore`.
//! The lock state and identity live in `AuthGate`, which the orchestrator
//! owns alongside this struct.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::backend::Conversation;
use crate::config::AssistantConfig;
use crate::persona::PersonaDefinition;
use crate::speech::VoicePrefs;

/// Name used in prompts while nobody is unlocked.
pub const GUEST_NAME: &str = "guest";

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Always resolves in the persona registry
    pub active_persona: String,
    pub voice_mode: bool,
    pub tts_enabled: bool,
    pub voice: VoicePrefs,
    pub selected_model: String,
    pub conversation: Conversation,
}

impl Session {
    /// Locked session seeded with `persona`.
    pub fn new(config: &AssistantConfig, persona: &PersonaDefinition) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            active_persona: persona.id.clone(),
            voice_mode: false,
            tts_enabled: config.voice.tts_enabled_default,
            voice: VoicePrefs {
                voice_index: None,
                rate: config.voice.default_rate,
            },
            selected_model: config.llm.default_model.clone(),
            conversation: Conversation::new(persona, GUEST_NAME, config.assistant.history_turns),
        }
    }

    /// Make `persona` active and start a fresh conversation addressed to `name`.
    pub fn activate_persona(&mut self, persona: &PersonaDefinition, name: &str, history_turns: usize) {
        self.active_persona = persona.id.clone();
        self.conversation = Conversation::new(persona, name, history_turns);
    }
}
