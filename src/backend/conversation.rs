//! Conversation state sent to the backend.
//!
//! A conversation starts with three seed messages derived from the active
//! persona (system prompt, style guide, style reminder) followed by at most
//! `max_turns` user/assistant exchanges. A turn is recorded only once the
//! backend has answered, so a failed request leaves no dangling user message.

use std::collections::VecDeque;

use crate::persona::PersonaDefinition;

use super::ChatMessage;

pub const STYLE_REMINDER: &str =
    "Follow the persona style strictly. If the user requests a different tone, politely keep the assigned style.";

#[derive(Debug, Clone)]
pub struct Conversation {
    persona_id: String,
    seed: Vec<ChatMessage>,
    turns: VecDeque<(String, String)>,
    max_turns: usize,
}

impl Conversation {
    /// Fresh conversation for `persona`, addressing the user as `name`.
    pub fn new(persona: &PersonaDefinition, name: &str, max_turns: usize) -> Self {
        let mut seed = vec![ChatMessage::system(persona.system_prompt_for(name))];
        if !persona.style.trim().is_empty() {
            seed.push(ChatMessage::system(format!("Style guide: {}", persona.style.trim())));
        }
        seed.push(ChatMessage::system(STYLE_REMINDER));

        Self {
            persona_id: persona.id.clone(),
            seed,
            turns: VecDeque::new(),
            max_turns,
        }
    }

    pub fn persona_id(&self) -> &str {
        &self.persona_id
    }

    /// Messages to send for `utterance`: seed, history, then the utterance.
    pub fn request(&self, utterance: &str) -> Vec<ChatMessage> {
        let mut messages = self.seed.clone();
        for (user, assistant) in &self.turns {
            messages.push(ChatMessage::user(user.as_str()));
            messages.push(ChatMessage::assistant(assistant.as_str()));
        }
        messages.push(ChatMessage::user(utterance));
        messages
    }

    /// Append a completed exchange, dropping the oldest beyond the cap.
    pub fn record(&mut self, utterance: &str, reply: &str) {
        self.turns.push_back((utterance.to_string(), reply.to_string()));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Forget the history, keeping the persona seed.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }
}
