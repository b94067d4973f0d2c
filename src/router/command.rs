//! Typed REPL commands produced by the router.

use std::fmt;

/// Argument of `/voice` and `/tts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
    Status,
}

impl Toggle {
    pub fn parse(arg: &str) -> Option<Self> {
        match arg.trim().to_lowercase().as_str() {
            "on" | "enable" => Some(Toggle::On),
            "off" | "disable" => Some(Toggle::Off),
            "" | "status" => Some(Toggle::Status),
            _ => None,
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::On => write!(f, "on"),
            Toggle::Off => write!(f, "off"),
            Toggle::Status => write!(f, "status"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Exit,
    Status,
    Recognize,
    SetupProfile { name: String },
    Login { name: String },
    Lock,
    Switch { persona: Option<String> },
    Agenda { day: Option<String> },
    Nav { place: String },
    SetPlace { key: String, address: String },
    Places,
    Voice(Toggle),
    Tts(Toggle),
    Voices,
    VoiceIndex { index: usize },
    Rate { words_per_minute: u32 },
    Mic,
    Model { name: Option<String> },
    Clear,
    GrantCalendar { name: String },
    RevokeCalendar { name: String },
}

impl Command {
    /// Registry name, without the leading slash.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Exit => "exit",
            Command::Status => "status",
            Command::Recognize => "recognize",
            Command::SetupProfile { .. } => "setup_profile",
            Command::Login { .. } => "login",
            Command::Lock => "lock",
            Command::Switch { .. } => "switch",
            Command::Agenda { .. } => "agenda",
            Command::Nav { .. } => "nav",
            Command::SetPlace { .. } => "setplace",
            Command::Places => "places",
            Command::Voice(_) => "voice",
            Command::Tts(_) => "tts",
            Command::Voices => "voices",
            Command::VoiceIndex { .. } => "voiceidx",
            Command::Rate { .. } => "rate",
            Command::Mic => "mic",
            Command::Model { .. } => "model",
            Command::Clear => "clear",
            Command::GrantCalendar { .. } => "grant_calendar",
            Command::RevokeCalendar { .. } => "revoke_calendar",
        }
    }
}
