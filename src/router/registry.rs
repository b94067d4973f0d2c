//! Builtin command table.
//!
//! Built once on first access. Each entry pairs the help text with the access
//! rule and a parser that turns the argument string into a typed `Command`.

use std::sync::OnceLock;

use regex::Regex;

use super::command::{Command, Toggle};

/// Lock state a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Usable while locked
    Any,
    /// Requires an unlocked session
    Unlocked,
}

/// Parses the text after the command name; None means malformed.
pub type ArgParser = fn(&str) -> Option<Command>;

#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Command name (without the leading /)
    pub name: &'static str,
    /// Usage format (e.g., "/nav <place>")
    pub usage: &'static str,
    /// Human-readable description
    pub summary: &'static str,
    pub access: Access,
    pub parse: ArgParser,
}

impl CommandSpec {
    const fn new(
        name: &'static str,
        usage: &'static str,
        summary: &'static str,
        access: Access,
        parse: ArgParser,
    ) -> Self {
        Self {
            name,
            usage,
            summary,
            access,
            parse,
        }
    }
}

/// Commands no persona allow-list can hide.
pub const ALWAYS_AVAILABLE: &[&str] = &["help", "exit", "status", "switch"];

static COMMANDS: OnceLock<Vec<CommandSpec>> = OnceLock::new();

/// All builtin commands, in help order.
pub fn builtin_commands() -> &'static [CommandSpec] {
    COMMANDS.get_or_init(|| {
        use Access::{Any, Unlocked};
        vec![
            CommandSpec::new("help", "/help", "Show this help", Any, |a| {
                no_args(a, Command::Help)
            }),
            CommandSpec::new("status", "/status", "Show session state", Any, |a| {
                no_args(a, Command::Status)
            }),
            CommandSpec::new(
                "recognize",
                "/recognize",
                "Unlock by face",
                Any,
                |a| no_args(a, Command::Recognize),
            ),
            CommandSpec::new(
                "setup_profile",
                "/setup_profile <Name>",
                "Enroll (or re-enroll) a face profile",
                Any,
                |a| name_arg(a).map(|name| Command::SetupProfile { name }),
            ),
            CommandSpec::new(
                "login",
                "/login <Name>",
                "Development login without a face match",
                Any,
                |a| name_arg(a).map(|name| Command::Login { name }),
            ),
            CommandSpec::new("lock", "/lock", "Lock the session", Any, |a| {
                no_args(a, Command::Lock)
            }),
            CommandSpec::new(
                "switch",
                "/switch [persona]",
                "Cycle personas, or switch to the one named",
                Any,
                |a| {
                    Some(Command::Switch {
                        persona: optional_word(a)?,
                    })
                },
            ),
            CommandSpec::new(
                "agenda",
                "/agenda [today|tomorrow|<weekday>]",
                "List calendar events",
                Unlocked,
                |a| {
                    Some(Command::Agenda {
                        day: optional_text(a),
                    })
                },
            ),
            CommandSpec::new(
                "nav",
                "/nav <place>",
                "Directions to a saved place",
                Unlocked,
                |a| optional_text(a).map(|place| Command::Nav { place }),
            ),
            CommandSpec::new(
                "setplace",
                "/setplace <key> = <address>",
                "Save a place for /nav",
                Unlocked,
                parse_setplace,
            ),
            CommandSpec::new("places", "/places", "List saved places", Unlocked, |a| {
                no_args(a, Command::Places)
            }),
            CommandSpec::new(
                "voice",
                "/voice on|off|status",
                "Voice input mode",
                Any,
                |a| Toggle::parse(a).map(Command::Voice),
            ),
            CommandSpec::new(
                "tts",
                "/tts on|off|status",
                "Spoken replies",
                Any,
                |a| Toggle::parse(a).map(Command::Tts),
            ),
            CommandSpec::new("voices", "/voices", "List speech voices", Any, |a| {
                no_args(a, Command::Voices)
            }),
            CommandSpec::new(
                "voiceidx",
                "/voiceidx <n>",
                "Select a speech voice by number",
                Any,
                |a| {
                    a.trim()
                        .parse()
                        .ok()
                        .map(|index| Command::VoiceIndex { index })
                },
            ),
            CommandSpec::new(
                "rate",
                "/rate <words-per-minute>",
                "Set speaking rate (80-400)",
                Any,
                |a| {
                    a.trim()
                        .parse()
                        .ok()
                        .filter(|wpm| (80..=400).contains(wpm))
                        .map(|words_per_minute| Command::Rate { words_per_minute })
                },
            ),
            CommandSpec::new("mic", "/mic", "Speak one message", Any, |a| {
                no_args(a, Command::Mic)
            }),
            CommandSpec::new(
                "model",
                "/model [name]",
                "Show or select the language model",
                Any,
                |a| {
                    Some(Command::Model {
                        name: optional_word(a)?,
                    })
                },
            ),
            CommandSpec::new("clear", "/clear", "Reset the conversation", Any, |a| {
                no_args(a, Command::Clear)
            }),
            CommandSpec::new(
                "grant_calendar",
                "/grant_calendar <Name>",
                "Allow a profile to use the calendar",
                Unlocked,
                |a| name_arg(a).map(|name| Command::GrantCalendar { name }),
            ),
            CommandSpec::new(
                "revoke_calendar",
                "/revoke_calendar <Name>",
                "Stop a profile from using the calendar",
                Unlocked,
                |a| name_arg(a).map(|name| Command::RevokeCalendar { name }),
            ),
            CommandSpec::new("exit", "/exit", "Quit", Any, |a| no_args(a, Command::Exit)),
        ]
    })
}

/// Find a builtin command by name (case-insensitive).
pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    builtin_commands()
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(name))
}

fn no_args(args: &str, command: Command) -> Option<Command> {
    args.trim().is_empty().then_some(command)
}

fn optional_text(args: &str) -> Option<String> {
    let args = args.trim();
    (!args.is_empty()).then(|| args.to_string())
}

/// Some(None) when empty, Some(Some(word)) for one word, None for several.
fn optional_word(args: &str) -> Option<Option<String>> {
    let mut words = args.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => Some(None),
        (Some(word), None) => Some(Some(word.to_string())),
        _ => None,
    }
}

fn name_arg(args: &str) -> Option<String> {
    let name = args.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));
    valid.then(|| name.to_string())
}

fn parse_setplace(args: &str) -> Option<Command> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^([A-Za-z0-9_\-. ]+?)\s*=\s*(\S.*)$").ok())
        .as_ref()?;

    let captures = pattern.captures(args.trim())?;
    let key = captures.get(1)?.as_str().trim();
    let address = captures.get(2)?.as_str().trim();
    (!key.is_empty()).then(|| Command::SetPlace {
        key: key.to_lowercase(),
        address: address.to_string(),
    })
}
