//! Input classification and command authorization.
//!
//! A line is a command iff it starts with `/`. Everything else that is not
//! blank is an utterance for the language model, passed on verbatim.

mod command;
mod registry;

pub use command::{Command, Toggle};
pub use registry::{builtin_commands, find_command, Access, ALWAYS_AVAILABLE};

use crate::error::{Error, Result};
use crate::persona::PersonaDefinition;

#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Command(Command),
    Utterance(String),
    Blank,
}

/// Turn one raw input line into a command or an utterance.
pub fn classify(line: &str) -> Result<Classified> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Classified::Blank);
    }

    let Some(body) = trimmed.strip_prefix('/') else {
        return Ok(Classified::Utterance(line.to_string()));
    };

    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };

    let spec = find_command(name).ok_or_else(|| Error::UnknownCommand {
        name: name.to_string(),
    })?;
    let command = (spec.parse)(args).ok_or_else(|| Error::invalid_arguments(spec.name, spec.usage))?;
    Ok(Classified::Command(command))
}

/// Check a parsed command against the lock state and the active persona.
pub fn authorize(command: &Command, unlocked: bool, persona: &PersonaDefinition) -> Result<()> {
    let name = command.name();
    let spec = find_command(name).ok_or_else(|| Error::UnknownCommand {
        name: name.to_string(),
    })?;

    if spec.access == Access::Unlocked && !unlocked {
        return Err(Error::locked(format!("/{}", name)));
    }
    if !ALWAYS_AVAILABLE.contains(&name) && !persona.permits(name) {
        return Err(Error::CommandNotAllowed {
            command: name.to_string(),
            persona: persona.display_name.clone(),
        });
    }
    Ok(())
}

/// Help listing for the commands usable right now.
pub fn help_text(unlocked: bool, persona: &PersonaDefinition) -> String {
    let width = builtin_commands()
        .iter()
        .map(|spec| spec.usage.len())
        .max()
        .unwrap_or(0);

    let mut out = String::from("Commands:\n");
    for spec in builtin_commands() {
        let usable = (spec.access == Access::Any || unlocked)
            && (ALWAYS_AVAILABLE.contains(&spec.name) || persona.permits(spec.name));
        if usable {
            out.push_str(&format!("  {:width$}  {}\n", spec.usage, spec.summary, width = width));
        }
    }
    out.push_str("Anything else is sent to the assistant.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaRegistry;

    fn persona(id: &str) -> PersonaDefinition {
        PersonaRegistry::bundled().unwrap().get(id).unwrap().clone()
    }

    #[test]
    fn test_known_command_with_args() {
        assert_eq!(
            classify("/setplace home = 123 Main St").unwrap(),
            Classified::Command(Command::SetPlace {
                key: "home".to_string(),
                address: "123 Main St".to_string()
            })
        );
        assert_eq!(
            classify("/NAV  home\n").unwrap(),
            Classified::Command(Command::Nav {
                place: "home".to_string()
            })
        );
        assert_eq!(classify("/voice").unwrap(), Classified::Command(Command::Voice(Toggle::Status)));
    }

    #[test]
    fn test_utterance_is_verbatim() {
        for text in ["hello there", "  what's 2/3?  ", "set place home = x", "tell me about /help"] {
            assert_eq!(classify(text).unwrap(), Classified::Utterance(text.to_string()));
        }
    }

    #[test]
    fn test_blank() {
        assert_eq!(classify("").unwrap(), Classified::Blank);
        assert_eq!(classify("   \r\n").unwrap(), Classified::Blank);
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            classify("/teleport mars"),
            Err(Error::UnknownCommand { ref name }) if name == "teleport"
        ));
        assert!(matches!(classify("/"), Err(Error::UnknownCommand { .. })));
    }

    #[test]
    fn test_invalid_arguments_carry_usage() {
        let err = classify("/setplace home").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidArguments { ref usage, .. } if usage == "/setplace <key> = <address>"
        ));
        assert!(matches!(classify("/voice loud"), Err(Error::InvalidArguments { .. })));
        assert!(matches!(classify("/lock now"), Err(Error::InvalidArguments { .. })));
        assert!(matches!(classify("/setup_profile"), Err(Error::InvalidArguments { .. })));
    }

    #[test]
    fn test_privileged_commands_need_unlock() {
        let casual = persona("casual");
        let nav = Command::Nav {
            place: "home".to_string(),
        };
        assert!(matches!(authorize(&nav, false, &casual), Err(Error::Locked { .. })));
        assert!(authorize(&nav, true, &casual).is_ok());
        assert!(authorize(&Command::Recognize, false, &casual).is_ok());
    }

    #[test]
    fn test_persona_allow_list() {
        let guest = persona("guest");
        assert!(authorize(&Command::Recognize, false, &guest).is_ok());
        assert!(authorize(&Command::Help, false, &guest).is_ok());
        assert!(authorize(&Command::Switch { persona: None }, false, &guest).is_ok());
        assert!(matches!(
            authorize(&Command::Places, true, &guest),
            Err(Error::CommandNotAllowed { .. })
        ));
    }

    #[test]
    fn test_help_text_respects_lock_state() {
        let casual = persona("casual");
        let locked = help_text(false, &casual);
        assert!(locked.contains("/recognize"));
        assert!(!locked.contains("/nav"));

        let unlocked = help_text(true, &casual);
        assert!(unlocked.contains("/nav <place>"));
        assert!(unlocked.contains("/setplace <key> = <address>"));
    }
}
