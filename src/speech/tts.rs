use std::process::Stdio;

use tracing::{debug, warn};

use crate::config::VoiceSettings;
use crate::error::{Error, Result};
use crate::process::{self, CommandTemplate};

use super::{TextToSpeech, VoicePrefs};

/// A synthesizer voice as listed by `/voices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Name passed back to the synthesizer
    pub id: String,
    /// Line shown to the user
    pub label: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum Engine {
    /// macOS `say`
    Say,
    Espeak,
    /// `voice.tts_command` with `{text}`, `{voice}` and `{rate}` placeholders
    Custom(CommandTemplate),
    None,
}

pub struct CommandTts {
    engine: Engine,
}

impl CommandTts {
    pub fn new(settings: &VoiceSettings) -> Self {
        let engine = match settings.tts_command.as_deref().and_then(CommandTemplate::parse) {
            Some(template) => Engine::Custom(template),
            None if cfg!(target_os = "macos") && process::on_path("say") => Engine::Say,
            None if process::on_path("espeak") => Engine::Espeak,
            None => Engine::None,
        };
        debug!(?engine, "Speech synthesizer selected");
        Self { engine }
    }

    fn voice_id(&self, prefs: &VoicePrefs) -> Option<String> {
        let index = prefs.voice_index?;
        match self.list_voices() {
            Ok(voices) => voices.get(index).map(|v| v.id.clone()),
            Err(e) => {
                warn!(error = %e, "Could not list voices");
                None
            }
        }
    }
}

impl TextToSpeech for CommandTts {
    fn is_available(&self) -> bool {
        !matches!(self.engine, Engine::None)
    }

    fn speak(&self, text: &str, prefs: &VoicePrefs) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let voice = self.voice_id(prefs);
        let rate = prefs.rate.to_string();

        let (mut command, program) = match &self.engine {
            Engine::None => return Ok(()),
            Engine::Custom(template) => (
                template.render(&[
                    ("text", text.to_string()),
                    ("voice", voice.unwrap_or_default()),
                    ("rate", rate),
                ]),
                template.program(),
            ),
            Engine::Say => {
                let mut command = std::process::Command::new("say");
                if let Some(voice) = voice {
                    command.args(["-v", voice.as_str()]);
                }
                command.args(["-r", rate.as_str(), text]);
                (command, "say")
            }
            Engine::Espeak => {
                let mut command = std::process::Command::new("espeak");
                if let Some(voice) = voice {
                    command.args(["-v", voice.as_str()]);
                }
                command.args(["-s", rate.as_str(), text]);
                (command, "espeak")
            }
        };

        command.stdin(Stdio::null());
        process::execute(&mut command, program).map_err(Error::speech)?;
        Ok(())
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        let (program, args): (&str, &[&str]) = match self.engine {
            Engine::Say => ("say", &["-v", "?"][..]),
            Engine::Espeak => ("espeak", &["--voices"][..]),
            Engine::Custom(_) | Engine::None => return Ok(Vec::new()),
        };

        let mut command = std::process::Command::new(program);
        command.args(args).stdin(Stdio::null());
        let output = process::execute(&mut command, program).map_err(Error::speech)?;
        let listing = String::from_utf8_lossy(&output.stdout);

        Ok(match self.engine {
            Engine::Espeak => parse_espeak_voices(&listing),
            _ => parse_say_voices(&listing),
        })
    }
}

/// `say -v ?` lines look like `Alex    en_US    # Most people recognize me by my voice.`
fn parse_say_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let name = line.split("  ").next()?.trim();
            (!name.is_empty()).then(|| Voice::new(name, line))
        })
        .collect()
}

/// `espeak --voices` is a table with a header row; the language column selects a voice.
fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let language = columns.get(1)?;
            let name = columns.get(3).unwrap_or(language);
            Some(Voice::new(*language, format!("{} ({})", name, language)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_say_voices() {
        let listing = "Alex                en_US    # Most people recognize me by my voice.\n\
                       Good News           en_US    # We cannot communicate with these carbon units.\n\n";
        let voices = parse_say_voices(listing);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "Alex");
        assert_eq!(voices[1].id, "Good News");
    }

    #[test]
    fn test_parse_espeak_voices() {
        let listing = "Pty Language Age/Gender VoiceName          File          Other Languages\n \
                       5  af             M  afrikaans            other/af\n \
                       5  en-gb          M  english              default\n";
        let voices = parse_espeak_voices(listing);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1], Voice::new("en-gb", "english (en-gb)"));
    }

    #[test]
    fn test_custom_engine() {
        let settings = VoiceSettings {
            tts_command: Some("speak-helper --rate {rate} {text}".to_string()),
            ..Default::default()
        };
        let tts = CommandTts::new(&settings);
        assert!(tts.is_available());
        assert!(tts.list_voices().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_custom_engine_runs() {
        let settings = VoiceSettings {
            tts_command: Some("true {text}".to_string()),
            ..Default::default()
        };
        let prefs = VoicePrefs {
            voice_index: Some(3),
            rate: 185,
        };
        assert!(CommandTts::new(&settings).speak("hello", &prefs).is_ok());
    }
}
