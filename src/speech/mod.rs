//! Speech input and output
//!
//! Both directions are delegated to external programs: a transcriber that
//! records one phrase and prints the text, and a synthesizer (`say`,
//! `espeak`, or a configured command).

mod stt;
mod tts;

pub use stt::CommandStt;
pub use tts::{CommandTts, Voice};

use crate::error::{Error, Result};

/// Per-identity voice selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePrefs {
    /// Index into `TextToSpeech::list_voices`
    pub voice_index: Option<usize>,
    /// Words per minute
    pub rate: u32,
}

pub trait SpeechToText: Send {
    fn is_available(&self) -> bool;

    /// Record one phrase. `Error::NoAudio` when nothing was said.
    fn transcribe(&mut self) -> Result<String>;
}

pub trait TextToSpeech: Send {
    fn is_available(&self) -> bool;

    fn speak(&self, text: &str, prefs: &VoicePrefs) -> Result<()>;

    fn list_voices(&self) -> Result<Vec<Voice>>;
}

/// Used when no transcriber is configured.
pub struct NullStt;

impl SpeechToText for NullStt {
    fn is_available(&self) -> bool {
        false
    }

    fn transcribe(&mut self) -> Result<String> {
        Err(Error::speech("No speech recognizer is configured (voice.stt_command)"))
    }
}

/// Used when no synthesizer is available.
pub struct NullTts;

impl TextToSpeech for NullTts {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str, _prefs: &VoicePrefs) -> Result<()> {
        Ok(())
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(Vec::new())
    }
}

/// Cut `text` to at most `limit` characters for speaking, marking the cut.
pub fn truncate_for_speech(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{} ...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_speech() {
        assert_eq!(truncate_for_speech("  short reply ", 600), "short reply");

        let long = "word ".repeat(200);
        let spoken = truncate_for_speech(&long, 600);
        assert!(spoken.ends_with(" ..."));
        assert!(spoken.chars().count() <= 604);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_for_speech("héllo wörld", 4), "héll ...");
    }

    #[test]
    fn test_null_devices() {
        let mut stt = NullStt;
        assert!(!stt.is_available());
        assert!(matches!(stt.transcribe(), Err(Error::Speech { .. })));

        let tts = NullTts;
        let prefs = VoicePrefs {
            voice_index: None,
            rate: 185,
        };
        assert!(tts.speak("hi", &prefs).is_ok());
        assert!(tts.list_voices().unwrap().is_empty());
    }
}
