use tracing::debug;

use crate::config::VoiceSettings;
use crate::error::{Error, Result};
use crate::process::CommandTemplate;

use super::SpeechToText;

/// Transcriber run as an external command.
///
/// Placeholders: `{model}` (offline model path), `{limit}` (phrase limit in
/// seconds), `{silence}` (end-of-phrase silence) and `{min}` (minimum
/// listening time).
pub struct CommandStt {
    template: Option<CommandTemplate>,
    vars: Vec<(&'static str, String)>,
}

impl CommandStt {
    pub fn new(settings: &VoiceSettings) -> Self {
        let template = settings
            .stt_command
            .as_deref()
            .and_then(CommandTemplate::parse);
        let vars = vec![
            ("model", settings.offline_model_path.clone().unwrap_or_default()),
            ("limit", settings.phrase_limit_secs.to_string()),
            ("silence", settings.end_silence_secs.to_string()),
            ("min", settings.min_listen_secs.to_string()),
        ];
        Self { template, vars }
    }
}

impl SpeechToText for CommandStt {
    fn is_available(&self) -> bool {
        self.template
            .as_ref()
            .map(|t| crate::process::on_path(t.program()))
            .unwrap_or(false)
    }

    fn transcribe(&mut self) -> Result<String> {
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| Error::speech("No speech recognizer is configured (voice.stt_command)"))?;

        let stdout = template.run(&self.vars).map_err(Error::speech)?;
        let text = stdout.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!(chars = text.len(), "Transcribed phrase");

        if text.is_empty() {
            return Err(Error::NoAudio);
        }
        Ok(text)
    }
}
