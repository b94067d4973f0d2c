//! Output of one handled input line.

use colored::Colorize;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Command feedback
    Info(String),
    /// Model or intent answer, attributed to the persona
    Assistant { persona: String, text: String },
    Warning(String),
    Error {
        code: String,
        message: String,
        hint: Option<&'static str>,
    },
}

impl Reply {
    pub fn render(&self) -> String {
        match self {
            Reply::Info(text) => text.clone(),
            Reply::Assistant { persona, text } => format!("{}: {}", persona.cyan().bold(), text),
            Reply::Warning(text) => text.yellow().to_string(),
            Reply::Error {
                code,
                message,
                hint,
            } => {
                let mut out = format!("{}: {}", format!("Error [{}]", code).red(), message);
                if let Some(hint) = hint {
                    out.push_str(&format!("\n{}: {}", "Hint".yellow(), hint));
                }
                out
            }
        }
    }
}

/// Everything produced while handling one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    pub replies: Vec<Reply>,
    /// Text for the synthesizer, already truncated
    pub speech: Option<String>,
    /// The loop should end after this turn
    pub exit: bool,
}

impl Turn {
    pub fn info(&mut self, text: impl Into<String>) {
        self.replies.push(Reply::Info(text.into()));
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.replies.push(Reply::Warning(text.into()));
    }

    pub fn assistant(&mut self, persona: impl Into<String>, text: impl Into<String>) {
        self.replies.push(Reply::Assistant {
            persona: persona.into(),
            text: text.into(),
        });
    }

    pub fn fail(&mut self, error: &Error) {
        self.replies.push(Reply::Error {
            code: error.code().as_str(),
            message: error.to_string(),
            hint: error.suggestion(),
        });
    }

    pub fn render(&self) -> String {
        self.replies
            .iter()
            .map(Reply::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether any reply is an error.
    pub fn failed(&self) -> bool {
        self.replies.iter().any(|r| matches!(r, Reply::Error { .. }))
    }

    /// Plain text of all replies, for tests and logs.
    pub fn text(&self) -> String {
        self.replies
            .iter()
            .map(|reply| match reply {
                Reply::Info(text) | Reply::Warning(text) => text.clone(),
                Reply::Assistant { text, .. } => text.clone(),
                Reply::Error { message, .. } => message.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_carries_code_and_hint() {
        let mut turn = Turn::default();
        turn.fail(&Error::PlaceNotFound {
            key: "gym".to_string(),
        });
        assert!(turn.failed());
        assert_eq!(
            turn.replies[0],
            Reply::Error {
                code: "E403".to_string(),
                message: "No saved place named 'gym'".to_string(),
                hint: Some("Save it first with /setplace <key> = <address>."),
            }
        );
    }

    #[test]
    fn test_text_joins_replies() {
        let mut turn = Turn::default();
        turn.info("one");
        turn.assistant("Casual", "two");
        assert_eq!(turn.text(), "one\ntwo");
        assert!(!turn.failed());
    }
}
