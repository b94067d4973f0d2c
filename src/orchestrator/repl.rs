//! Interactive loop: typed lines from a terminal or a pipe, or transcribed
//! phrases while voice mode is on.

use std::io::{self, IsTerminal, StdinLock, Write};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{SessionOrchestrator, Turn};

/// Where typed input comes from.
pub enum LineSource {
    /// Line editing with history
    Terminal(Box<DefaultEditor>),
    /// Plain lines, no prompt echo
    Piped(io::Lines<StdinLock<'static>>),
}

impl LineSource {
    /// Line editor when stdin is a terminal, plain lines otherwise.
    pub fn stdin() -> Result<Self> {
        if io::stdin().is_terminal() {
            let editor = DefaultEditor::new()
                .map_err(|e| Error::Internal(format!("line editor: {}", e)))?;
            Ok(LineSource::Terminal(Box::new(editor)))
        } else {
            Ok(LineSource::Piped(io::stdin().lines()))
        }
    }

    /// Next line, or `None` at end of input.
    pub fn read(&mut self, prompt: &str) -> Result<Option<String>> {
        match self {
            LineSource::Terminal(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    Ok(Some(line))
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
                Err(ReadlineError::Io(e)) => Err(Error::Io(e)),
                Err(e) => Err(Error::Internal(format!("line editor: {}", e))),
            },
            LineSource::Piped(lines) => lines.next().transpose().map_err(Error::Io),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, LineSource::Terminal(_))
    }
}

/// Run until `/exit`, end of input, or an exit reply.
pub async fn run_repl(orchestrator: &mut SessionOrchestrator, input: &mut LineSource) -> Result<()> {
    let turn = orchestrator.start();
    emit(orchestrator, &turn);

    let mut handled = 0u64;
    loop {
        let turn = if orchestrator.session().voice_mode {
            match listen(orchestrator).await {
                Some(turn) => turn,
                None => continue,
            }
        } else {
            let prompt = prompt(orchestrator);
            let Some(line) = input.read(&prompt)? else {
                if input.is_terminal() {
                    println!();
                }
                break;
            };
            orchestrator.handle_line(&line).await
        };

        handled += 1;
        emit(orchestrator, &turn);
        if turn.exit {
            break;
        }
    }

    info!(turns = handled, "Session ended");
    Ok(())
}

/// One voice turn. Silence yields nothing; other recognizer failures leave
/// voice mode so the user can type.
async fn listen(orchestrator: &mut SessionOrchestrator) -> Option<Turn> {
    print!("(listening...) ");
    let _ = io::stdout().flush();

    match orchestrator.transcribe() {
        Ok(text) => {
            println!("{}", text);
            Some(orchestrator.handle_voice(&text).await)
        }
        Err(error) if error.is_silent_in_voice_mode() => {
            println!();
            debug!(error = %error, "Nothing heard");
            None
        }
        Err(error) => {
            println!();
            orchestrator.pause_voice();
            let mut turn = Turn::default();
            turn.fail(&error);
            turn.info("(Voice mode paused. Type /voice on to resume.)");
            Some(turn)
        }
    }
}

fn prompt(orchestrator: &SessionOrchestrator) -> String {
    match orchestrator.auth().identity() {
        Some(identity) => format!("{}> ", identity),
        None => "[locked] > ".to_string(),
    }
}

fn emit(orchestrator: &SessionOrchestrator, turn: &Turn) {
    if !turn.replies.is_empty() {
        println!("{}", turn.render());
    }
    orchestrator.speak(turn);
}
