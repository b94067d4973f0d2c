//! External helper commands.
//!
//! Camera capture, transcription and speech synthesis are delegated to small
//! programs configured as command lines with `{placeholder}` arguments.

use std::process::{Command, Output, Stdio};

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A configured command line, split on whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build a `Command` with `{key}` placeholders substituted in every argument.
    pub fn render(&self, vars: &[(&str, String)]) -> Command {
        let mut command = Command::new(&self.program);
        for arg in &self.args {
            let mut rendered = arg.clone();
            for (key, value) in vars {
                rendered = rendered.replace(&format!("{{{}}}", key), value);
            }
            command.arg(rendered);
        }
        command
    }

    /// Run to completion and return stdout; a non-zero exit is an error.
    pub fn run(&self, vars: &[(&str, String)]) -> std::result::Result<String, String> {
        let mut command = self.render(vars);
        command.stdin(Stdio::null());
        let output = execute(&mut command, &self.program)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Run a prepared command, capturing output.
pub fn execute(command: &mut Command, program: &str) -> std::result::Result<Output, String> {
    trace!(program, "Running helper");
    let output = command
        .output()
        .map_err(|e| format!("failed to run '{}': {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(program, status = %output.status, "Helper failed");
        return Err(format!(
            "'{}' exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        ));
    }
    Ok(output)
}

/// Whether `program` resolves to a file on PATH (or is a path that exists).
pub fn on_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return std::path::Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Spawn without waiting; used for opening URLs in the browser.
pub fn spawn_detached(program: &str, args: &[&str]) -> Result<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| Error::Internal(format!("failed to launch {}: {}", program, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let template = CommandTemplate::parse("face-embed --camera {camera}  --fast").unwrap();
        assert_eq!(template.program(), "face-embed");

        let command = template.render(&[("camera", "2".to_string())]);
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["--camera", "2", "--fast"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(CommandTemplate::parse("   ").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout() {
        let template = CommandTemplate::parse("echo hello {who}").unwrap();
        let out = template.run(&[("who", "world".to_string())]).unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[test]
    fn test_run_missing_program() {
        let template = CommandTemplate::parse("definitely-not-a-real-program-xyz").unwrap();
        let err = template.run(&[]).unwrap_err();
        assert!(err.contains("failed to run"));
    }

    #[cfg(unix)]
    #[test]
    fn test_on_path() {
        assert!(on_path("sh"));
        assert!(!on_path("definitely-not-a-real-program-xyz"));
    }
}
