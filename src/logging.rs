//! Logging infrastructure using tracing + tracing-subscriber
//!
//! Console output goes to stderr so the REPL's stdout carries only the
//! conversation. Each layer has its own filter: the console follows the
//! configured level and `-v`/`-q`, while the optional rolling log file also
//! keeps the `audit` target (unlock, lock, dev login, calendar grants) at
//! info no matter how quiet the console is.

use std::fs;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

/// Target carrying security-relevant session events
pub const AUDIT_TARGET: &str = "audit";

/// Dependencies that are chatty below warn
const QUIET_CRATES: &[&str] = &["hyper", "reqwest", "rustls", "rustyline"];

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the file writer flushing until dropped at exit.
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system
///
/// Returns guards that must be kept alive for the duration of the program.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let level = determine_level(settings, verbose, quiet);
    let console = console_layer(settings.json_format).with_filter(build_filter(level, false));

    let (file, file_guard) = match settings.file {
        Some(ref log_file) => {
            let (layer, guard) = file_layer(Path::new(log_file), settings.max_files, settings.json_format)?;
            (Some(layer.with_filter(build_filter(level, true))), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(
        level = %level,
        file = ?settings.file,
        json = settings.json_format,
        "Logging initialized"
    );

    Ok(LogGuards {
        _file_guard: file_guard,
    })
}

/// Stderr-only setup for the non-interactive subcommands
pub fn init_simple(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(console_layer(false).with_filter(build_filter(level, false)))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}

/// `-q` wins over `-v`; otherwise each `-v` lowers the level one step
fn determine_level(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => parse_level(&settings.level),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn parse_level(level: &str) -> Level {
    level
        .trim()
        .to_lowercase()
        .replace("warning", "warn")
        .parse()
        .unwrap_or(Level::WARN)
}

/// Filter for one layer. RUST_LOG replaces the computed base level.
fn build_filter(level: Level, keep_audit: bool) -> EnvFilter {
    let base = level.to_string().to_lowercase();
    let mut directives: Vec<String> = QUIET_CRATES.iter().map(|c| format!("{}=warn", c)).collect();
    if keep_audit && level < Level::INFO {
        directives.push(format!("{}=info", AUDIT_TARGET));
    }

    directives
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base)),
            EnvFilter::add_directive,
        )
}

fn console_layer<S>(json: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    if json {
        layer.json().boxed()
    } else {
        layer.compact().boxed()
    }
}

/// Daily-rotated file next to `path`, named after its stem
fn file_layer<S>(path: &Path, max_files: u32, json: bool) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory).map_err(|e| Error::IoWrite {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let prefix = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("companion");
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_files.max(1) as usize)
        .build(directory)
        .map_err(|e| Error::config_field_invalid("logging.file", e.to_string()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
    let layer = if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    };
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level(" error "), Level::ERROR);
        assert_eq!(parse_level("shouting"), Level::WARN);
    }

    #[test]
    fn test_determine_level_flags() {
        let settings = LoggingSettings::default();
        assert_eq!(determine_level(&settings, 0, false), Level::WARN);
        assert_eq!(determine_level(&settings, 1, false), Level::DEBUG);
        assert_eq!(determine_level(&settings, 2, false), Level::TRACE);
        assert_eq!(determine_level(&settings, 2, true), Level::ERROR);
    }

    #[test]
    fn test_file_filter_keeps_audit() {
        let file = build_filter(Level::WARN, true).to_string();
        assert!(file.contains("audit=info"));

        let console = build_filter(Level::WARN, false).to_string();
        assert!(!console.contains("audit"));
    }

    #[test]
    fn test_file_layer_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("logs").join("companion.log");

        let result = file_layer::<tracing_subscriber::Registry>(&log_path, 3, false);

        assert!(result.is_ok());
        assert!(temp_dir.path().join("logs").is_dir());
    }
}
