//! Error types for Companion
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - A coarse category used by the REPL to decide how to present a failure
//! - User-friendly messages with suggestions
//! - Exit codes for startup failures

use std::fmt;
use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

/// Result type alias for companion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    MissingCredential = 103,
    DevLoginDisabled = 104,

    // Storage errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    StoreCorrupt = 210,

    // Authentication errors (3xx)
    NoProfiles = 300,
    NoMatch = 301,
    AmbiguousMatch = 302,
    Locked = 303,
    NotPermitted = 304,

    // Command errors (4xx)
    UnknownCommand = 400,
    InvalidArguments = 401,
    UnknownPersona = 402,
    PlaceNotFound = 403,
    CommandNotAllowed = 404,

    // External service errors (5xx)
    CameraUnavailable = 500,
    BiometricFailed = 501,
    NoAudio = 510,
    SpeechFailed = 511,
    CalendarFailed = 520,
    CalendarAuthExpired = 521,
    BackendFailed = 530,
    Timeout = 540,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse grouping of failures, independent of the concrete cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    AuthFailure,
    Command,
    ExternalService,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Storage => "storage",
            ErrorCategory::AuthFailure => "auth",
            ErrorCategory::Command => "command",
            ErrorCategory::ExternalService => "external",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// A capability needs a credential file that is not present
    #[error("No {capability} credential found at {path}")]
    MissingCredential { capability: String, path: PathBuf },

    /// Development login requested while disabled
    #[error("Development login is disabled")]
    DevLoginDisabled,

    // ─────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// A persisted store exists but cannot be decoded
    #[error("Store {path} is corrupt: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Authentication Errors
    // ─────────────────────────────────────────────────────────────

    #[error("No profiles are enrolled")]
    NoProfiles,

    /// Best candidate fell below the match threshold
    #[error("Face not recognized")]
    NoMatch { best_score: Option<f32> },

    /// Two or more candidates scored within the tie margin
    #[error("Face matched more than one profile ({})", candidates.join(", "))]
    AmbiguousMatch { candidates: Vec<String> },

    /// Operation requires an unlocked session
    #[error("{action} requires an unlocked session")]
    Locked { action: String },

    #[error("Not permitted: {message}")]
    NotPermitted { message: String },

    // ─────────────────────────────────────────────────────────────
    // Command Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Unknown command: /{name}")]
    UnknownCommand { name: String },

    #[error("Invalid arguments for /{command}. Usage: {usage}")]
    InvalidArguments { command: String, usage: String },

    #[error("Unknown persona: {id}")]
    UnknownPersona { id: String },

    #[error("No saved place named '{key}'")]
    PlaceNotFound { key: String },

    /// Command exists but the active persona does not allow it
    #[error("/{command} is not available with the {persona} persona")]
    CommandNotAllowed { command: String, persona: String },

    // ─────────────────────────────────────────────────────────────
    // External Service Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Camera unavailable: {message}")]
    CameraUnavailable { message: String },

    #[error("Biometric engine error: {message}")]
    Biometric { message: String },

    /// Transcriber returned without any speech
    #[error("No speech detected")]
    NoAudio,

    #[error("Speech error: {message}")]
    Speech { message: String },

    #[error("Calendar error: {message}")]
    Calendar { message: String },

    #[error("Calendar authorization for {identity} has expired")]
    CalendarAuthExpired { identity: String },

    #[error("Language model error: {message}")]
    Backend { message: String },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: String, timeout_secs: u64 },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::MissingCredential { .. } => ErrorCode::MissingCredential,
            Error::DevLoginDisabled => ErrorCode::DevLoginDisabled,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::StoreCorrupt { .. } => ErrorCode::StoreCorrupt,

            Error::NoProfiles => ErrorCode::NoProfiles,
            Error::NoMatch { .. } => ErrorCode::NoMatch,
            Error::AmbiguousMatch { .. } => ErrorCode::AmbiguousMatch,
            Error::Locked { .. } => ErrorCode::Locked,
            Error::NotPermitted { .. } => ErrorCode::NotPermitted,

            Error::UnknownCommand { .. } => ErrorCode::UnknownCommand,
            Error::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            Error::UnknownPersona { .. } => ErrorCode::UnknownPersona,
            Error::PlaceNotFound { .. } => ErrorCode::PlaceNotFound,
            Error::CommandNotAllowed { .. } => ErrorCode::CommandNotAllowed,

            Error::CameraUnavailable { .. } => ErrorCode::CameraUnavailable,
            Error::Biometric { .. } => ErrorCode::BiometricFailed,
            Error::NoAudio => ErrorCode::NoAudio,
            Error::Speech { .. } => ErrorCode::SpeechFailed,
            Error::Calendar { .. } => ErrorCode::CalendarFailed,
            Error::CalendarAuthExpired { .. } => ErrorCode::CalendarAuthExpired,
            Error::Backend { .. } => ErrorCode::BackendFailed,
            Error::Timeout { .. } => ErrorCode::Timeout,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code() as u16 {
            100..=199 => ErrorCategory::Configuration,
            200..=299 => ErrorCategory::Storage,
            300..=399 => ErrorCategory::AuthFailure,
            400..=499 => ErrorCategory::Command,
            500..=599 => ErrorCategory::ExternalService,
            _ => ErrorCategory::Internal,
        }
    }

    /// Broken configuration or on-disk state rather than a bad request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::StoreCorrupt { .. }
                | Error::Internal(_)
        )
    }

    /// Transient input failures the voice loop skips without a reply
    pub fn is_silent_in_voice_mode(&self) -> bool {
        matches!(self, Error::NoAudio | Error::Timeout { .. })
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'companion config init' to create a default configuration file.")
            }
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'companion config validate' to see details.",
            ),
            Error::ConfigValidation { .. } => {
                Some("Review the configuration file and fix the invalid values.")
            }
            Error::MissingCredential { .. } => {
                Some("Authorize the calendar for this identity and place the token file at the path shown.")
            }
            Error::DevLoginDisabled => Some(
                "Use /recognize, or enable auth.allow_dev_login (COMPANION_DEV_LOGIN=1) on a development machine.",
            ),
            Error::StoreCorrupt { .. } => {
                Some("Restore the file from a backup or move it aside to start with an empty store.")
            }

            Error::NoProfiles => Some("Enroll a face first with /setup_profile <Name>."),
            Error::NoMatch { .. } => Some("Face the camera in good light and try /recognize again."),
            Error::AmbiguousMatch { .. } => {
                Some("Try /recognize again, or re-enroll with /setup_profile <Name>.")
            }
            Error::Locked { .. } => Some("Unlock with /recognize first."),

            Error::UnknownCommand { .. } => Some("Type /help to list available commands."),
            Error::UnknownPersona { .. } => {
                Some("Run 'companion persona list' to see available personas.")
            }
            Error::PlaceNotFound { .. } => Some("Save it first with /setplace <key> = <address>."),

            Error::CameraUnavailable { .. } => Some(
                "Check that a camera is connected, or set camera.index / COMPANION_CAMERA_INDEX.",
            ),
            Error::CalendarAuthExpired { .. } => {
                Some("Re-authorize the calendar and replace the token file.")
            }
            Error::Backend { .. } => {
                Some("Check that the local model server is running and llm.base_url is correct.")
            }
            Error::Timeout { .. } => Some("Try again, or raise llm.timeout_secs."),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "{}: {}\n",
            format!("Error [{}]", self.code().as_str()).red(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n{}: {}\n", "Hint".yellow(), hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn locked(action: impl Into<String>) -> Self {
        Error::Locked {
            action: action.into(),
        }
    }

    pub fn invalid_arguments(command: impl Into<String>, usage: impl Into<String>) -> Self {
        Error::InvalidArguments {
            command: command.into(),
            usage: usage.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }

    pub fn calendar(message: impl Into<String>) -> Self {
        Error::Calendar {
            message: message.into(),
        }
    }

    pub fn camera_unavailable(message: impl Into<String>) -> Self {
        Error::CameraUnavailable {
            message: message.into(),
        }
    }

    pub fn speech(message: impl Into<String>) -> Self {
        Error::Speech {
            message: message.into(),
        }
    }

    pub fn store_corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::StoreCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::NoMatch.as_str(), "E301");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::StoreCorrupt.exit_code(), 20);
        assert_eq!(ErrorCode::NoMatch.exit_code(), 30);
        assert_eq!(ErrorCode::BackendFailed.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::DevLoginDisabled.category(), ErrorCategory::Configuration);
        assert_eq!(
            Error::MissingCredential {
                capability: "calendar".into(),
                path: PathBuf::from("/tmp/token.json"),
            }
            .category(),
            ErrorCategory::Configuration
        );
        assert_eq!(Error::NoMatch { best_score: None }.category(), ErrorCategory::AuthFailure);
        assert_eq!(Error::locked("/nav").category(), ErrorCategory::AuthFailure);
        assert_eq!(
            Error::PlaceNotFound { key: "home".into() }.category(),
            ErrorCategory::Command
        );
        assert_eq!(Error::NoAudio.category(), ErrorCategory::ExternalService);
        assert_eq!(
            Error::store_corrupt("/tmp/x.json", "bad").category(),
            ErrorCategory::Storage
        );
    }

    #[test]
    fn test_error_fatal() {
        assert!(Error::config_not_found("/test").is_fatal());
        assert!(Error::store_corrupt("/tmp/places.json", "eof").is_fatal());
        assert!(!Error::backend("refused").is_fatal());
        assert!(!Error::DevLoginDisabled.is_fatal());
    }

    #[test]
    fn test_ambiguous_match_lists_candidates() {
        let err = Error::AmbiguousMatch {
            candidates: vec!["Alice".into(), "Bob".into()],
        };
        assert_eq!(err.to_string(), "Face matched more than one profile (Alice, Bob)");
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::config_not_found("/test");
        assert!(err.suggestion().unwrap().contains("config init"));

        let err = Error::PlaceNotFound { key: "gym".into() };
        assert!(err.suggestion().unwrap().contains("/setplace"));
    }

    #[test]
    fn test_format_for_terminal() {
        colored::control::set_override(true);
        let formatted = Error::config_not_found("/test/config.toml").format_for_terminal();
        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let formatted = Error::UnknownCommand { name: "foo".into() }.format_for_log();
        assert_eq!(formatted, "[E400] Unknown command: /foo");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
