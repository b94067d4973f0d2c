//! Configuration system for Companion
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (COMPANION_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Main assistant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Assistant identity and conversation settings
    pub assistant: AssistantSettings,

    /// Face-gated authentication
    pub auth: AuthSettings,

    /// Camera selection
    pub camera: CameraSettings,

    /// Speech input and output
    pub voice: VoiceSettings,

    /// Language-model backend
    pub llm: LlmSettings,

    /// Calendar integration
    pub calendar: CalendarSettings,

    /// Map links for /nav
    pub navigation: NavigationSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Data storage paths
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// Name shown in the banner and prompt
    pub name: String,

    /// Persona used after unlocking when the identity has no preference
    pub default_persona: String,

    /// Persona used while the session is locked
    pub guest_persona: String,

    /// Number of user/assistant exchanges kept in the conversation
    pub history_turns: usize,

    /// Refuse free-form conversation until unlocked
    pub require_unlock_for_chat: bool,

    /// Spoken replies are cut at this many characters
    pub speak_limit_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Require a biometric match before unlocking
    pub strict_auth: bool,

    /// Try to recognize the user once at startup
    pub face_autorecognize: bool,

    /// Allow `/login <Name>` without a biometric match (development only)
    pub allow_dev_login: bool,

    /// Identity used by non-strict unlocks when nothing better is known
    pub default_identity: String,

    /// Only this identity may grant or revoke calendar access (unset = any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Minimum similarity (0.0-1.0) for a match
    pub match_threshold: f32,

    /// Two candidates closer than this are ambiguous
    pub tie_margin: f32,

    /// Samples captured by /setup_profile
    pub enroll_samples: u32,

    /// External helper that prints a face embedding as a JSON array
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Camera device index (-1 = auto)
    pub index: i32,

    /// Prefer an external camera when auto-selecting
    pub prefer_external: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Start in voice mode after unlocking when a transcriber is available
    pub voice_mode_default: bool,

    /// Speak replies by default
    pub tts_enabled_default: bool,

    /// Path to the offline speech-recognition model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_model_path: Option<String>,

    /// Transcriber command; prints one utterance on stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_command: Option<String>,

    /// Speech synthesizer command (unset = autodetect `say` or `espeak`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_command: Option<String>,

    /// Longest phrase the transcriber records, in seconds
    pub phrase_limit_secs: u64,

    /// Trailing silence that ends a phrase, in seconds
    pub end_silence_secs: f32,

    /// Minimum listening time before silence may end a phrase, in seconds
    pub min_listen_secs: f32,

    /// Default speaking rate in words per minute
    pub default_rate: u32,

    /// Phrases that pause voice mode
    pub exit_phrases: Vec<String>,
}

/// OpenAI-compatible chat backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend provider: "openai" (any compatible server) or "echo"
    pub provider: String,

    /// API base URL (e.g., "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model used until /model selects another
    pub default_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    pub max_retries: u32,

    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub enabled: bool,

    /// Calendar API base URL
    pub base_url: String,

    /// Maximum events listed per query
    pub max_events: u32,

    /// Calendar permission for identities without an explicit grant
    pub default_access: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationSettings {
    /// Open the directions link in the system browser
    pub open_browser: bool,

    /// Map provider: "auto", "google" or "apple"
    pub provider: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base data directory for profiles, places and preferences
    pub data_dir: String,
}

// Default implementations

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            name: "Companion".to_string(),
            default_persona: "casual".to_string(),
            guest_persona: "guest".to_string(),
            history_turns: 20,
            require_unlock_for_chat: false,
            speak_limit_chars: 600,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            strict_auth: true,
            face_autorecognize: true,
            allow_dev_login: false,
            default_identity: "owner".to_string(),
            owner: None,
            match_threshold: 0.80,
            tie_margin: 0.02,
            enroll_samples: 10,
            capture_command: None,
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: -1,
            prefer_external: true,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_mode_default: true,
            tts_enabled_default: true,
            offline_model_path: None,
            stt_command: None,
            tts_command: None,
            phrase_limit_secs: 30,
            end_silence_secs: 2.0,
            min_listen_secs: 0.8,
            default_rate: 185,
            exit_phrases: ["exit", "quit", "goodbye", "bye", "stop", "pause"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: String::new(),
            default_model: "llama3.2:1b".to_string(),
            timeout_secs: 120,
            max_retries: 2,
            temperature: 0.7,
        }
    }
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            max_events: 10,
            default_access: true,
            timeout_secs: 20,
        }
    }
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            open_browser: true,
            provider: "auto".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.companion".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a single TOML file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from("companion.toml"),
            dirs::config_dir()
                .map(|p| p.join("companion").join("companion.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".companion").join("companion.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if path.is_file() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Assistant settings
        if let Ok(val) = std::env::var("COMPANION_ASSISTANT_NAME") {
            self.assistant.name = val;
        }
        if let Ok(val) = std::env::var("COMPANION_PERSONA") {
            self.assistant.default_persona = val;
        }
        if let Ok(val) = std::env::var("COMPANION_HISTORY_TURNS") {
            if let Ok(n) = val.parse() {
                self.assistant.history_turns = n;
            }
        }
        if let Ok(val) = std::env::var("COMPANION_REQUIRE_UNLOCK_FOR_CHAT") {
            self.assistant.require_unlock_for_chat = parse_flag(&val);
        }

        // Auth settings
        if let Ok(val) = std::env::var("COMPANION_STRICT_AUTH") {
            self.auth.strict_auth = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("COMPANION_FACE_AUTORECOGNIZE") {
            self.auth.face_autorecognize = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("COMPANION_DEV_LOGIN") {
            self.auth.allow_dev_login = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("COMPANION_DEFAULT_IDENTITY") {
            self.auth.default_identity = val;
        }
        if let Ok(val) = std::env::var("COMPANION_OWNER") {
            self.auth.owner = Some(val);
        }
        if let Ok(val) = std::env::var("COMPANION_MATCH_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.auth.match_threshold = n;
            }
        }
        if let Ok(val) = std::env::var("COMPANION_CAPTURE_COMMAND") {
            self.auth.capture_command = Some(val);
        }

        // Camera settings
        if let Ok(val) = std::env::var("COMPANION_CAMERA_INDEX") {
            if let Ok(n) = val.parse() {
                self.camera.index = n;
            }
        }
        if let Ok(val) = std::env::var("COMPANION_PREFER_EXTERNAL") {
            self.camera.prefer_external = parse_flag(&val);
        }

        // Voice settings
        if let Ok(val) = std::env::var("COMPANION_VOICE_MODE") {
            self.voice.voice_mode_default = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("COMPANION_TTS") {
            self.voice.tts_enabled_default = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("COMPANION_SPEECH_MODEL_PATH") {
            self.voice.offline_model_path = Some(val);
        }
        if let Ok(val) = std::env::var("COMPANION_STT_COMMAND") {
            self.voice.stt_command = Some(val);
        }
        if let Ok(val) = std::env::var("COMPANION_TTS_COMMAND") {
            self.voice.tts_command = Some(val);
        }
        if let Ok(val) = std::env::var("COMPANION_VOICE_PHRASE_LIMIT") {
            if let Ok(n) = val.parse() {
                self.voice.phrase_limit_secs = n;
            }
        }

        // LLM settings
        if let Ok(val) = std::env::var("COMPANION_LLM_PROVIDER") {
            self.llm.provider = val;
        }
        if let Ok(val) = std::env::var("COMPANION_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("COMPANION_LLM_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("COMPANION_LLM_MODEL") {
            self.llm.default_model = val;
        }
        if let Ok(val) = std::env::var("COMPANION_LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.llm.timeout_secs = n;
            }
        }

        // Calendar and navigation
        if let Ok(val) = std::env::var("COMPANION_CALENDAR_ENABLED") {
            self.calendar.enabled = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("COMPANION_NAV_OPEN_BROWSER") {
            self.navigation.open_browser = parse_flag(&val);
        }

        // Logging settings
        if let Ok(val) = std::env::var("COMPANION_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("COMPANION_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("COMPANION_LOG_JSON") {
            self.logging.json_format = parse_flag(&val);
        }

        // Storage settings
        if let Ok(val) = std::env::var("COMPANION_DATA_DIR") {
            self.storage.data_dir = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
        if let Some(ref model) = self.voice.offline_model_path {
            self.voice.offline_model_path = Some(expand_path(model));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.assistant.default_persona.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "assistant.default_persona",
                "default persona cannot be empty",
            ));
        }
        if self.assistant.history_turns == 0 {
            return Err(Error::config_field_invalid(
                "assistant.history_turns",
                "history_turns must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.auth.match_threshold) {
            return Err(Error::config_field_invalid(
                "auth.match_threshold",
                "match_threshold must be between 0.0 and 1.0",
            ));
        }
        if !(0.0..1.0).contains(&self.auth.tie_margin) {
            return Err(Error::config_field_invalid(
                "auth.tie_margin",
                "tie_margin must be at least 0.0 and below 1.0",
            ));
        }
        if self.auth.enroll_samples == 0 {
            return Err(Error::config_field_invalid(
                "auth.enroll_samples",
                "enroll_samples must be at least 1",
            ));
        }
        if self.auth.default_identity.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "auth.default_identity",
                "default identity cannot be empty",
            ));
        }

        if self.camera.index < -1 {
            return Err(Error::config_field_invalid(
                "camera.index",
                "camera index must be -1 (auto) or a device number",
            ));
        }

        let providers = ["openai", "echo"];
        if !providers.contains(&self.llm.provider.as_str()) {
            return Err(Error::config_field_invalid(
                "llm.provider",
                format!(
                    "Invalid provider '{}'. Must be one of: {}",
                    self.llm.provider,
                    providers.join(", ")
                ),
            ));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(Error::config_field_invalid(
                "llm.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        let map_providers = ["auto", "google", "apple"];
        if !map_providers.contains(&self.navigation.provider.as_str()) {
            return Err(Error::config_field_invalid(
                "navigation.provider",
                format!(
                    "Invalid map provider '{}'. Must be one of: {}",
                    self.navigation.provider,
                    map_providers.join(", ")
                ),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Camera index, or None for automatic selection
    pub fn camera_index(&self) -> Option<u32> {
        u32::try_from(self.camera.index).ok()
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir().join("profiles.json")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir().join("templates")
    }

    pub fn places_dir(&self) -> PathBuf {
        self.data_dir().join("places")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir().join("preferences.json")
    }

    /// User persona overrides
    pub fn personas_dir(&self) -> PathBuf {
        self.data_dir().join("personas")
    }

    /// Per-identity calendar tokens
    pub fn calendar_dir(&self) -> PathBuf {
        self.data_dir().join("calendar")
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location for a new configuration file
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".companion")
        .join("companion.toml")
}

/// Initialize a new configuration file and return its path
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Companion Configuration

[assistant]
# Name shown in the banner and prompt
name = "Companion"

# Persona used after unlocking when the identity has no saved preference
default_persona = "casual"

# Persona used while the session is locked
guest_persona = "guest"

# Number of user/assistant exchanges kept in the conversation
history_turns = 20

# Refuse free-form conversation until unlocked
require_unlock_for_chat = false

# Spoken replies are cut at this many characters
speak_limit_chars = 600

[auth]
# Require a face match before unlocking
strict_auth = true

# Try to recognize the user once at startup
face_autorecognize = true

# Allow /login <Name> without a face match (development machines only)
allow_dev_login = false

# Identity used by non-strict unlocks when nothing better is known
default_identity = "owner"

# Only this identity may grant or revoke calendar access
# owner = "Alice"

# Minimum similarity (0.0-1.0) for a match
match_threshold = 0.80

# Two candidates closer than this are ambiguous
tie_margin = 0.02

# Samples captured by /setup_profile
enroll_samples = 10

# Helper that prints one face embedding as a JSON array; {camera} is replaced
# capture_command = "face-embed --camera {camera}"

[camera]
# Camera device index (-1 = auto)
index = -1

# Prefer an external camera when auto-selecting
prefer_external = true

[voice]
# Start in voice mode after unlocking when a transcriber is available
voice_mode_default = true

# Speak replies by default
tts_enabled_default = true

# Offline speech-recognition model
# offline_model_path = "~/.companion/models/vosk-model-small-en-us"

# Transcriber command; {model} and {limit} are replaced
# stt_command = "transcribe --model {model} --max-seconds {limit}"

# Speech synthesizer (unset = autodetect say or espeak)
# tts_command = "espeak"

phrase_limit_secs = 30
end_silence_secs = 2.0
min_listen_secs = 0.8
default_rate = 185

# Phrases that pause voice mode
exit_phrases = ["exit", "quit", "goodbye", "bye", "stop", "pause"]

[llm]
# Backend provider: "openai" (OpenAI, Ollama, vLLM, LM Studio, ...) or "echo"
provider = "openai"

# API base URL
base_url = "http://localhost:11434/v1"

# API key (leave empty for local servers like Ollama)
api_key = ""

# Model used until /model selects another
default_model = "llama3.2:1b"

# Request timeout in seconds
timeout_secs = 120

# Maximum retries on transient failures
max_retries = 2

temperature = 0.7

[calendar]
enabled = true
base_url = "https://www.googleapis.com/calendar/v3"
max_events = 10

# Calendar permission for identities without an explicit grant
default_access = true

timeout_secs = 20

[navigation]
# Open the directions link in the system browser
open_browser = true

# Map provider: auto, google, apple
provider = "auto"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (comment out to disable file logging)
# file = "~/.companion/logs/companion.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[storage]
# Profiles, templates, places and preferences live here
data_dir = "~/.companion"
"#
    .to_string()
}
