//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides
//! through the `config` subcommands.

mod common;

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::TempDir;

use common::Sandbox;

/// Test fixture for configuration testing
struct ConfigFixture {
    sandbox: Sandbox,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let sandbox = Sandbox::new();
        let config_path = sandbox.path().join("config.toml");
        Self {
            sandbox,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn run(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = self.sandbox.command();
        cmd.arg("config")
            .arg(subcommand)
            .arg("--config")
            .arg(&self.config_path);
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[assistant]

[llm]
"#,
    );

    fixture.run("validate").assert().success();
}

#[test]
fn test_fixture_config_is_valid() {
    Sandbox::new()
        .command()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[assistant]
name = "Jarvis"
default_persona = "professor"
guest_persona = "guest"
history_turns = 8
require_unlock_for_chat = true
speak_limit_chars = 300

[auth]
strict_auth = false
face_autorecognize = false
allow_dev_login = true
default_identity = "Alice"
owner = "Alice"
match_threshold = 0.75
tie_margin = 0.05
enroll_samples = 5
capture_command = "face-embed --camera {camera}"

[camera]
index = 1
prefer_external = false

[voice]
voice_mode_default = false
tts_enabled_default = false
stt_command = "transcribe --max-seconds {limit}"
tts_command = "espeak"
phrase_limit_secs = 15
default_rate = 170
exit_phrases = ["stop listening"]

[llm]
provider = "openai"
base_url = "https://api.openai.com/v1"
api_key = "sk-test"
default_model = "gpt-4o-mini"
timeout_secs = 60
max_retries = 3

[calendar]
enabled = false
max_events = 5

[navigation]
open_browser = false
provider = "apple"

[logging]
level = "debug"
max_files = 3
json_format = true
"#,
    );

    fixture
        .run("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Jarvis"))
        .stdout(predicate::str::contains("gpt-4o-mini"))
        .stdout(predicate::str::contains("stop listening"))
        .stdout(predicate::str::contains("sk-test").not());
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_threshold_fixture() {
    Sandbox::new()
        .command()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(common::invalid_config_fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("match_threshold"));
}

#[test]
fn test_invalid_provider() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
provider = "carrier-pigeon"
"#,
    );

    fixture
        .run("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("carrier-pigeon"));
}

#[test]
fn test_invalid_map_provider() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[navigation]
provider = "atlas"
"#,
    );

    fixture.run("validate").assert().failure();
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "loud"
"#,
    );

    fixture
        .run("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("loud"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[assistant
name = "Broken"
"#,
    );

    fixture.run("validate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("new_config.toml");
    let sandbox = Sandbox::new();

    sandbox
        .command()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));

    assert!(config_path.exists());

    sandbox
        .command()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[assistant]\n");

    fixture
        .sandbox
        .command()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(&fixture.config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[assistant]\nname = \"OldName\"\n");

    fixture
        .sandbox
        .command()
        .arg("config")
        .arg("init")
        .arg("--path")
        .arg(&fixture.config_path)
        .arg("--force")
        .assert()
        .success();

    let content = fs::read_to_string(&fixture.config_path).unwrap();
    assert!(!content.contains("OldName"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
default_model = "from-file"
"#,
    );

    fixture
        .run("show")
        .env("COMPANION_LLM_MODEL", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"))
        .stdout(predicate::str::contains("from-file").not());
}

#[test]
fn test_env_override_invalid_value_is_validated() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[assistant]\n");

    fixture
        .run("validate")
        .env("COMPANION_MATCH_THRESHOLD", "3.0")
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────
// Path Expansion Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[storage]
data_dir = "~/companion-data"
"#,
    );

    let output = fixture.run("show").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(!stdout.contains("data_dir = \"~"));
    assert!(stdout.contains("companion-data"));
}
