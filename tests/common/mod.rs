//! Common test utilities and fixtures
//!
//! Every test runs the binary inside its own sandbox: a temporary HOME, a
//! data directory under it, and the offline fixture configuration.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// Isolated home and data directory for one test.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.path().join("data")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("companion.toml")
    }

    /// Write the offline fixture config, with `extra` appended. `extra` may
    /// only add tables the fixture does not define; use env overrides otherwise.
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let base = fs::read_to_string(valid_config_fixture()).unwrap();
        let content = format!(
            "{}\n[storage]\ndata_dir = '{}'\n\n{}\n",
            base,
            self.data_dir().display(),
            extra
        );
        fs::write(self.config_path(), content).unwrap();
        self.config_path()
    }

    /// The binary with a clean environment pointed at this sandbox.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("companion").unwrap();
        for (key, _) in std::env::vars() {
            if key.starts_with("COMPANION_") {
                cmd.env_remove(key);
            }
        }
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env("NO_COLOR", "1");
        cmd
    }

    /// `command()` with `--config` set to this sandbox's config file.
    pub fn configured(&self) -> Command {
        if !self.config_path().exists() {
            self.write_config("");
        }
        let mut cmd = self.command();
        cmd.arg("--config").arg(self.config_path());
        cmd
    }

    /// Run a session fed with `lines` on stdin.
    pub fn session(&self, lines: &[&str]) -> assert_cmd::assert::Assert {
        let mut input = lines.join("\n");
        input.push('\n');
        self.configured().arg("run").write_stdin(input).assert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_exist() {
        assert!(valid_config_fixture().exists());
        assert!(invalid_config_fixture().exists());
    }
}
