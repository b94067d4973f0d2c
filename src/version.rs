//! Build information embedded by `build.rs`.

use std::fmt;

/// Compile-time facts about this binary
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Short commit hash, or "unknown" outside a checkout
    pub commit: &'static str,
    dirty: &'static str,
    pub built_at: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
}

const BUILD: BuildInfo = BuildInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    commit: env!("COMPANION_GIT_HASH"),
    dirty: env!("COMPANION_GIT_DIRTY"),
    built_at: env!("COMPANION_BUILD_TIMESTAMP"),
    target: env!("COMPANION_TARGET"),
    profile: env!("COMPANION_PROFILE"),
};

impl BuildInfo {
    pub fn is_dirty(&self) -> bool {
        self.dirty == "true"
    }

    /// e.g. "0.1.0+abc12345" or "0.1.0+abc12345.dirty"
    pub fn full_version(&self) -> String {
        let mut out = format!("{}+{}", self.version, self.commit);
        if self.is_dirty() {
            out.push_str(".dirty");
        }
        out
    }

    /// Shown in `/status`
    pub fn short_version(&self) -> String {
        format!("{} ({}, {})", self.version, self.commit, self.profile)
    }

    /// Sent with model and calendar requests
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        for (label, value) in [
            ("Version", self.version),
            ("Commit", self.commit),
            ("Built", self.built_at),
            ("Profile", self.profile),
            ("Target", self.target),
        ] {
            writeln!(f, "  {:<9} {}", format!("{}:", label), value)?;
        }
        if self.is_dirty() {
            writeln!(f, "  (built from a modified working tree)")?;
        }
        Ok(())
    }
}

pub fn build_info() -> BuildInfo {
    BUILD
}

pub fn print_version() {
    print!("{}", build_info());
}
