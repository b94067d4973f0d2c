//! Build script for Companion
//!
//! Stamps the binary with the commit it was built from, whether the tree
//! had local modifications, when it was built, and for which target.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=config/personas");

    let commit = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let dirty = match git(&["status", "--porcelain"]) {
        Some(changes) => (!changes.is_empty()).to_string(),
        None => "unknown".into(),
    };

    let stamps = [
        ("COMPANION_GIT_HASH", commit),
        ("COMPANION_GIT_DIRTY", dirty),
        (
            "COMPANION_BUILD_TIMESTAMP",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        ("COMPANION_TARGET", cargo_var("TARGET")),
        ("COMPANION_PROFILE", cargo_var("PROFILE")),
    ];
    for (key, value) in stamps {
        println!("cargo:rustc-env={}={}", key, value);
    }
}

fn cargo_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| "unknown".into())
}

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}
