//! Authentication gate
//!
//! Wraps the biometric engine in a two-state machine. The identity lives
//! inside `LockState::Unlocked`, so a locked session can never carry one.
//!
//! Every transition and every development-login attempt is logged on the
//! `audit` target. Templates and scores below threshold are never logged.

use std::fmt;

use tracing::{info, warn};

use crate::biometric::{BiometricEngine, MatchCandidate, Sample};
use crate::config::AuthSettings;
use crate::error::{Error, Result};
use crate::logging::AUDIT_TARGET;
use crate::store::{ProfileEntry, ProfileStore};

/// How the current identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Face matched an enrolled profile
    Biometric,
    /// Non-strict mode accepted the user without a match
    Trusted,
    /// Development login
    DevLogin,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentitySource::Biometric => write!(f, "face"),
            IdentitySource::Trusted => write!(f, "trusted"),
            IdentitySource::DevLogin => write!(f, "dev-login"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked {
        identity: String,
        source: IdentitySource,
    },
}

/// Decision parameters taken from `[auth]`.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub strict: bool,
    pub allow_dev_login: bool,
    pub default_identity: String,
    pub match_threshold: f32,
    pub tie_margin: f32,
    pub enroll_samples: u32,
}

impl From<&AuthSettings> for AuthPolicy {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            strict: settings.strict_auth,
            allow_dev_login: settings.allow_dev_login,
            default_identity: settings.default_identity.clone(),
            match_threshold: settings.match_threshold,
            tie_margin: settings.tie_margin,
            enroll_samples: settings.enroll_samples,
        }
    }
}

pub struct AuthGate {
    engine: Box<dyn BiometricEngine>,
    policy: AuthPolicy,
    state: LockState,
}

impl AuthGate {
    pub fn new(engine: Box<dyn BiometricEngine>, policy: AuthPolicy) -> Self {
        Self {
            engine,
            policy,
            state: LockState::Locked,
        }
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn identity(&self) -> Option<&str> {
        match self.state {
            LockState::Unlocked { ref identity, .. } => Some(identity),
            LockState::Locked => None,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, LockState::Unlocked { .. })
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    /// Capture a face and try to unlock.
    ///
    /// In strict mode the sample must match exactly one profile above the
    /// threshold; any failure leaves the state untouched. Otherwise the call
    /// always unlocks, preferring a match, then `fallback`, then the
    /// configured default identity.
    pub fn attempt_unlock(&mut self, profiles: &ProfileStore, fallback: Option<&str>) -> Result<&str> {
        if !self.policy.strict {
            let matched = if profiles.is_empty() {
                None
            } else {
                self.engine
                    .capture()
                    .and_then(|sample| self.best_match(&sample, profiles))
                    .ok()
            };
            return Ok(match matched {
                Some(identity) => self.unlock(identity, IdentitySource::Biometric),
                None => {
                    let identity = fallback
                        .unwrap_or(self.policy.default_identity.as_str())
                        .to_string();
                    self.unlock(identity, IdentitySource::Trusted)
                }
            });
        }

        if profiles.is_empty() {
            return Err(Error::NoProfiles);
        }
        let sample = self.engine.capture()?;
        let identity = self.best_match(&sample, profiles)?;
        Ok(self.unlock(identity, IdentitySource::Biometric))
    }

    /// Apply the threshold and tie rules to a live sample.
    pub fn best_match(&self, sample: &Sample, profiles: &ProfileStore) -> Result<String> {
        let templates = profiles.load_templates()?;
        let candidates = self.engine.score(sample, &templates)?;
        decide(&candidates, self.policy.match_threshold, self.policy.tie_margin)
    }

    /// Capture enrollment samples and store a template for `name`.
    ///
    /// The lock state is not changed; enrolling does not log anyone in.
    pub fn enroll(&mut self, name: &str, profiles: &mut ProfileStore) -> Result<ProfileEntry> {
        let count = self.policy.enroll_samples.max(1);
        let samples = (0..count)
            .map(|_| self.engine.capture())
            .collect::<Result<Vec<_>>>()?;
        let template = self.engine.enroll(&samples)?;
        profiles.upsert(name, &template, count).cloned()
    }

    /// Development login without a biometric match. Fails closed.
    ///
    /// Any name is accepted so a fresh machine can be used before anyone
    /// enrolls; an enrolled profile keeps its stored casing.
    pub fn bypass(&mut self, name: &str, profiles: &ProfileStore) -> Result<&str> {
        if !self.policy.allow_dev_login {
            warn!(target: AUDIT_TARGET, requested = %name, accepted = false, "Development login refused");
            return Err(Error::DevLoginDisabled);
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_arguments("login", "/login <Name>"));
        }
        let (identity, enrolled) = match profiles.get(name) {
            Some(entry) => (entry.name.clone(), true),
            None => (name.to_string(), false),
        };

        warn!(target: AUDIT_TARGET, identity = %identity, enrolled, accepted = true, "Development login used");
        Ok(self.unlock(identity, IdentitySource::DevLogin))
    }

    pub fn lock(&mut self) {
        if let LockState::Unlocked { ref identity, .. } = self.state {
            info!(target: AUDIT_TARGET, identity = %identity, "Session locked");
        }
        self.state = LockState::Locked;
    }

    fn unlock(&mut self, identity: String, source: IdentitySource) -> &str {
        info!(target: AUDIT_TARGET, identity = %identity, source = %source, "Session unlocked");
        self.state = LockState::Unlocked { identity, source };
        self.identity().unwrap_or_default()
    }
}

/// Pick the single candidate at or above `threshold`, or explain why not.
///
/// A rival within `tie_margin` of the best, or level with it, is ambiguous.
fn decide(candidates: &[MatchCandidate], threshold: f32, tie_margin: f32) -> Result<String> {
    let best = match candidates.first() {
        Some(best) if best.score >= threshold => best,
        best => {
            return Err(Error::NoMatch {
                best_score: best.map(|c| c.score),
            })
        }
    };

    let rivals: Vec<String> = candidates
        .iter()
        .skip(1)
        .filter(|c| c.score >= threshold && best.score - c.score <= tie_margin)
        .map(|c| c.name.clone())
        .collect();
    if !rivals.is_empty() {
        let mut names = vec![best.name.clone()];
        names.extend(rivals);
        return Err(Error::AmbiguousMatch { candidates: names });
    }

    Ok(best.name.clone())
}
