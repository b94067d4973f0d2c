//! Persona registry: bundled TOML definitions plus user overrides.
//!
//! Bundled personas are compiled in. A `personas/` directory under the data
//! dir may add new personas or replace bundled ones by id.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::PersonaDefinition;

const BUNDLED: &[(&str, &str)] = &[
    ("casual", include_str!("../../config/personas/casual.toml")),
    ("professor", include_str!("../../config/personas/professor.toml")),
    ("guest", include_str!("../../config/personas/guest.toml")),
];

/// Read-only lookup of persona definitions, in display order.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<PersonaDefinition>,
}

impl PersonaRegistry {
    /// Registry with only the compiled-in personas.
    pub fn bundled() -> Result<Self> {
        let personas = BUNDLED
            .iter()
            .map(|(name, source)| PersonaDefinition::from_toml(source, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { personas })
    }

    /// Bundled personas overlaid with `*.toml` files from `overrides_dir`.
    pub fn load(overrides_dir: &Path) -> Result<Self> {
        let mut registry = Self::bundled()?;
        if !overrides_dir.is_dir() {
            debug!(path = %overrides_dir.display(), "No persona overrides directory");
            return Ok(registry);
        }

        let mut paths: Vec<_> = fs::read_dir(overrides_dir)
            .map_err(|e| Error::IoRead {
                path: overrides_dir.to_path_buf(),
                source: e,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let source = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            let persona = PersonaDefinition::from_toml(&source, &path.display().to_string())?;
            info!(persona = %persona.id, path = %path.display(), "Loaded persona override");
            registry.insert(persona);
        }

        Ok(registry)
    }

    /// Add a persona, replacing any existing one with the same id.
    pub fn insert(&mut self, persona: PersonaDefinition) {
        match self.personas.iter_mut().find(|p| p.id == persona.id) {
            Some(existing) => *existing = persona,
            None => self.personas.push(persona),
        }
    }

    /// Case-insensitive lookup by id or display name.
    pub fn get(&self, id: &str) -> Option<&PersonaDefinition> {
        let id = id.trim();
        self.personas
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id) || p.display_name.eq_ignore_ascii_case(id))
    }

    pub fn resolve(&self, id: &str) -> Result<&PersonaDefinition> {
        self.get(id).ok_or_else(|| Error::UnknownPersona { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonaDefinition> {
        self.personas.iter()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Next persona after `current` that is usable in the given lock state,
    /// wrapping around. None when no other persona qualifies.
    pub fn next_after(&self, current: &str, unlocked: bool) -> Option<&PersonaDefinition> {
        let start = self.personas.iter().position(|p| p.id == current).unwrap_or(0);
        (1..self.personas.len())
            .map(|offset| &self.personas[(start + offset) % self.personas.len()])
            .find(|p| unlocked || !p.requires_unlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_all_bundled_personas_parse() {
        let registry = PersonaRegistry::bundled().unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("casual"));
        assert!(registry.contains("Professor"));
        assert!(!registry.get("guest").unwrap().requires_unlock);
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = PersonaRegistry::bundled().unwrap();
        let err = registry.resolve("pirate").unwrap_err();
        assert!(matches!(err, Error::UnknownPersona { ref id } if id == "pirate"));
    }

    #[test]
    fn test_next_after_cycles_unlocked() {
        let registry = PersonaRegistry::bundled().unwrap();
        assert_eq!(registry.next_after("casual", true).unwrap().id, "professor");
        assert_eq!(registry.next_after("professor", true).unwrap().id, "guest");
        assert_eq!(registry.next_after("guest", true).unwrap().id, "casual");
    }

    #[test]
    fn test_next_after_locked_skips_private_personas() {
        let registry = PersonaRegistry::bundled().unwrap();
        assert_eq!(registry.next_after("casual", false).unwrap().id, "guest");
        assert!(registry.next_after("guest", false).is_none());
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("casual.toml"),
            "id = \"casual\"\ndisplay_name = \"Chill\"\nsystem_prompt = \"Relax.\"\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("coach.toml"),
            "id = \"coach\"\ndisplay_name = \"Coach\"\nsystem_prompt = \"Motivate.\"\n",
        )
        .unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let registry = PersonaRegistry::load(tmp.path()).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("casual").unwrap().display_name, "Chill");
        assert_eq!(registry.iter().last().unwrap().id, "coach");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("broken.toml"), "id = 3").unwrap();
        assert!(PersonaRegistry::load(tmp.path()).is_err());
    }

    #[test]
    fn test_missing_override_dir_is_fine() {
        let tmp = TempDir::new().unwrap();
        let registry = PersonaRegistry::load(&tmp.path().join("absent")).unwrap();
        assert_eq!(registry.len(), 3);
    }
}
