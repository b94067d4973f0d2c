//! Persona system: data-driven assistant personalities.
//!
//! Each persona sets the system prompt and style guide sent to the language
//! model, whether it may be used while the session is locked, and which REPL
//! commands it exposes.

pub mod registry;
pub mod types;

pub use registry::PersonaRegistry;
pub use types::PersonaDefinition;
