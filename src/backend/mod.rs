//! Language-model backends
//!
//! The session talks to one ConversationBackend: an OpenAI-compatible HTTP
//! server in normal use, or the echo backend offline.

mod conversation;
mod echo;
mod openai;
mod registry;
mod traits;

pub use conversation::Conversation;
pub use echo::EchoBackend;
#[cfg(test)]
pub use echo::EchoConfig;
pub use openai::OpenAiBackend;
pub use registry::create_backend;
pub use traits::*;
