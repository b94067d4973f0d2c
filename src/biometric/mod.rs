//! Face biometrics
//!
//! The engine turns camera frames into fixed-length embeddings (through an
//! external helper), packs enrollment samples into opaque templates, and
//! scores a live sample against every enrolled template. Feature extraction
//! is entirely the helper's business.

mod embedding;
mod template;

pub use embedding::{CommandSource, EmbeddingEngine, SampleSource};
pub use template::{decode_template, encode_template};

use crate::error::Result;

/// One captured face embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub embedding: Vec<f32>,
}

impl Sample {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self { embedding }
    }
}

/// Similarity of a live sample to one enrolled profile.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub name: String,
    /// Higher is more similar; 1.0 is identical
    pub score: f32,
}

pub trait BiometricEngine: Send {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Grab one sample from the camera.
    fn capture(&mut self) -> Result<Sample>;

    /// Build an opaque template from enrollment samples.
    fn enroll(&self, samples: &[Sample]) -> Result<Vec<u8>>;

    /// Score `sample` against each `(name, template)`; best first.
    fn score(&self, sample: &Sample, templates: &[(String, Vec<u8>)]) -> Result<Vec<MatchCandidate>>;
}
