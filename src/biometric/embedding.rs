//! Cosine-similarity engine over helper-provided embeddings.

use tracing::debug;

use crate::error::{Error, Result};
use crate::process::CommandTemplate;

use super::{decode_template, encode_template, BiometricEngine, MatchCandidate, Sample};

/// Where raw embeddings come from.
pub trait SampleSource: Send {
    fn capture(&mut self) -> Result<Vec<f32>>;
}

/// Runs the configured capture helper, which prints one JSON array.
///
/// `{camera}` is replaced by the device index or `auto`, and `{prefer}` by
/// `external` or `builtin`.
pub struct CommandSource {
    command: Option<CommandTemplate>,
    camera: Option<u32>,
    prefer_external: bool,
}

impl CommandSource {
    pub fn new(command: Option<&str>, camera: Option<u32>, prefer_external: bool) -> Self {
        Self {
            command: command.and_then(CommandTemplate::parse),
            camera,
            prefer_external,
        }
    }
}

impl SampleSource for CommandSource {
    fn capture(&mut self) -> Result<Vec<f32>> {
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| Error::camera_unavailable("no capture command configured"))?;

        let vars = [
            (
                "camera",
                self.camera
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "auto".to_string()),
            ),
            (
                "prefer",
                if self.prefer_external { "external" } else { "builtin" }.to_string(),
            ),
        ];
        let stdout = command.run(&vars).map_err(Error::camera_unavailable)?;

        let embedding: Vec<f32> = serde_json::from_str(stdout.trim()).map_err(|e| Error::Biometric {
            message: format!("capture helper printed an invalid embedding: {}", e),
        })?;
        if embedding.is_empty() {
            return Err(Error::Biometric {
                message: "capture helper found no face".to_string(),
            });
        }
        Ok(embedding)
    }
}

/// Scores each profile by the mean of its `top_k` best sample similarities.
pub struct EmbeddingEngine {
    source: Box<dyn SampleSource>,
    top_k: usize,
}

impl EmbeddingEngine {
    pub fn new(source: Box<dyn SampleSource>) -> Self {
        Self { source, top_k: 3 }
    }

    #[cfg(test)]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    fn profile_score(&self, sample: &[f32], template: &[u8]) -> Result<f32> {
        let mut similarities: Vec<f32> = decode_template(template)?
            .iter()
            .filter(|stored| stored.len() == sample.len())
            .map(|stored| cosine_similarity(sample, stored))
            .collect();
        if similarities.is_empty() {
            return Ok(0.0);
        }

        similarities.sort_by(|a, b| b.total_cmp(a));
        let k = self.top_k.min(similarities.len());
        Ok(similarities[..k].iter().sum::<f32>() / k as f32)
    }
}

impl BiometricEngine for EmbeddingEngine {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn capture(&mut self) -> Result<Sample> {
        self.source.capture().map(Sample::new)
    }

    fn enroll(&self, samples: &[Sample]) -> Result<Vec<u8>> {
        let embeddings: Vec<Vec<f32>> = samples.iter().map(|s| s.embedding.clone()).collect();
        encode_template(&embeddings)
    }

    fn score(&self, sample: &Sample, templates: &[(String, Vec<u8>)]) -> Result<Vec<MatchCandidate>> {
        let mut candidates = templates
            .iter()
            .map(|(name, template)| {
                Ok(MatchCandidate {
                    name: name.clone(),
                    score: self.profile_score(&sample.embedding, template)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!(
            engine = self.name(),
            profiles = candidates.len(),
            best = candidates.first().map(|c| c.score),
            "Scored sample"
        );
        Ok(candidates)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::testing::ScriptedSource;

    fn engine() -> EmbeddingEngine {
        EmbeddingEngine::new(Box::new(ScriptedSource::new()))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_scores_best_first() {
        let engine = engine();
        let alice = engine.enroll(&[Sample::new(vec![1.0, 0.0, 0.0])]).unwrap();
        let bob = engine.enroll(&[Sample::new(vec![0.0, 1.0, 0.0])]).unwrap();

        let candidates = engine
            .score(
                &Sample::new(vec![0.9, 0.1, 0.0]),
                &[("Bob".to_string(), bob), ("Alice".to_string(), alice)],
            )
            .unwrap();

        assert_eq!(candidates[0].name, "Alice");
        assert!(candidates[0].score > 0.9);
        assert!(candidates[1].score < 0.2);
    }

    #[test]
    fn test_top_k_averages_best_samples() {
        let engine = engine().with_top_k(2);
        let template = engine
            .enroll(&[
                Sample::new(vec![1.0, 0.0]),
                Sample::new(vec![1.0, 0.0]),
                Sample::new(vec![0.0, 1.0]),
            ])
            .unwrap();
        let score = engine.profile_score(&[1.0, 0.0], &template).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_capture_from_scripted_source() {
        let mut source = ScriptedSource::new();
        source.push(vec![0.1, 0.2]);
        let mut engine = EmbeddingEngine::new(Box::new(source));

        assert_eq!(engine.capture().unwrap().embedding, vec![0.1, 0.2]);
        assert!(matches!(engine.capture(), Err(Error::CameraUnavailable { .. })));
    }

    #[test]
    fn test_command_source_without_command() {
        let mut source = CommandSource::new(None, None, true);
        assert!(matches!(source.capture(), Err(Error::CameraUnavailable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_parses_json() {
        let mut source = CommandSource::new(Some("echo [0.5,0.25]"), Some(1), false);
        assert_eq!(source.capture().unwrap(), vec![0.5, 0.25]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_rejects_garbage() {
        let mut source = CommandSource::new(Some("echo no-face"), None, true);
        assert!(matches!(source.capture(), Err(Error::Biometric { .. })));
    }
}
