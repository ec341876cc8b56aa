use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};

use super::EmbeddingProvider;
use crate::graph::similarity::normalize;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Built-in provider: signed feature hashing of words and character trigrams.
///
/// Deterministic for identical input. Texts sharing words or spelling land close together, which
/// is enough to drive the graph without an external model.
pub struct HashingEmbedder {
    dimension: usize,
    cold_start: Option<Duration>,
}

impl HashingEmbedder {
    pub fn new(dimension: usize, cold_start_ms: u64) -> Self {
        Self {
            dimension: dimension.max(1),
            cold_start: (cold_start_ms > 0).then(|| Duration::from_millis(cold_start_ms)),
        }
    }

    fn add_feature(&self, values: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let hash = hasher.finish();
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        values[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn warm_up(&mut self) -> Result<()> {
        if let Some(delay) = self.cold_start.take() {
            thread::sleep(delay);
        }
        Ok(())
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>();
        if words.is_empty() {
            bail!("nothing to embed in {text:?}");
        }

        let mut values = vec![0.0_f32; self.dimension];
        for word in &words {
            self.add_feature(&mut values, word, WORD_WEIGHT);

            let padded = format!(" {word} ").chars().collect::<Vec<_>>();
            for window in padded.windows(3) {
                let trigram = window.iter().collect::<String>();
                self.add_feature(&mut values, &trigram, TRIGRAM_WEIGHT);
            }
        }

        if !normalize(&mut values) {
            bail!("hashed features cancelled out for {text:?}");
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::similarity::similarity;

    #[test]
    fn embeddings_are_deterministic_unit_vectors() {
        let mut embedder = HashingEmbedder::new(384, 0);
        let first = embedder.embed("Hello world").expect("embed");
        let second = embedder.embed("Hello world").expect("embed");
        assert_eq!(first, second);
        assert_eq!(first.len(), 384);
        let length = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((length - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shared_words_are_more_similar() {
        let mut embedder = HashingEmbedder::new(384, 0);
        let base = embedder.embed("red apple pie").expect("embed");
        let close = embedder.embed("apple pie").expect("embed");
        let far = embedder.embed("quantum chromodynamics").expect("embed");
        assert!(similarity(&base, &close) > similarity(&base, &far));
    }

    #[test]
    fn case_does_not_matter() {
        let mut embedder = HashingEmbedder::new(64, 0);
        assert_eq!(
            embedder.embed("Cat").expect("embed"),
            embedder.embed("cAT").expect("embed")
        );
    }

    #[test]
    fn punctuation_only_is_rejected() {
        let mut embedder = HashingEmbedder::new(64, 0);
        assert!(embedder.embed("  ?! ").is_err());
    }

    #[test]
    fn warm_up_runs_once() {
        let mut embedder = HashingEmbedder::new(16, 5);
        embedder.warm_up().expect("warm up");
        assert!(embedder.cold_start.is_none());
        embedder.warm_up().expect("second warm up");
    }
}
