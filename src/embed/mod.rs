//! Embedding providers and the background worker that calls them.

mod command;
mod hashing;
mod worker;

use anyhow::{Result, anyhow, bail};
use serde::Deserialize;

pub use command::CommandEmbedder;
pub use hashing::HashingEmbedder;
pub use worker::EmbedWorker;

use crate::graph::similarity::normalize;

/// Turns text into a fixed-length vector. Implementations may block; they always run on the
/// embed worker thread.
pub trait EmbeddingProvider: Send {
    fn name(&self) -> &str;

    /// One-time setup before the first request. May be slow.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Dimension of the built-in hashing embedder.
    pub dimension: usize,
    /// Simulated one-time warm-up of the built-in embedder, in milliseconds.
    pub cold_start_ms: u64,
    /// External program and leading arguments; the text is appended as the last argument.
    pub command: Vec<String>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            cold_start_ms: 0,
            command: Vec::new(),
        }
    }
}

pub fn build_provider(config: &EmbedderConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.command.split_first() {
        Some((program, args)) => Ok(Box::new(CommandEmbedder::new(program, args))),
        None => {
            if config.dimension == 0 {
                bail!("embedding dimension must be positive");
            }
            Ok(Box::new(HashingEmbedder::new(
                config.dimension,
                config.cold_start_ms,
            )))
        }
    }
}

/// Checks a provider vector and scales it to unit length.
///
/// Providers are expected to return unit vectors already; renormalizing costs one O(D) pass.
pub fn prepare_embedding(mut values: Vec<f32>, expected_dimension: Option<usize>) -> Result<Vec<f32>> {
    if values.is_empty() {
        bail!("provider returned an empty vector");
    }
    if let Some(expected) = expected_dimension
        && values.len() != expected
    {
        bail!(
            "provider returned {} dimensions, session uses {expected}",
            values.len()
        );
    }
    if values.iter().any(|value| !value.is_finite()) {
        bail!("provider returned non-finite components");
    }
    if !normalize(&mut values) {
        return Err(anyhow!("provider returned a zero vector"));
    }
    Ok(values)
}
