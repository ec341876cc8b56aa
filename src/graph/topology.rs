use anyhow::{Result, ensure};
use serde::Deserialize;

use super::NodeId;
use super::similarity::similarity;

/// Edge selection rule applied once per inserted concept: every candidate ranked within `top_k`
/// or scoring above `threshold` is kept, then the list is cut at `max_edges`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub top_k: usize,
    pub threshold: f32,
    pub max_edges: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.45,
            max_edges: 6,
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_edges > 0, "max_edges must be at least 1");
        ensure!(
            self.threshold.is_finite(),
            "threshold must be finite, got {}",
            self.threshold
        );
        Ok(())
    }
}

/// Picks the existing nodes a new embedding links to, strongest first.
///
/// `existing` must be in insertion order; equal similarities keep that order.
pub fn connect<'a, I>(embedding: &[f32], existing: I, config: TopologyConfig) -> Vec<(NodeId, f32)>
where
    I: IntoIterator<Item = (NodeId, &'a [f32])>,
{
    let mut ranked = existing
        .into_iter()
        .map(|(id, other)| (id, similarity(embedding, other)))
        .collect::<Vec<_>>();

    // stable sort, ties stay in insertion order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .enumerate()
        .filter(|&(rank, (_, score))| rank < config.top_k || score > config.threshold)
        .map(|(_, candidate)| candidate)
        .take(config.max_edges)
        .collect()
}
