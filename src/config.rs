use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::camera::{CameraConfig, ProjectionMode};
use crate::embed::EmbedderConfig;
use crate::graph::topology::TopologyConfig;
use crate::layout::LayoutConfig;

/// Everything tunable, loadable from a JSON file. Missing keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: ProjectionMode,
    /// Anchor wheel zoom on the pointer instead of the viewport centre.
    pub zoom_to_pointer: bool,
    pub topology: TopologyConfig,
    pub layout: LayoutConfig,
    pub camera: CameraConfig,
    pub embedder: EmbedderConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("invalid JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would break the camera or the simulation at runtime.
    pub fn validate(&self) -> Result<()> {
        self.topology.validate().context("invalid topology settings")?;
        self.layout.validate().context("invalid layout settings")?;
        self.camera.validate().context("invalid camera settings")?;
        Ok(())
    }
}
