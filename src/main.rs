mod app;
mod camera;
mod config;
mod embed;
mod graph;
mod layout;
mod util;

use std::path::PathBuf;

use clap::Parser;

use camera::ProjectionMode;
use config::AppConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with topology, layout, camera and embedder settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// External embedder; the concept text is passed as the last argument
    #[arg(long)]
    embed_command: Option<String>,
    /// Dimension of the built-in hashing embedder
    #[arg(long)]
    dimension: Option<usize>,
    /// Simulated one-time warm-up of the built-in embedder
    #[arg(long)]
    cold_start_ms: Option<u64>,
    /// Start in the 3-D orbit view
    #[arg(long)]
    volumetric: bool,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = AppConfig::load(path)?;
                log::info!("loaded config from {}", path.display());
                config
            }
            None => AppConfig::default(),
        };

        if let Some(command) = &self.embed_command {
            config.embedder.command = command.split_whitespace().map(str::to_owned).collect();
        }
        if let Some(dimension) = self.dimension {
            config.embedder.dimension = dimension;
        }
        if let Some(cold_start_ms) = self.cold_start_ms {
            config.embedder.cold_start_ms = cold_start_ms;
        }
        if self.volumetric {
            config.mode = ProjectionMode::Volumetric;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.resolve_config()?;
    let provider = embed::build_provider(&config.embedder)?;
    log::info!("using embedder {}", provider.name());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 840.0]),
        ..Default::default()
    };

    eframe::run_native(
        "concept-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::ConceptGraphApp::new(cc, &config, provider)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to start window: {error}"))
}
