use eframe::egui::{self, Context};

use crate::config::AppConfig;
use crate::embed::{EmbedWorker, EmbeddingProvider};
use crate::graph::{Completion, GraphEngine, Submission};

mod canvas;
mod controls;
mod render_utils;
mod wheel;

pub struct ConceptGraphApp {
    engine: GraphEngine,
    worker: EmbedWorker,
    input: String,
    focus_input: bool,
    wheel_steps: wheel::WheelSteps,
}

impl ConceptGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            engine: GraphEngine::new(
                config.topology,
                config.layout,
                config.camera,
                config.mode,
                config.zoom_to_pointer,
            ),
            worker: EmbedWorker::spawn(provider),
            input: String::new(),
            focus_input: true,
            wheel_steps: wheel::WheelSteps::default(),
        }
    }

    fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        match self.engine.submit(&text) {
            Submission::Pending(pending) => {
                if let Err(error) = self.worker.request(pending.clone()) {
                    self.engine.complete(pending, Err(error));
                }
            }
            Submission::Ignored(reason) => log::debug!("input {text:?} ignored: {reason:?}"),
        }
        self.focus_input = true;
    }

    fn drain_embeddings(&mut self) {
        match self.worker.poll() {
            Ok(responses) => {
                for response in responses {
                    if let Completion::Failed(message) =
                        self.engine.complete(response.pending, response.result)
                    {
                        log::debug!("add failed: {message}");
                    }
                }
            }
            Err(error) => {
                if self.engine.is_pending() {
                    self.engine.fail_pending(format!("{error:#}"));
                }
            }
        }
    }
}

impl eframe::App for ConceptGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.drain_embeddings();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui));

        if self.engine.is_pending() {
            ctx.request_repaint();
        }
    }
}
