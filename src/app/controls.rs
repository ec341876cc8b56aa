use eframe::egui::{self, Align, Color32, Key, Layout, TextEdit, Ui};

use super::ConceptGraphApp;

impl ConceptGraphApp {
    pub(super) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("concept-graph");
            ui.separator();

            let input = ui.add(
                TextEdit::singleline(&mut self.input)
                    .hint_text("Add a concept")
                    .desired_width(240.0),
            );
            if self.focus_input {
                input.request_focus();
                self.focus_input = false;
            }
            let entered = input.lost_focus() && ui.input(|state| state.key_pressed(Key::Enter));
            if ui.button("Add").clicked() || entered {
                self.submit_input();
            }

            if ui.button("Clear all").clicked() {
                self.engine.clear_all();
            }

            let next_mode = self.engine.mode().toggled();
            if ui
                .button(format!("{} view", next_mode.label()))
                .on_hover_text("Switching views resets the camera")
                .clicked()
            {
                self.engine.set_mode(next_mode);
            }

            let camera_moved = !self.engine.camera().is_neutral();
            if ui
                .add_enabled(camera_moved, egui::Button::new("Reset camera"))
                .clicked()
            {
                self.engine.reset_camera();
            }

            ui.separator();
            let mut search = self.engine.search().to_owned();
            if ui
                .add(
                    TextEdit::singleline(&mut search)
                        .hint_text("Find")
                        .desired_width(140.0),
                )
                .changed()
            {
                self.engine.set_search(&search);
            }

            if self.engine.is_pending() {
                ui.spinner();
                ui.label(format!("embedding {}", self.engine.pending_count()));
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(format!(
                    "nodes: {}  edges: {}",
                    self.engine.nodes().len(),
                    self.engine.edges().len()
                ));
                if let Some(dimension) = self.engine.dimension() {
                    ui.label(format!("dim {dimension}"));
                }
            });
        });

        let error = self.engine.last_error().map(str::to_owned);
        if let Some(error) = error {
            ui.horizontal(|ui| {
                ui.colored_label(Color32::from_rgb(236, 112, 99), error);
                if ui.small_button("Dismiss").clicked() {
                    self.engine.dismiss_error();
                }
            });
        }
    }
}
