use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};

use crate::camera::ProjectionMode;
use crate::graph::RenderSnapshot;

use super::ConceptGraphApp;
use super::render_utils::{blend_color, circle_visible, draw_background, draw_grid};

const EDGE_COLOR: Color32 = Color32::from_rgb(150, 160, 176);
const EDGE_HOVER_COLOR: Color32 = Color32::from_rgb(241, 146, 94);
const MATCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);
const HOVER_RING_COLOR: Color32 = Color32::from_rgb(245, 206, 93);

impl ConceptGraphApp {
    pub(super) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let moving = self.engine.step(frame_delta_seconds);

        let picking = self.engine.snapshot(rect);
        self.handle_pointer(ui, &response, &picking, rect);

        let snapshot = self.engine.snapshot(rect);
        draw_background(&painter, rect);
        if snapshot.mode == ProjectionMode::Planar {
            draw_grid(&painter, rect, self.engine.camera().pan(), snapshot.zoom);
        }

        if snapshot.nodes.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Type a concept above and press Enter",
                FontId::proportional(16.0),
                Color32::from_gray(150),
            );
        }

        self.paint_snapshot(&painter, rect, &snapshot);
        self.paint_hover_details(&painter, rect, &snapshot);

        if self.engine.gesture_active() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grabbing);
        } else if self.engine.hovered().is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grab);
        }

        if moving || self.engine.gesture_active() {
            ui.ctx().request_repaint();
        }
    }

    fn handle_pointer(
        &mut self,
        ui: &Ui,
        response: &egui::Response,
        picking: &RenderSnapshot,
        rect: egui::Rect,
    ) {
        // drag_started fires only after the pointer has travelled past the click distance
        if response.drag_started()
            && let Some(press) = ui.input(|input| input.pointer.press_origin())
        {
            self.engine.pointer_down(picking.press_target(press), press);
        }
        if response.dragged()
            && let Some(pos) = response.interact_pointer_pos()
        {
            self.engine.pointer_move(pos, rect);
        }
        if response.drag_stopped() {
            self.engine.pointer_up();
        }

        let hover_pos = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pos| rect.contains(*pos));

        if response.hovered() {
            let steps = ui.input(|input| self.wheel_steps.collect(&input.events));
            let direction = steps.signum() as f32;
            for _ in 0..steps.unsigned_abs() {
                self.engine.wheel(direction, hover_pos, rect);
            }
        }

        if !self.engine.is_dragging_node() {
            let hovered = hover_pos.and_then(|pos| picking.hit_test(pos));
            self.engine.set_hovered(hovered);
        }
    }

    fn paint_snapshot(&self, painter: &egui::Painter, rect: egui::Rect, snapshot: &RenderSnapshot) {
        let zoom_sqrt = snapshot.zoom.sqrt();

        for edge in &snapshot.edges {
            let (color, width) = if edge.hovered {
                (EDGE_HOVER_COLOR, (edge.stroke_width + 1.0) * zoom_sqrt)
            } else {
                (EDGE_COLOR, edge.stroke_width * zoom_sqrt)
            };
            painter.line_segment(
                [edge.from, edge.to],
                Stroke::new(width.clamp(0.4, 6.0), color.gamma_multiply(edge.opacity)),
            );
        }

        let dimmed = self.engine.hovered().is_some();
        for node in &snapshot.nodes {
            if !circle_visible(rect, node.screen, node.radius + 120.0) {
                continue;
            }

            let mut fill = node.color;
            if node.matched {
                fill = blend_color(fill, MATCH_COLOR, 0.6);
            }
            if dimmed && !node.hovered && !node.highlighted {
                fill = fill.gamma_multiply(0.45);
            }
            let fill = fill.gamma_multiply(node.opacity);

            painter.circle_filled(node.screen, node.radius, fill);
            painter.circle_stroke(
                node.screen,
                node.radius,
                Stroke::new(
                    if node.matched { 1.6 } else { 1.0 },
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190).gamma_multiply(node.opacity),
                ),
            );
            if node.hovered {
                painter.circle_stroke(
                    node.screen,
                    node.radius + 4.0,
                    Stroke::new(1.8, HOVER_RING_COLOR),
                );
            }

            let font_size = match snapshot.mode {
                ProjectionMode::Planar => 12.0,
                ProjectionMode::Volumetric => (12.0 * node.scale).clamp(8.0, 20.0),
            };
            painter.text(
                node.screen + vec2(node.radius + 5.0, 0.0),
                Align2::LEFT_CENTER,
                &node.label,
                FontId::proportional(font_size),
                Color32::from_gray(238).gamma_multiply(node.opacity),
            );
        }
    }

    fn paint_hover_details(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        snapshot: &RenderSnapshot,
    ) {
        let Some(hovered) = self.engine.hovered() else {
            return;
        };
        let Some(node) = snapshot.node(hovered) else {
            return;
        };

        let neighbors = self.engine.neighbors(hovered);
        let mut panel_text = format!("{}  |  {} links", node.label, neighbors.len());
        for (other, weight) in neighbors.iter().take(8) {
            if let Some(other) = self.engine.node(*other) {
                panel_text.push_str(&format!("\n  {:.2}  {}", weight, other.text));
            }
        }

        painter.text(
            rect.left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            panel_text,
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
    }
}
