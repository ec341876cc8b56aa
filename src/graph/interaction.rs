use eframe::egui::{Pos2, Rect};

use super::{GraphEngine, NodeId};
use crate::camera::ZoomAnchor;

/// What the pointer went down on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    Canvas,
    Node(NodeId),
    Control,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum Gesture {
    Idle,
    Camera { last: Pos2 },
    Node { id: NodeId },
}

impl GraphEngine {
    pub fn is_dragging_node(&self) -> bool {
        matches!(self.gesture, Gesture::Node { .. })
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Starts a gesture. A node under the pointer wins over the canvas; a gesture already in
    /// progress is left alone.
    pub fn pointer_down(&mut self, target: PointerTarget, pos: Pos2) {
        if self.gesture_active() {
            return;
        }

        self.gesture = match target {
            PointerTarget::Node(id) => match self.simulation.position(id) {
                Some(position) => {
                    self.simulation.pin(id, position);
                    Gesture::Node { id }
                }
                None => Gesture::Camera { last: pos },
            },
            PointerTarget::Canvas => Gesture::Camera { last: pos },
            PointerTarget::Control => Gesture::Idle,
        };
    }

    pub fn pointer_move(&mut self, pos: Pos2, viewport: Rect) {
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Camera { last } => {
                self.camera.drag(pos - last);
                self.gesture = Gesture::Camera { last: pos };
            }
            Gesture::Node { id } => match self.simulation.position(id) {
                Some(reference) => {
                    let target = self.camera.unproject(pos, viewport, reference);
                    self.simulation.pin(id, target);
                }
                None => self.gesture = Gesture::Idle,
            },
        }
    }

    pub fn pointer_up(&mut self) {
        self.end_gesture();
    }

    pub(super) fn end_gesture(&mut self) {
        if let Gesture::Node { id } = self.gesture {
            self.simulation.release(id);
        }
        self.gesture = Gesture::Idle;
    }

    /// One zoom step per wheel event, direction from the sign of `delta_y`.
    pub fn wheel(&mut self, delta_y: f32, pointer: Option<Pos2>, viewport: Rect) {
        if delta_y.abs() <= f32::EPSILON {
            return;
        }
        let steps = if delta_y > 0.0 { 1 } else { -1 };
        let anchor = match pointer {
            Some(pointer) if self.zoom_to_pointer => ZoomAnchor::Pointer(pointer),
            _ => ZoomAnchor::ViewportCenter,
        };
        self.camera.zoom_steps(steps, anchor, viewport);
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};
    use glam::Vec3;

    use super::*;
    use crate::camera::ProjectionMode;
    use crate::graph::engine::tests::{add, engine};

    fn viewport() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    #[test]
    fn canvas_drag_pans_in_planar_mode() {
        let mut engine = engine(ProjectionMode::Planar);
        engine.pointer_down(PointerTarget::Canvas, pos2(100.0, 100.0));
        engine.pointer_move(pos2(130.0, 90.0), viewport());
        engine.pointer_move(pos2(140.0, 95.0), viewport());
        engine.pointer_up();
        assert_eq!(engine.camera().pan(), vec2(40.0, -5.0));
        assert!(!engine.gesture_active());
    }

    #[test]
    fn canvas_drag_orbits_in_volumetric_mode() {
        let mut engine = engine(ProjectionMode::Volumetric);
        engine.pointer_down(PointerTarget::Canvas, pos2(100.0, 100.0));
        engine.pointer_move(pos2(200.0, 100.0), viewport());
        let (pitch, yaw) = engine.camera().angles();
        assert_eq!(pitch, 0.0);
        assert!(yaw > 0.0);
        assert_eq!(engine.camera().pan(), vec2(0.0, 0.0));
    }

    #[test]
    fn node_drag_pins_then_releases() {
        let mut engine = engine(ProjectionMode::Planar);
        let cat = add(&mut engine, "cat", vec![1.0, 0.0]);
        add(&mut engine, "dog", vec![0.8, 0.6]);

        engine.pointer_down(PointerTarget::Node(cat), pos2(400.0, 300.0));
        assert!(engine.is_dragging_node());
        engine.pointer_move(pos2(500.0, 250.0), viewport());
        for _ in 0..30 {
            engine.step(1.0 / 60.0);
        }
        assert_eq!(engine.simulation().position(cat), Some(Vec3::new(100.0, -50.0, 0.0)));
        assert!(engine.simulation().alpha() >= 0.3 - 1e-4);
        assert!(engine.camera().is_neutral());

        engine.pointer_up();
        assert!(!engine.simulation().has_pins());
        for _ in 0..10 {
            engine.step(1.0 / 60.0);
        }
        assert_ne!(engine.simulation().position(cat), Some(Vec3::new(100.0, -50.0, 0.0)));
    }

    #[test]
    fn node_gesture_blocks_camera_gesture() {
        let mut engine = engine(ProjectionMode::Planar);
        let cat = add(&mut engine, "cat", vec![1.0, 0.0]);
        engine.pointer_down(PointerTarget::Node(cat), pos2(400.0, 300.0));
        engine.pointer_down(PointerTarget::Canvas, pos2(0.0, 0.0));
        engine.pointer_move(pos2(50.0, 50.0), viewport());
        assert!(engine.is_dragging_node());
        assert_eq!(engine.camera().pan(), vec2(0.0, 0.0));
    }

    #[test]
    fn controls_start_no_gesture() {
        let mut engine = engine(ProjectionMode::Planar);
        engine.pointer_down(PointerTarget::Control, pos2(10.0, 10.0));
        engine.pointer_move(pos2(60.0, 60.0), viewport());
        assert!(!engine.gesture_active());
        assert!(engine.camera().is_neutral());
    }

    #[test]
    fn clearing_mid_drag_ends_gesture() {
        let mut engine = engine(ProjectionMode::Planar);
        let cat = add(&mut engine, "cat", vec![1.0, 0.0]);
        engine.pointer_down(PointerTarget::Node(cat), pos2(400.0, 300.0));
        engine.clear_all();
        engine.pointer_move(pos2(420.0, 310.0), viewport());
        engine.pointer_up();
        assert!(!engine.gesture_active());
        assert!(engine.nodes().is_empty());
    }

    #[test]
    fn wheel_zooms_one_step_per_event() {
        let mut engine = engine(ProjectionMode::Planar);
        engine.wheel(120.0, None, viewport());
        assert!((engine.camera().zoom() - 1.1).abs() < 1e-5);
        engine.wheel(-3.0, Some(pos2(5.0, 5.0)), viewport());
        assert!((engine.camera().zoom() - 1.0).abs() < 1e-5);
        engine.wheel(0.0, None, viewport());
        assert!((engine.camera().zoom() - 1.0).abs() < 1e-5);
        assert_eq!(engine.camera().pan(), vec2(0.0, 0.0));
    }
}
