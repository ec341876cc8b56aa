use eframe::egui::{Pos2, Vec2, pos2, vec2};
use glam::{Mat3, Vec3};

/// Screen-space placement of one simulation point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub screen: Pos2,
    pub scale: f32,
    pub opacity: f32,
    /// Rotated depth; larger is nearer the viewer.
    pub depth: f32,
    pub in_front: bool,
}

pub(super) fn planar(center: Pos2, pan: Vec2, zoom: f32, world: Vec3) -> Projection {
    Projection {
        screen: center + pan + vec2(world.x, world.y) * zoom,
        scale: 1.0,
        opacity: 1.0,
        depth: 0.0,
        in_front: true,
    }
}

pub(super) fn planar_inverse(center: Pos2, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - center - pan) / zoom
}

/// Yaw about the vertical axis first, then pitch about the horizontal axis.
pub(super) fn orbit_rotation(angle_x: f32, angle_y: f32) -> Mat3 {
    Mat3::from_rotation_x(angle_x) * Mat3::from_rotation_y(angle_y)
}

#[derive(Clone, Copy)]
pub(super) struct Perspective {
    pub(super) rotation: Mat3,
    pub(super) focal_length: f32,
    pub(super) zoom: f32,
    pub(super) depth_epsilon: f32,
    pub(super) min_opacity: f32,
    pub(super) fog_falloff: f32,
}

impl Perspective {
    fn scale_at(self, depth: f32) -> f32 {
        (self.focal_length * self.zoom) / (self.focal_length - depth).max(self.depth_epsilon)
    }

    pub(super) fn project(self, center: Pos2, world: Vec3) -> Projection {
        let rotated = self.rotation * world;
        let scale = self.scale_at(rotated.z);
        // fog depends on depth only, not on how far the user zoomed
        let opacity = (scale / self.zoom)
            .powf(self.fog_falloff)
            .clamp(self.min_opacity, 1.0);

        Projection {
            screen: pos2(
                center.x + rotated.x * scale,
                center.y + rotated.y * scale,
            ),
            scale,
            opacity,
            depth: rotated.z,
            in_front: self.focal_length - rotated.z > self.depth_epsilon,
        }
    }

    /// World point under `screen` at the rotated depth of `reference`.
    pub(super) fn unproject(self, center: Pos2, screen: Pos2, reference: Vec3) -> Vec3 {
        let depth = (self.rotation * reference).z;
        let scale = self.scale_at(depth);
        let rotated = Vec3::new(
            (screen.x - center.x) / scale,
            (screen.y - center.y) / scale,
            depth,
        );
        self.rotation.transpose() * rotated
    }
}
