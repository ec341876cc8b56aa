//! View transform for the graph canvas.
//!
//! Planar mode is a pan + zoom map of the simulation plane. Volumetric mode orbits the origin
//! (yaw, then pitch) and applies a perspective divide with depth fog.

mod projection;

use std::f32::consts::FRAC_PI_2;

use eframe::egui::{Pos2, Rect, Vec2, vec2};
use anyhow::{Result, ensure};
use glam::Vec3;
use serde::Deserialize;

pub use projection::Projection;
use projection::{Perspective, orbit_rotation, planar, planar_inverse};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    #[default]
    Planar,
    Volumetric,
}

impl ProjectionMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Planar => "Planar",
            Self::Volumetric => "Volumetric",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Planar => Self::Volumetric,
            Self::Volumetric => Self::Planar,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomAnchor {
    ViewportCenter,
    Pointer(Pos2),
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub planar_zoom_min: f32,
    pub planar_zoom_max: f32,
    pub volumetric_zoom_min: f32,
    pub volumetric_zoom_max: f32,
    pub zoom_step: f32,
    pub orbit_sensitivity: f32,
    pub focal_length: f32,
    pub depth_epsilon: f32,
    pub min_opacity: f32,
    pub fog_falloff: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            planar_zoom_min: 0.1,
            planar_zoom_max: 4.0,
            volumetric_zoom_min: 0.2,
            volumetric_zoom_max: 5.0,
            zoom_step: 1.1,
            orbit_sensitivity: 0.005,
            focal_length: 600.0,
            depth_epsilon: 1.0,
            min_opacity: 0.15,
            fog_falloff: 1.5,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<()> {
        check_zoom_range("planar", self.planar_zoom_min, self.planar_zoom_max)?;
        check_zoom_range(
            "volumetric",
            self.volumetric_zoom_min,
            self.volumetric_zoom_max,
        )?;
        ensure!(
            self.zoom_step.is_finite() && self.zoom_step > 1.0,
            "zoom_step must be greater than 1, got {}",
            self.zoom_step
        );
        ensure!(
            self.focal_length.is_finite() && self.focal_length > 0.0,
            "focal_length must be positive, got {}",
            self.focal_length
        );
        ensure!(
            self.depth_epsilon.is_finite() && self.depth_epsilon > 0.0,
            "depth_epsilon must be positive, got {}",
            self.depth_epsilon
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_opacity),
            "min_opacity must be within [0, 1], got {}",
            self.min_opacity
        );
        ensure!(
            self.orbit_sensitivity.is_finite() && self.fog_falloff.is_finite(),
            "orbit_sensitivity and fog_falloff must be finite"
        );
        Ok(())
    }
}

fn check_zoom_range(label: &str, min: f32, max: f32) -> Result<()> {
    ensure!(
        min.is_finite() && min > 0.0,
        "{label} zoom minimum must be positive, got {min}"
    );
    ensure!(
        max.is_finite() && max >= min,
        "{label} zoom range is inverted: [{min}, {max}]"
    );
    Ok(())
}

#[derive(Clone, Debug)]
pub struct Camera {
    config: CameraConfig,
    mode: ProjectionMode,
    pan: Vec2,
    zoom: f32,
    angle_x: f32,
    angle_y: f32,
}

impl Camera {
    pub fn new(config: CameraConfig, mode: ProjectionMode) -> Self {
        Self {
            config,
            mode,
            pan: Vec2::ZERO,
            zoom: 1.0,
            angle_x: 0.0,
            angle_y: 0.0,
        }
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// `(pitch, yaw)` in radians.
    pub fn angles(&self) -> (f32, f32) {
        (self.angle_x, self.angle_y)
    }

    pub fn zoom_bounds(&self) -> (f32, f32) {
        match self.mode {
            ProjectionMode::Planar => (self.config.planar_zoom_min, self.config.planar_zoom_max),
            ProjectionMode::Volumetric => (
                self.config.volumetric_zoom_min,
                self.config.volumetric_zoom_max,
            ),
        }
    }

    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
        self.angle_x = 0.0;
        self.angle_y = 0.0;
    }

    /// Changes projection and returns to the neutral view; the old view is not carried over.
    pub fn set_mode(&mut self, mode: ProjectionMode) {
        self.mode = mode;
        self.reset();
    }

    /// Canvas drag: pans in planar mode, orbits in volumetric mode.
    pub fn drag(&mut self, delta: Vec2) {
        match self.mode {
            ProjectionMode::Planar => self.pan += delta,
            ProjectionMode::Volumetric => {
                let sensitivity = self.config.orbit_sensitivity;
                self.angle_y += delta.x * sensitivity;
                self.angle_x = (self.angle_x - delta.y * sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
            }
        }
    }

    /// Applies `steps` discrete zoom steps; positive zooms in.
    pub fn zoom_steps(&mut self, steps: i32, anchor: ZoomAnchor, viewport: Rect) {
        if steps == 0 {
            return;
        }
        let factor = self.config.zoom_step.powi(steps);
        self.zoom_by(factor, anchor, viewport);
    }

    pub fn zoom_by(&mut self, factor: f32, anchor: ZoomAnchor, viewport: Rect) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (min, max) = self.zoom_bounds();
        let previous = self.zoom;
        let next = (previous * factor).clamp(min, max);

        if self.mode == ProjectionMode::Planar {
            let center = viewport.center();
            self.pan = match anchor {
                ZoomAnchor::ViewportCenter => self.pan * (next / previous),
                ZoomAnchor::Pointer(pointer) => {
                    let world = planar_inverse(center, self.pan, previous, pointer);
                    pointer - center - world * next
                }
            };
        }
        self.zoom = next;
    }

    fn perspective(&self) -> Perspective {
        Perspective {
            rotation: orbit_rotation(self.angle_x, self.angle_y),
            focal_length: self.config.focal_length,
            zoom: self.zoom,
            depth_epsilon: self.config.depth_epsilon,
            min_opacity: self.config.min_opacity,
            fog_falloff: self.config.fog_falloff,
        }
    }

    pub fn project(&self, world: Vec3, viewport: Rect) -> Projection {
        match self.mode {
            ProjectionMode::Planar => planar(viewport.center(), self.pan, self.zoom, world),
            ProjectionMode::Volumetric => self.perspective().project(viewport.center(), world),
        }
    }

    /// Projects many points with one rotation matrix.
    pub fn project_all<'a>(
        &self,
        points: impl IntoIterator<Item = &'a Vec3>,
        viewport: Rect,
    ) -> Vec<Projection> {
        let center = viewport.center();
        match self.mode {
            ProjectionMode::Planar => points
                .into_iter()
                .map(|point| planar(center, self.pan, self.zoom, *point))
                .collect(),
            ProjectionMode::Volumetric => {
                let perspective = self.perspective();
                points
                    .into_iter()
                    .map(|point| perspective.project(center, *point))
                    .collect()
            }
        }
    }

    /// Simulation point under `screen`, holding the depth of `reference`.
    pub fn unproject(&self, screen: Pos2, viewport: Rect, reference: Vec3) -> Vec3 {
        match self.mode {
            ProjectionMode::Planar => {
                let world = planar_inverse(viewport.center(), self.pan, self.zoom, screen);
                Vec3::new(world.x, world.y, reference.z)
            }
            ProjectionMode::Volumetric => {
                self.perspective()
                    .unproject(viewport.center(), screen, reference)
            }
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.pan == vec2(0.0, 0.0) && self.zoom == 1.0 && self.angle_x == 0.0 && self.angle_y == 0.0
    }
}
