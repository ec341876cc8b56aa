use eframe::egui::{Event, MouseWheelUnit};

/// Smooth-scroll distance, in points, that makes one zoom step.
const POINTS_PER_STEP: f32 = 40.0;

/// Turns wheel events into discrete zoom steps. Line and page events count one step each;
/// point deltas from trackpads accumulate until they cross a step.
#[derive(Debug, Default)]
pub(super) struct WheelSteps {
    residual: f32,
}

impl WheelSteps {
    pub(super) fn feed(&mut self, unit: MouseWheelUnit, delta_y: f32) -> i32 {
        if !delta_y.is_finite() || delta_y == 0.0 {
            return 0;
        }
        match unit {
            MouseWheelUnit::Line | MouseWheelUnit::Page => {
                self.residual = 0.0;
                if delta_y > 0.0 { 1 } else { -1 }
            }
            MouseWheelUnit::Point => {
                if self.residual * delta_y < 0.0 {
                    self.residual = 0.0;
                }
                self.residual += delta_y;
                let steps = (self.residual / POINTS_PER_STEP).trunc();
                self.residual -= steps * POINTS_PER_STEP;
                steps as i32
            }
        }
    }

    /// Net zoom steps from one frame's input events.
    pub(super) fn collect(&mut self, events: &[Event]) -> i32 {
        events
            .iter()
            .map(|event| match event {
                Event::MouseWheel { unit, delta, .. } => self.feed(*unit, delta.y),
                _ => 0,
            })
            .sum()
    }
}
