// THEORY:
// The `SteeringMapper` is the last stage of the pipeline. It turns the selected
// note's pixel position into the number the robot's heading controller consumes.
//
// The reference line is the intake axis, `width / 2` (integer division), i.e. the
// column the robot's intake is mounted on. Two forms are produced:
// - **linear**: `(x - axis) / axis`, 0 on the axis and ±1 at the frame edges;
// - **angular**: the bearing, in radians, from the bottom-centre of the frame to the
//   note, `asin(dx / distance)`. Undefined when the note sits exactly on that point.
//
// A zero intake axis (a frame one pixel wide, or empty) cannot be steered against.
// That is caught once when the mapper is built, never per frame.

use crate::config::{ReferencePoint, SteeringForm};
use crate::core_modules::candidate::Candidate;
use crate::error::VisionError;
use imageproc::point::Point;

/// Steering output for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringValue {
    /// Horizontal offset from the intake axis, normalised by the axis position.
    pub linear: f64,
    /// Bearing in radians; `None` when the reference point is the bottom-centre pixel.
    pub angle: Option<f64>,
}

impl SteeringValue {
    /// The value to publish for the configured form, if that form is defined.
    pub fn publishable(&self, form: SteeringForm) -> Option<f64> {
        match form {
            SteeringForm::Linear => Some(self.linear),
            SteeringForm::Angular => self.angle,
        }
    }
}

/// Maps note positions onto steering values for one fixed camera geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteeringMapper {
    frame_width: u32,
    frame_height: u32,
    intake_axis: u32,
}

impl SteeringMapper {
    pub fn new(frame_width: u32, frame_height: u32) -> Result<Self, VisionError> {
        let intake_axis = frame_width / 2;
        if intake_axis == 0 {
            return Err(VisionError::DegenerateGeometry { width: frame_width });
        }
        Ok(Self {
            frame_width,
            frame_height,
            intake_axis,
        })
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn intake_axis(&self) -> u32 {
        self.intake_axis
    }

    /// `(x - axis) / axis`. Monotonically non-decreasing in `x`.
    pub fn linear(&self, x: f64) -> f64 {
        let axis = self.intake_axis as f64;
        (x - axis) / axis
    }

    /// Bearing from the bottom-centre pixel `(axis, height - 1)` to `point`.
    pub fn angular(&self, point: Point<f64>) -> Option<f64> {
        let dx = point.x - self.intake_axis as f64;
        let dy = (self.frame_height as f64 - 1.0) - point.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > 0.0 {
            Some((dx / distance).clamp(-1.0, 1.0).asin())
        } else {
            None
        }
    }

    pub fn map_to_steering(
        &self,
        candidate: &Candidate,
        reference: ReferencePoint,
    ) -> SteeringValue {
        let point = candidate.reference_point(reference);
        SteeringValue {
            linear: self.linear(point.x),
            angle: self.angular(point),
        }
    }
}
