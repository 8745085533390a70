// THEORY:
// The `pipeline` module is the top-level API of the note detector. It wires the
// stateless stages into one call per frame:
//
//   Frame -> Segmenter -> CandidateExtractor -> CandidateSelector -> SteeringMapper
//
// The only state a `NotePipeline` carries is what is fixed at start-up: the
// validated `PipelineConfig` and the camera geometry. A pipeline can therefore be
// shared by reference between threads, and two cameras can run two pipelines side
// by side with no coordination at all.

use crate::config::{PipelineConfig, SteeringForm};
use crate::core_modules::candidate::Candidate;
use crate::core_modules::candidate_extractor::candidate_extractor;
use crate::core_modules::candidate_selector::candidate_selector;
use crate::core_modules::segmenter::{self, Frame};
use crate::core_modules::steering::{SteeringMapper, SteeringValue};
use crate::error::VisionError;
use log::{debug, info};

/// The note chosen in a frame, with everything the caller may want to steer on.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub candidate: Candidate,
    /// Circularity deviation under the configured policy.
    pub deviation: f64,
    pub steering: SteeringValue,
}

/// The primary output of the pipeline for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    NoNoteVisible,
    NoteDetected(Detection),
}

impl Report {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            Report::NoNoteVisible => None,
            Report::NoteDetected(detection) => Some(detection),
        }
    }

    /// The value to hand to telemetry this cycle, if any.
    pub fn steering(&self, form: SteeringForm) -> Option<f64> {
        self.detection()
            .and_then(|detection| detection.steering.publishable(form))
    }
}

/// The note detection pipeline for one camera.
#[derive(Debug, Clone)]
pub struct NotePipeline {
    config: PipelineConfig,
    mapper: SteeringMapper,
}

impl NotePipeline {
    /// Validates `config` and fixes the camera geometry. Fails on an invalid config or
    /// on a frame too narrow to have an intake axis.
    pub fn new(
        config: PipelineConfig,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, VisionError> {
        config.validate()?;
        let mapper = SteeringMapper::new(frame_width, frame_height)?;
        info!(
            "note pipeline ready: {}x{}, intake axis x={}, {:?} scoring, {:?} output, k-means {}",
            frame_width,
            frame_height,
            mapper.intake_axis(),
            config.deviation_policy,
            config.steering_form,
            if config.quantization.enabled() {
                format!("k={}", config.quantization.clusters)
            } else {
                "off".to_string()
            }
        );
        Ok(Self { config, mapper })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mapper(&self) -> &SteeringMapper {
        &self.mapper
    }

    /// Runs every stage on one frame.
    pub fn generate_report(&self, frame: &Frame) -> Result<Report, VisionError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidFrame {
                width,
                height,
                reason: "frame has no pixels",
            });
        }
        if (width, height) != (self.mapper.frame_width(), self.mapper.frame_height()) {
            return Err(VisionError::InvalidFrame {
                width,
                height,
                reason: "frame size differs from the start-up geometry",
            });
        }

        // Stage 1: Segmentation
        let mask = segmenter::segment(frame, &self.config)?;

        // Stage 2: Candidate Extraction
        let candidates = candidate_extractor::extract(&mask);
        let extracted = candidates.len();

        // Stage 3: Selection
        let Some(candidate) = candidate_selector::select(candidates, &self.config) else {
            debug!("{} candidates, none selected", extracted);
            return Ok(Report::NoNoteVisible);
        };

        // Stage 4: Steering
        let deviation = candidate.circularity_deviation(self.config.deviation_policy);
        let steering = self
            .mapper
            .map_to_steering(&candidate, self.config.reference_point);
        debug!(
            "{} candidates, selected #{} (area {:.0}, deviation {:.4}), steering {:.4}",
            extracted, candidate.id, candidate.area, deviation, steering.linear
        );

        Ok(Report::NoteDetected(Detection {
            candidate,
            deviation,
            steering,
        }))
    }

    /// Shorthand for the value to publish this frame under the configured form.
    pub fn steering_value(&self, frame: &Frame) -> Result<Option<f64>, VisionError> {
        Ok(self
            .generate_report(frame)?
            .steering(self.config.steering_form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReferencePoint, SteeringForm};
    use image::{Rgb, RgbImage};

    const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);
    const CARPET: Rgb<u8> = Rgb([40, 60, 45]);

    fn frame_with_discs(width: u32, height: u32, discs: &[(f64, f64, f64)]) -> Frame {
        RgbImage::from_fn(width, height, |x, y| {
            let inside = discs.iter().any(|&(cx, cy, r)| {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                dx * dx + dy * dy <= r * r
            });
            if inside { ORANGE } else { CARPET }
        })
    }

    #[test]
    fn rejects_invalid_config_and_geometry() {
        let mut config = PipelineConfig::default();
        config.morphology.kernel_size = 2;
        assert!(matches!(
            NotePipeline::new(config, 640, 480),
            Err(VisionError::Config(_))
        ));
        assert!(matches!(
            NotePipeline::new(PipelineConfig::default(), 1, 480),
            Err(VisionError::DegenerateGeometry { width: 1 })
        ));
    }

    #[test]
    fn empty_scene_reports_no_note() {
        let pipeline = NotePipeline::new(PipelineConfig::default(), 160, 120).unwrap();
        let frame = frame_with_discs(160, 120, &[]);
        assert_eq!(pipeline.generate_report(&frame).unwrap(), Report::NoNoteVisible);
        assert_eq!(pipeline.steering_value(&frame).unwrap(), None);
    }

    #[test]
    fn finds_a_disc_right_of_centre() {
        let pipeline = NotePipeline::new(PipelineConfig::default(), 320, 240).unwrap();
        let frame = frame_with_discs(320, 240, &[(240.0, 100.0, 20.0)]);

        let report = pipeline.generate_report(&frame).unwrap();
        let detection = report.detection().expect("note detected");
        let centroid = detection.candidate.centroid.expect("centroid");
        assert!((centroid.x - 240.0).abs() < 0.5);
        assert!((centroid.y - 100.0).abs() < 0.5);
        assert!((detection.steering.linear - 0.5).abs() < 0.005);
        assert!(detection.deviation < 0.2);
    }

    #[test]
    fn wrong_size_frame_is_invalid() {
        let pipeline = NotePipeline::new(PipelineConfig::default(), 320, 240).unwrap();
        let frame = frame_with_discs(160, 120, &[]);
        assert!(matches!(
            pipeline.generate_report(&frame),
            Err(VisionError::InvalidFrame { .. })
        ));
        assert!(matches!(
            pipeline.generate_report(&RgbImage::new(0, 0)),
            Err(VisionError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn same_frame_same_answer() {
        let mut config = PipelineConfig::default();
        config.quantization.clusters = 5;
        let pipeline = NotePipeline::new(config, 200, 150).unwrap();
        let frame = frame_with_discs(200, 150, &[(60.0, 80.0, 18.0), (150.0, 40.0, 12.0)]);

        let first = pipeline.generate_report(&frame).unwrap();
        let second = pipeline.generate_report(&frame).unwrap();
        assert_eq!(first, second);
        assert!(first.detection().is_some());
    }

    #[test]
    fn angular_output_form() {
        let config = PipelineConfig {
            steering_form: SteeringForm::Angular,
            reference_point: ReferencePoint::CircleCenter,
            ..PipelineConfig::default()
        };
        let pipeline = NotePipeline::new(config, 320, 240).unwrap();
        let frame = frame_with_discs(320, 240, &[(160.0, 60.0, 20.0)]);
        let angle = pipeline.steering_value(&frame).unwrap().expect("angle");
        assert!(angle.abs() < 0.01);
    }
}
