use image::{Rgb, RgbImage};
use note_vision::{
    CycleDriver, CycleOutcome, DeviationPolicy, Frame, FrameSource, NotePipeline, PipelineConfig,
    Report, TelemetryPublisher, VisionError,
};

const NOTE: Rgb<u8> = Rgb([255, 120, 20]);
const FIELD: Rgb<u8> = Rgb([70, 80, 90]);

enum Shape {
    Disc { cx: f64, cy: f64, r: f64 },
    Square { x: u32, y: u32, side: u32 },
}

impl Shape {
    fn covers(&self, px: u32, py: u32) -> bool {
        match *self {
            Shape::Disc { cx, cy, r } => {
                (px as f64 - cx).powi(2) + (py as f64 - cy).powi(2) <= r * r
            }
            Shape::Square { x, y, side } => {
                (x..x + side).contains(&px) && (y..y + side).contains(&py)
            }
        }
    }
}

fn scene(width: u32, height: u32, shapes: &[Shape]) -> Frame {
    RgbImage::from_fn(width, height, |x, y| {
        if shapes.iter().any(|shape| shape.covers(x, y)) { NOTE } else { FIELD }
    })
}

struct Frames(Vec<Frame>);

impl FrameSource for Frames {
    fn next_frame(&mut self) -> Result<Frame, VisionError> {
        if self.0.is_empty() {
            return Err(VisionError::NoFrame("done".into()));
        }
        Ok(self.0.remove(0))
    }
}

#[derive(Default)]
struct Published(Vec<f64>);

impl TelemetryPublisher for Published {
    fn publish(&mut self, steering: f64) -> Result<(), VisionError> {
        self.0.push(steering);
        Ok(())
    }
}

#[test]
fn note_right_of_the_intake_steers_half_right() {
    // r = 17.84 encloses roughly 1000 px².
    let pipeline = NotePipeline::new(PipelineConfig::default(), 640, 480).unwrap();
    let frame = scene(640, 480, &[Shape::Disc { cx: 480.0, cy: 200.0, r: 17.84 }]);

    let report = pipeline.generate_report(&frame).unwrap();
    let detection = report.detection().expect("note should be detected");
    assert_eq!(pipeline.mapper().intake_axis(), 320);
    assert!((detection.steering.linear - 0.5).abs() < 0.005);
    assert!(detection.deviation < 0.15);
}

#[test]
fn circularity_beats_size() {
    let pipeline = NotePipeline::new(PipelineConfig::default(), 640, 480).unwrap();
    let frame = scene(
        640,
        480,
        &[
            Shape::Disc { cx: 160.0, cy: 240.0, r: 12.0 },
            Shape::Square { x: 450, y: 200, side: 70 },
        ],
    );

    let detection = pipeline
        .generate_report(&frame)
        .unwrap()
        .detection()
        .cloned()
        .expect("the disc qualifies");
    assert!(detection.candidate.area < 1000.0);
    assert!((detection.steering.linear + 0.5).abs() < 0.01);
}

#[test]
fn absolute_policy_keeps_close_up_notes() {
    let config = PipelineConfig {
        deviation_policy: DeviationPolicy::Absolute,
        ..PipelineConfig::default()
    };
    let pipeline = NotePipeline::new(config, 640, 480).unwrap();
    for r in [30.0, 40.0, 60.0, 100.0] {
        let frame = scene(640, 480, &[Shape::Disc { cx: 480.0, cy: 240.0, r }]);
        let report = pipeline.generate_report(&frame).unwrap();
        let detection = report.detection().expect("round note at any range");
        assert!(detection.deviation <= 0.0);
        assert!((detection.steering.linear - 0.5).abs() < 0.01);
    }
}

#[test]
fn absolute_policy_prefers_the_bigger_note() {
    let config = PipelineConfig {
        deviation_policy: DeviationPolicy::Absolute,
        ..PipelineConfig::default()
    };
    let pipeline = NotePipeline::new(config, 640, 480).unwrap();
    let frame = scene(
        640,
        480,
        &[
            Shape::Disc { cx: 160.0, cy: 240.0, r: 14.0 },
            Shape::Disc { cx: 480.0, cy: 240.0, r: 45.0 },
        ],
    );
    let detection = pipeline
        .generate_report(&frame)
        .unwrap()
        .detection()
        .cloned()
        .expect("a note");
    assert!(detection.candidate.area > 5000.0);
    assert!((detection.steering.linear - 0.5).abs() < 0.01);
}

#[test]
fn empty_field_publishes_nothing() {
    let pipeline = NotePipeline::new(PipelineConfig::default(), 320, 240).unwrap();
    let frames = Frames(vec![scene(320, 240, &[]), scene(320, 240, &[])]);
    let mut driver = CycleDriver::new(pipeline, frames, Published::default());

    assert_eq!(driver.run_cycle().unwrap(), CycleOutcome::NoNote);
    assert_eq!(driver.run_cycle().unwrap(), CycleOutcome::NoNote);
    assert!(matches!(driver.run_cycle().unwrap(), CycleOutcome::Skipped(_)));

    let (_, _, published) = driver.into_parts();
    assert!(published.0.is_empty());
}

#[test]
fn speckle_below_min_area_is_ignored() {
    let pipeline = NotePipeline::new(PipelineConfig::default(), 320, 240).unwrap();
    let frame = scene(320, 240, &[Shape::Disc { cx: 100.0, cy: 100.0, r: 6.0 }]);
    assert_eq!(pipeline.generate_report(&frame).unwrap(), Report::NoNoteVisible);
}

#[test]
fn identical_frames_give_identical_steering() {
    let mut config = PipelineConfig::default();
    config.quantization.clusters = 4;
    config.morphology.extra_dilation = true;
    let frame = scene(
        240,
        180,
        &[
            Shape::Disc { cx: 70.0, cy: 90.0, r: 20.0 },
            Shape::Disc { cx: 180.0, cy: 60.0, r: 14.0 },
        ],
    );

    let first = NotePipeline::new(config.clone(), 240, 180).unwrap();
    let second = NotePipeline::new(config, 240, 180).unwrap();
    let a = first.steering_value(&frame).unwrap();
    let b = first.steering_value(&frame).unwrap();
    let c = second.steering_value(&frame).unwrap();
    assert!(a.is_some());
    assert_eq!(a, b);
    assert_eq!(a, c);
}
