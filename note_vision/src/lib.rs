// THEORY:
// This file is the main entry point for the `note_vision` library crate. It exposes
// the `NotePipeline` and the data it produces (`Report`, `Detection`,
// `SteeringValue`) as the high-level interface, together with the `CycleDriver` that
// runs a pipeline against a camera and a telemetry sink.
//
// The stages themselves live in `core_modules`. They are public so that tools can
// inspect intermediate masks and candidates, but a consumer steering a robot only
// needs `NotePipeline::new` and `generate_report`.

pub mod config;
pub mod core_modules;
pub mod driver;
pub mod error;
pub mod interfaces;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{DeviationPolicy, PipelineConfig, ReferencePoint, SteeringForm};
pub use core_modules::segmenter::{Frame, Mask};
pub use core_modules::steering::SteeringValue;
pub use driver::{CycleDriver, CycleOutcome, CycleStats};
pub use error::{ConfigError, VisionError};
pub use interfaces::{FrameSource, TelemetryPublisher};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{Detection, NotePipeline, Report};
