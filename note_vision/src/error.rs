// THEORY:
// Every failure the vision engine can report lives here. The per-cycle faults
// (`NoFrame`, `InvalidFrame`, `Telemetry`) are local: the cycle driver logs them and
// skips the cycle. `DegenerateGeometry` and `Config` are raised once, at start-up, and are
// fatal to the process. "No note visible" is deliberately NOT an error; it is the
// `Report::NoNoteVisible` value produced by the pipeline.

use std::path::PathBuf;

/// Problems with a `PipelineConfig`, detected by `PipelineConfig::validate` or while
/// loading one from disk.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("colour range is inverted on channel {channel}: low {low} > high {high}")]
    InvertedColorRange { channel: &'static str, low: u8, high: u8 },

    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("morphology kernel size must be 0 or an odd number of pixels (got {0})")]
    EvenKernel(u8),

    #[error("quantization cluster count {clusters} exceeds the supported maximum of {max}")]
    TooManyClusters { clusters: usize, max: usize },

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors produced while running the detection pipeline or its cycle driver.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    /// The frame source had nothing to hand over this cycle.
    #[error("frame source produced no frame: {0}")]
    NoFrame(String),

    /// The frame exists but cannot be processed (empty, or not the start-up geometry).
    #[error("invalid frame ({width}x{height}): {reason}")]
    InvalidFrame {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    /// A frame width that leaves no intake axis to steer against.
    #[error("degenerate frame geometry: width {width} gives an intake axis of zero")]
    DegenerateGeometry { width: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("telemetry publish failed: {0}")]
    Telemetry(#[from] std::io::Error),

    #[error("pipeline worker failed: {0}")]
    Worker(String),
}

impl VisionError {
    /// Whether the error only affects the current cycle. Anything else is fatal.
    pub fn is_per_cycle(&self) -> bool {
        matches!(
            self,
            VisionError::NoFrame(_) | VisionError::InvalidFrame { .. } | VisionError::Telemetry(_)
        )
    }
}
