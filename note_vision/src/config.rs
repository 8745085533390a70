// THEORY:
// The `config` module holds every tunable knob of the note detector. A single
// `PipelineConfig` is built (or loaded from JSON) at start-up, validated once, and
// then shared read-only by every cycle. Nothing here is hot-reloaded.
//
// The defaults reproduce the values the robot has been tuned with: an orange band
// of (0,100,100)..(30,255,255) on the 8-bit HSV scale, a 300 px² speckle floor, a
// 5x5 opening kernel and, when quantization is switched on, eight colour clusters
// picked as the most compact of five seeded k-means runs.
//
// Two independent policy axes are exposed instead of being hard-coded:
// - how circularity is scored (`DeviationPolicy`), and
// - which point of the chosen shape is steered at (`ReferencePoint`).

use crate::core_modules::hsv::HsvPixel;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest k accepted for colour quantization.
pub const MAX_CLUSTERS: usize = 64;

/// Cluster count the robot was tuned with when quantization is on.
pub const TUNED_CLUSTERS: usize = 8;

/// One corner of the HSV colour band, on the 8-bit scale (hue 0..180, sat/value 0..255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBound {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

impl HsvBound {
    pub const fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }
}

/// Closed HSV interval a pixel must fall into, on every channel, to be note material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub low: HsvBound,
    pub high: HsvBound,
}

impl Default for ColorRange {
    fn default() -> Self {
        Self {
            low: HsvBound::new(0, 100, 100),
            high: HsvBound::new(30, 255, 255),
        }
    }
}

impl ColorRange {
    /// Inclusive on both ends, like `inRange`.
    #[inline]
    pub fn contains(&self, pixel: HsvPixel) -> bool {
        (self.low.hue..=self.high.hue).contains(&pixel.hue)
            && (self.low.saturation..=self.high.saturation).contains(&pixel.saturation)
            && (self.low.value..=self.high.value).contains(&pixel.value)
    }
}

/// K-means colour quantization applied before thresholding.
///
/// Clustering is the most expensive step of a cycle. It smooths lighting noise out of
/// the frame, at the cost of latency, so it is off unless `clusters` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    /// Number of representative colours. `0` disables quantization.
    pub clusters: usize,
    /// Upper bound on Lloyd iterations.
    pub max_iterations: u32,
    /// Iteration stops once no centre moves further than this (in RGB units).
    pub epsilon: f64,
    /// Independent k-means++ restarts; the most compact palette is kept.
    pub attempts: u32,
    /// Seed for k-means++ initialisation, so identical frames quantize identically.
    pub seed: u64,
    /// Centres are fitted on every `sample_stride`-th pixel; every pixel is still remapped.
    pub sample_stride: usize,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            clusters: 0,
            max_iterations: 20,
            epsilon: 1.0,
            attempts: 5,
            seed: 0x5eed,
            sample_stride: 1,
        }
    }
}

impl QuantizationConfig {
    /// Quantization switched on with the tuned cluster count.
    pub fn tuned() -> Self {
        Self {
            clusters: TUNED_CLUSTERS,
            ..Self::default()
        }
    }

    pub fn enabled(&self) -> bool {
        self.clusters > 0
    }
}

/// Noise suppression applied to the thresholded mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Side of the square structuring element. `0` or `1` disables the opening.
    pub kernel_size: u8,
    /// Dilate once more after the opening to reconnect a note split by glare.
    /// Over-dilation merges neighbouring shapes, so this is off by default.
    pub extra_dilation: bool,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            extra_dilation: false,
        }
    }
}

impl MorphologyConfig {
    /// Chebyshev radius of the structuring element (`kernel_size / 2`).
    pub fn radius(&self) -> u8 {
        self.kernel_size / 2
    }
}

/// How far a candidate departs from the circle that encloses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationPolicy {
    /// Signed `area - circle area` in px², gated by `max_deviation`. Scale-dependent:
    /// larger shapes score lower.
    Absolute,
    /// `|area - circle area| / area`. Scale-invariant; no ceiling is applied.
    #[default]
    Normalized,
}

/// Which point of the selected shape the steering value is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    /// First-order moment centroid; falls back to the circle centre for zero-area shapes.
    #[default]
    Centroid,
    /// Centre of the minimum enclosing circle.
    CircleCenter,
}

/// The value handed to the telemetry publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringForm {
    /// `(x - axis) / axis`, roughly in [-1, 1].
    #[default]
    Linear,
    /// Bearing in radians from the bottom-centre of the frame.
    Angular,
}

/// Configuration for the `NotePipeline`. Read-only after start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub color_range: ColorRange,
    pub quantization: QuantizationConfig,
    pub morphology: MorphologyConfig,
    /// Shapes smaller than this (px²) are speckle and never scored.
    pub min_area: f64,
    /// Ceiling for `DeviationPolicy::Absolute`; ignored by the normalized policy.
    pub max_deviation: f64,
    pub deviation_policy: DeviationPolicy,
    pub reference_point: ReferencePoint,
    pub steering_form: SteeringForm,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color_range: ColorRange::default(),
            quantization: QuantizationConfig::default(),
            morphology: MorphologyConfig::default(),
            min_area: 300.0,
            max_deviation: 100.0,
            deviation_policy: DeviationPolicy::default(),
            reference_point: ReferencePoint::default(),
            steering_form: SteeringForm::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants every cycle relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ColorRange { low, high } = self.color_range;
        for (channel, lo, hi) in [
            ("hue", low.hue, high.hue),
            ("saturation", low.saturation, high.saturation),
            ("value", low.value, high.value),
        ] {
            if lo > hi {
                return Err(ConfigError::InvertedColorRange {
                    channel,
                    low: lo,
                    high: hi,
                });
            }
        }

        for (name, value) in [
            ("min_area", self.min_area),
            ("max_deviation", self.max_deviation),
            ("quantization.epsilon", self.quantization.epsilon),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if self.quantization.sample_stride == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "quantization.sample_stride",
                value: 0.0,
            });
        }
        if self.quantization.attempts == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "quantization.attempts",
                value: 0.0,
            });
        }

        if self.quantization.clusters > MAX_CLUSTERS {
            return Err(ConfigError::TooManyClusters {
                clusters: self.quantization.clusters,
                max: MAX_CLUSTERS,
            });
        }

        let kernel = self.morphology.kernel_size;
        if kernel != 0 && kernel % 2 == 0 {
            return Err(ConfigError::EvenKernel(kernel));
        }

        Ok(())
    }
}
