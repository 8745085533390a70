// THEORY:
// The `CycleDriver` is the thin loop around the pipeline: fetch one frame, run one
// pass, publish at most one value, time it. Nothing about a bad cycle is allowed to
// stop the loop; an unreadable frame or a dropped datagram is logged and the next
// cycle starts as if nothing happened. Only start-up errors are fatal, and those are
// raised before a driver exists.

use crate::error::VisionError;
use crate::interfaces::{FrameSource, TelemetryPublisher};
use crate::pipeline::NotePipeline;
use log::{debug, info, warn};
use std::time::Instant;

/// Guards the FPS division against a cycle measured as taking no time.
const MIN_CYCLE_SECONDS: f64 = 1e-9;

/// What happened in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published(f64),
    NoNote,
    Skipped(String),
}

/// Running totals over the cycles a driver has executed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    pub cycles: u64,
    pub published: u64,
    pub no_note: u64,
    pub skipped: u64,
    pub total_seconds: f64,
}

impl CycleStats {
    pub fn average_fps(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.cycles as f64 / self.total_seconds.max(MIN_CYCLE_SECONDS)
    }

    fn record(&mut self, outcome: &CycleOutcome, seconds: f64) {
        self.cycles += 1;
        self.total_seconds += seconds;
        match outcome {
            CycleOutcome::Published(_) => self.published += 1,
            CycleOutcome::NoNote => self.no_note += 1,
            CycleOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

pub struct CycleDriver<S, P> {
    pipeline: NotePipeline,
    source: S,
    publisher: P,
    stats: CycleStats,
}

impl<S: FrameSource, P: TelemetryPublisher> CycleDriver<S, P> {
    pub fn new(pipeline: NotePipeline, source: S, publisher: P) -> Self {
        Self {
            pipeline,
            source,
            publisher,
            stats: CycleStats::default(),
        }
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn pipeline(&self) -> &NotePipeline {
        &self.pipeline
    }

    pub fn into_parts(self) -> (NotePipeline, S, P) {
        (self.pipeline, self.source, self.publisher)
    }

    /// Runs one fetch-process-publish cycle. Per-cycle faults become
    /// `CycleOutcome::Skipped`; anything else is returned as an error.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, VisionError> {
        let started = Instant::now();
        let outcome = self.cycle_outcome()?;
        let seconds = started.elapsed().as_secs_f64();
        self.stats.record(&outcome, seconds);

        debug!(
            "cycle {} {:?} in {:.4}s ({:.1} FPS)",
            self.stats.cycles,
            outcome,
            seconds,
            1.0 / seconds.max(MIN_CYCLE_SECONDS)
        );
        Ok(outcome)
    }

    fn cycle_outcome(&mut self) -> Result<CycleOutcome, VisionError> {
        let report = match self
            .source
            .next_frame()
            .and_then(|frame| self.pipeline.generate_report(&frame))
        {
            Ok(report) => report,
            Err(err) if err.is_per_cycle() => {
                warn!("skipping cycle: {err}");
                return Ok(CycleOutcome::Skipped(err.to_string()));
            }
            Err(err) => return Err(err),
        };

        let Some(value) = report.steering(self.pipeline.config().steering_form) else {
            return Ok(CycleOutcome::NoNote);
        };

        match self.publisher.publish(value) {
            Ok(()) => Ok(CycleOutcome::Published(value)),
            Err(err) if err.is_per_cycle() => {
                warn!("dropping steering value {value:.4}: {err}");
                Ok(CycleOutcome::Skipped(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Runs `cycles` cycles, or forever when `None`.
    pub fn run(&mut self, cycles: Option<u64>) -> Result<&CycleStats, VisionError> {
        let mut remaining = cycles;
        while remaining != Some(0) {
            self.run_cycle()?;
            remaining = remaining.map(|n| n - 1);
        }
        info!(
            "{} cycles: {} published, {} without a note, {} skipped, {:.1} FPS average",
            self.stats.cycles,
            self.stats.published,
            self.stats.no_note,
            self.stats.skipped,
            self.stats.average_fps()
        );
        Ok(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::core_modules::segmenter::Frame;
    use image::{Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::io;

    struct ScriptedSource(VecDeque<Result<Frame, VisionError>>);

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Frame, VisionError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(VisionError::NoFrame("script exhausted".into())))
        }
    }

    #[derive(Default)]
    struct Recorder {
        values: Vec<f64>,
        fail: bool,
    }

    impl TelemetryPublisher for Recorder {
        fn publish(&mut self, steering: f64) -> Result<(), VisionError> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "no listener").into());
            }
            self.values.push(steering);
            Ok(())
        }
    }

    fn frame(note: Option<(f64, f64)>) -> Frame {
        RgbImage::from_fn(160, 120, |x, y| match note {
            Some((cx, cy)) if (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2) <= 225.0 => {
                Rgb([255, 128, 0])
            }
            _ => Rgb([30, 30, 30]),
        })
    }

    fn driver(
        frames: Vec<Result<Frame, VisionError>>,
        recorder: Recorder,
    ) -> CycleDriver<ScriptedSource, Recorder> {
        let pipeline = NotePipeline::new(PipelineConfig::default(), 160, 120).unwrap();
        CycleDriver::new(pipeline, ScriptedSource(frames.into()), recorder)
    }

    #[test]
    fn publishes_only_when_a_note_is_seen() {
        let mut driver = driver(
            vec![Ok(frame(Some((120.0, 60.0)))), Ok(frame(None)), Ok(frame(Some((40.0, 60.0))))],
            Recorder::default(),
        );
        let stats = driver.run(Some(3)).unwrap().clone();
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.no_note, 1);

        let (_, _, recorder) = driver.into_parts();
        assert_eq!(recorder.values.len(), 2);
        assert!((recorder.values[0] - 0.5).abs() < 0.02);
        assert!((recorder.values[1] + 0.5).abs() < 0.02);
    }

    #[test]
    fn bad_frames_skip_the_cycle_without_stopping_the_loop() {
        let mut driver = driver(
            vec![
                Err(VisionError::NoFrame("camera hiccup".into())),
                Ok(RgbImage::new(0, 0)),
                Ok(RgbImage::new(80, 60)),
                Ok(frame(Some((80.0, 60.0)))),
            ],
            Recorder::default(),
        );
        let outcomes: Vec<CycleOutcome> = (0..4).map(|_| driver.run_cycle().unwrap()).collect();
        assert!(matches!(outcomes[0], CycleOutcome::Skipped(_)));
        assert!(matches!(outcomes[1], CycleOutcome::Skipped(_)));
        assert!(matches!(outcomes[2], CycleOutcome::Skipped(_)));
        assert!(matches!(outcomes[3], CycleOutcome::Published(_)));
        assert_eq!(driver.stats().skipped, 3);
    }

    #[test]
    fn publish_failures_are_skipped_cycles() {
        let mut driver = driver(
            vec![Ok(frame(Some((80.0, 60.0))))],
            Recorder {
                fail: true,
                ..Recorder::default()
            },
        );
        assert!(matches!(driver.run_cycle().unwrap(), CycleOutcome::Skipped(_)));
    }

    #[test]
    fn zero_cycles_runs_nothing() {
        let mut driver = driver(Vec::new(), Recorder::default());
        let stats = driver.run(Some(0)).unwrap();
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.average_fps(), 0.0);
    }
}
