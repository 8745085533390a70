// THEORY:
// A robot with more than one camera runs one `NotePipeline` per stream. The
// pipelines share nothing mutable, so the only coordination needed is a cap on how
// many passes run at once. Each pass is CPU-bound and runs on tokio's blocking pool;
// a semaphore sized to the machine's cores keeps the streams from oversubscribing it.

use crate::core_modules::segmenter::Frame;
use crate::error::VisionError;
use crate::pipeline::{NotePipeline, Report};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct ParallelPipeline {
    streams: Vec<Arc<NotePipeline>>,
    permits: Arc<Semaphore>,
}

impl ParallelPipeline {
    /// One pipeline per stream, with as many concurrent passes as there are CPUs.
    pub fn new(pipelines: Vec<NotePipeline>) -> Self {
        Self::with_workers(pipelines, num_cpus::get())
    }

    pub fn with_workers(pipelines: Vec<NotePipeline>, workers: usize) -> Self {
        Self {
            streams: pipelines.into_iter().map(Arc::new).collect(),
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Processes `frames[i]` with stream `i`'s pipeline. Results come back in stream order.
    pub async fn process_frames(
        &self,
        frames: Vec<Frame>,
    ) -> Result<Vec<Result<Report, VisionError>>, VisionError> {
        if frames.len() != self.streams.len() {
            return Err(VisionError::Worker(format!(
                "expected one frame per stream ({}), got {}",
                self.streams.len(),
                frames.len()
            )));
        }

        let passes = self.streams.iter().cloned().zip(frames).map(|(pipeline, frame)| {
            let permits = Arc::clone(&self.permits);
            async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(err) => return Err(VisionError::Worker(err.to_string())),
                };
                match tokio::task::spawn_blocking(move || pipeline.generate_report(&frame)).await {
                    Ok(report) => report,
                    Err(err) => Err(VisionError::Worker(err.to_string())),
                }
            }
        });

        Ok(join_all(passes).await)
    }
}
