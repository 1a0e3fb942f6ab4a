use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::depth::DepthCalibrator;
use crate::frame::Frame;

use super::estimate::EstimationPipeline;
use super::progress::ProgressObserver;
use super::result::{EstimationError, EstimationRun};

/// Message from the worker thread.
#[derive(Debug)]
pub enum RunEvent {
    Progress { fraction: f32, label: String },
    Finished(Result<EstimationRun, EstimationError>),
}

/// Clears the in-flight flag when the run ends, however it ends.
struct RunGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Starts pipeline runs on a worker thread, at most one at a time.
///
/// A trigger that arrives while a run is in flight is dropped, not queued.
pub struct PipelineRunner {
    pipeline: EstimationPipeline,
    calibrator: DepthCalibrator,
    in_flight: Arc<AtomicBool>,
}

impl PipelineRunner {
    pub fn new(pipeline: EstimationPipeline, calibrator: DepthCalibrator) -> Self {
        Self {
            pipeline,
            calibrator,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a run on `frame`.
    ///
    /// Returns `Ok(None)` when a run is already in flight. Depth calibration
    /// happens before the worker starts; a degenerate depth map is returned as
    /// an error and no run is started.
    pub fn trigger(&self, frame: Arc<Frame>) -> Result<Option<RunHandle>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::info!("estimation already in progress; ignoring trigger");
            return Ok(None);
        }
        let guard = RunGuard {
            in_flight: Arc::clone(&self.in_flight),
        };

        let calibrated = match &frame.depth {
            Some(raw) => Some(Arc::new(
                self.calibrator
                    .calibrate(raw)
                    .context("depth calibration rejected the frame")?,
            )),
            None => None,
        };

        let pipeline = self.pipeline.clone();
        let (tx, rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("estimation".to_string())
            .spawn(move || {
                let progress_tx = tx.clone();
                let mut observer = move |fraction: f32, label: &str| {
                    let _ = progress_tx.send(RunEvent::Progress {
                        fraction,
                        label: label.to_string(),
                    });
                };
                let outcome = match calibrated {
                    Some(depth) => pipeline.estimate_with_depth(&frame.color, depth, &mut observer),
                    None => pipeline.estimate_without_depth(&frame.color, &mut observer),
                };
                // Release before reporting so a caller reacting to the result can trigger again.
                drop(guard);
                finish(&tx, outcome);
            })
            .context("failed to spawn estimation worker")?;

        Ok(Some(RunHandle { events: rx, thread }))
    }
}

fn finish(tx: &Sender<RunEvent>, outcome: Result<EstimationRun, EstimationError>) {
    if tx.send(RunEvent::Finished(outcome)).is_err() {
        log::debug!("estimation result dropped; receiver gone");
    }
}

/// Handle to one in-flight run.
pub struct RunHandle {
    events: Receiver<RunEvent>,
    thread: JoinHandle<()>,
}

impl RunHandle {
    /// Raw event stream, for callers that poll.
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    /// Block until the run ends, forwarding progress to `observer`.
    ///
    /// Returns `None` when the worker died without reporting an outcome.
    pub fn wait(
        self,
        observer: &mut dyn ProgressObserver,
    ) -> Option<Result<EstimationRun, EstimationError>> {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                RunEvent::Progress { fraction, label } => observer.on_progress(fraction, &label),
                RunEvent::Finished(result) => outcome = Some(result),
            }
        }
        if self.thread.join().is_err() {
            log::warn!("estimation worker panicked");
        }
        outcome
    }
}
