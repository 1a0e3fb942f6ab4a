use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use super::CaptureSource;
use crate::frame::LatestFrame;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Background thread that keeps the latest-frame slot fresh.
pub struct CaptureFeed {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<()>>,
}

impl CaptureFeed {
    /// Connect `source` and publish one frame per tick at `target_fps`.
    ///
    /// The loop ends when [`stop`](Self::stop) is called or a capture fails.
    pub fn spawn(
        mut source: CaptureSource,
        latest: Arc<LatestFrame>,
        target_fps: u32,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let interval = Duration::from_secs_f64(1.0 / target_fps.max(1) as f64);
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || -> Result<()> {
                source.connect()?;
                let mut last_health_log = Instant::now();
                while !stop_flag.load(Ordering::Acquire) {
                    let tick = Instant::now();
                    let frame = source.next_frame()?;
                    latest.publish(frame)?;

                    if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                        let stats = source.stats();
                        log::debug!(
                            "capture health={} frames={} url={}",
                            source.is_healthy(),
                            stats.frames_captured,
                            stats.url
                        );
                        last_health_log = Instant::now();
                    }
                    if let Some(remaining) = interval.checked_sub(tick.elapsed()) {
                        std::thread::sleep(remaining);
                    }
                }
                Ok(())
            })
            .context("failed to spawn capture thread")?;

        Ok(Self { stop, thread })
    }

    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Signal the loop to stop and wait for it.
    pub fn stop(self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        self.thread
            .join()
            .map_err(|_| anyhow!("capture thread panicked"))?
    }
}
