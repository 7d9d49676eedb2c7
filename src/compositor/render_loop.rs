use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
    compositor::frame_compositor::{FrameCompositor, FrameOutcome},
    foundation::{
        core::Fps,
        error::{ParallaxError, ParallaxResult},
    },
};

/// Drives [`FrameCompositor::draw`] from a dedicated thread at a fixed rate.
///
/// Elapsed time is wall-clock time since [`RenderLoop::spawn`]. Late frames are not caught up;
/// the schedule restarts from the current instant.
pub struct RenderLoop {
    stop: Arc<AtomicBool>,
    presented: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Start drawing `compositor` at `fps`.
    pub fn spawn(compositor: Arc<Mutex<FrameCompositor>>, fps: Fps) -> ParallaxResult<Self> {
        if fps.num == 0 || fps.den == 0 {
            return Err(ParallaxError::validation("render loop fps must be non-zero"));
        }
        let period = Duration::from_secs_f64(fps.frame_duration_secs());
        let stop = Arc::new(AtomicBool::new(false));
        let presented = Arc::new(AtomicU64::new(0));

        let worker = {
            let stop = Arc::clone(&stop);
            let presented = Arc::clone(&presented);
            thread::Builder::new()
                .name("parallaxfx-render".to_string())
                .spawn(move || {
                    let start = Instant::now();
                    let mut next = start;
                    while !stop.load(Ordering::Acquire) {
                        let elapsed = start.elapsed().as_secs_f64();
                        if compositor.lock().draw(elapsed) == FrameOutcome::Presented {
                            presented.fetch_add(1, Ordering::AcqRel);
                        }
                        next += period;
                        let now = Instant::now();
                        if next > now {
                            thread::sleep(next - now);
                        } else {
                            next = now;
                        }
                    }
                    tracing::debug!("render loop stopped");
                })
                .map_err(|e| ParallaxError::resource(format!("spawn render thread: {e}")))?
        };

        tracing::debug!(fps = fps.as_f64(), "render loop started");
        Ok(Self {
            stop,
            presented,
            worker: Some(worker),
        })
    }

    /// Frames presented so far.
    pub fn presented_frames(&self) -> u64 {
        self.presented.load(Ordering::Acquire)
    }

    /// Stop the loop and wait for the current frame to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("render thread panicked");
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/render_loop.rs"]
mod tests;
