use std::collections::VecDeque;

use crate::{
    animation::kind::AnimationKind,
    export::events::ExportKind,
    foundation::{
        core::{Fps, Vec2},
        error::{ParallaxError, ParallaxResult},
    },
    gpu::texture::FrameRGBA,
};

/// What the compositor renders for the next export frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameDirective {
    /// Offset to render with.
    pub offset: Vec2,
    /// Render the depth layer instead of the color layer.
    pub show_depth: bool,
}

/// Captured data ready for the sink.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportPayload {
    /// Diffuse and depth layers at zero offset.
    Still {
        /// Color layer.
        diffuse: FrameRGBA,
        /// Depth layer.
        depth: FrameRGBA,
    },
    /// Frames in playback order.
    Video {
        /// Frames.
        frames: Vec<FrameRGBA>,
        /// Playback rate.
        fps: Fps,
    },
}

/// Result of feeding one captured frame to a job.
#[derive(Clone, Debug, PartialEq)]
pub enum JobStep {
    /// More frames are needed. Carries the rendering percentage so far.
    Continue(f64),
    /// Every frame is captured. Carries the final rendering percentage.
    Ready(f64, ExportPayload),
    /// The job cannot complete.
    Failed(String),
}

/// Parameters of a video export.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoExportPlan {
    /// Animation shape.
    pub kind: AnimationKind,
    /// Seconds per animation cycle.
    pub interval_secs: f64,
    /// Offset amplitude.
    pub intensity: f64,
    /// Output frame rate.
    pub fps: Fps,
    /// Approximate output length; rounded down to whole cycles, never below one cycle.
    pub target_secs: f64,
}

impl VideoExportPlan {
    /// Number of whole animation cycles in the video.
    pub fn cycles(&self) -> f64 {
        (self.target_secs / self.interval_secs).floor().max(1.0)
    }

    /// Number of frames in the video.
    pub fn total_frames(&self) -> usize {
        let total = self.cycles() * self.interval_secs * self.fps.as_f64();
        if total.is_finite() && total > 0.0 {
            total.round() as usize
        } else {
            0
        }
    }

    /// `(progress, offset)` pairs in playback order. Progress runs from `0` towards `1`.
    pub fn offset_queue(&self) -> ParallaxResult<VecDeque<(f64, Vec2)>> {
        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            return Err(ParallaxError::validation(
                "video export interval must be positive",
            ));
        }
        if !(self.target_secs.is_finite() && self.target_secs > 0.0) {
            return Err(ParallaxError::validation(
                "video export target length must be positive",
            ));
        }
        let total = self.total_frames();
        let frames_per_cycle = self.interval_secs * self.fps.as_f64();
        Ok((0..total)
            .map(|i| {
                let i = i as f64;
                let progress = i / total as f64;
                let offset = self.kind.offset(i / frames_per_cycle, self.intensity);
                (progress, offset)
            })
            .collect())
    }
}

/// A pending export, advanced one rendered frame at a time.
#[derive(Debug)]
pub enum ExportJob {
    /// Two frames: diffuse, then depth.
    Still {
        /// Captured color layer.
        diffuse: Option<FrameRGBA>,
    },
    /// One frame per queued offset.
    Video {
        /// Remaining `(progress, offset)` pairs.
        queue: VecDeque<(f64, Vec2)>,
        /// Queue length at start.
        total: usize,
        /// Captured frames.
        frames: Vec<FrameRGBA>,
        /// Output frame rate.
        fps: Fps,
        /// Progress of the frame currently being rendered.
        in_flight: Option<f64>,
    },
}

impl ExportJob {
    /// Still export job.
    pub fn still() -> Self {
        Self::Still { diffuse: None }
    }

    /// Video export job. Fails on an empty queue.
    pub fn video(plan: &VideoExportPlan) -> ParallaxResult<Self> {
        let queue = plan.offset_queue()?;
        if queue.is_empty() {
            return Err(ParallaxError::export("video export offset queue is empty"));
        }
        let total = queue.len();
        Ok(Self::Video {
            queue,
            total,
            frames: Vec::with_capacity(total),
            fps: plan.fps,
            in_flight: None,
        })
    }

    /// Which export this is.
    pub fn kind(&self) -> ExportKind {
        match self {
            Self::Still { .. } => ExportKind::Still,
            Self::Video { .. } => ExportKind::Video,
        }
    }

    /// Directive for the next frame, or `None` if the job has nothing left to render.
    pub fn before_frame(&mut self) -> Option<FrameDirective> {
        match self {
            Self::Still { diffuse } => Some(FrameDirective {
                offset: Vec2::ZERO,
                show_depth: diffuse.is_some(),
            }),
            Self::Video {
                queue, in_flight, ..
            } => {
                let (progress, offset) = queue.pop_front()?;
                *in_flight = Some(progress);
                Some(FrameDirective {
                    offset,
                    show_depth: false,
                })
            }
        }
    }

    /// Feed the snapshot of the frame rendered for the last directive.
    pub fn after_frame(&mut self, frame: Option<FrameRGBA>) -> JobStep {
        let Some(frame) = frame.filter(|f| !f.is_degenerate()) else {
            return JobStep::Failed("snapshot returned no frame data".to_string());
        };
        match self {
            Self::Still { diffuse } => match diffuse.take() {
                None => {
                    *diffuse = Some(frame);
                    JobStep::Continue(50.0)
                }
                Some(d) => JobStep::Ready(
                    100.0,
                    ExportPayload::Still {
                        diffuse: d,
                        depth: frame,
                    },
                ),
            },
            Self::Video {
                queue,
                total,
                frames,
                fps,
                in_flight,
            } => {
                if in_flight.take().is_none() {
                    return JobStep::Failed("frame captured without a queued offset".to_string());
                }
                if frames.first().is_some_and(|f| f.size() != frame.size()) {
                    return JobStep::Failed(format!(
                        "frame size changed mid-export from {} to {}",
                        frames[0].size(),
                        frame.size()
                    ));
                }
                frames.push(frame);
                let pct = frames.len() as f64 / *total as f64 * 100.0;
                if queue.is_empty() {
                    JobStep::Ready(
                        pct,
                        ExportPayload::Video {
                            frames: std::mem::take(frames),
                            fps: *fps,
                        },
                    )
                } else {
                    JobStep::Continue(pct)
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/job.rs"]
mod tests;
