use crate::{
    animation::kind::AnimationKind,
    foundation::{
        core::{Size2, Vec2, clamp_offset},
        math::ieee_remainder,
    },
};

/// Pan translation, as a fraction of the view extent, that maps to one unit of offset.
pub const PAN_SCALE: f64 = 0.3;

/// Who drives the offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetState {
    /// The animation function, from elapsed time.
    IdleAnimating,
    /// A pan gesture.
    UserDragging,
    /// The pending export job.
    Exporting,
}

/// Phase of a pan gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanPhase {
    /// Finger down: animation is suspended.
    Began,
    /// Finger moved.
    Changed,
    /// Finger up: animation resumes.
    Ended,
}

/// Parameters of the idle animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    /// Motion shape.
    pub kind: AnimationKind,
    /// Seconds per cycle.
    pub interval_secs: f64,
    /// Offset amplitude.
    pub intensity: f64,
    /// `false` while paused.
    pub should_animate: bool,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            kind: AnimationKind::TurnTable,
            interval_secs: 4.0,
            intensity: 0.05,
            should_animate: true,
        }
    }
}

impl AnimationState {
    /// Progress at `elapsed_secs`: `0.5` at every multiple of the interval, wrapping through
    /// `[0, 1]` between them.
    pub fn progress_at(&self, elapsed_secs: f64) -> f64 {
        if self.interval_secs <= 0.0 || !self.interval_secs.is_finite() {
            return 0.5;
        }
        0.5 + ieee_remainder(elapsed_secs, self.interval_secs) / self.interval_secs
    }

    /// Offset the animation function produces at `elapsed_secs`.
    pub fn offset_at(&self, elapsed_secs: f64) -> Vec2 {
        self.kind.offset(self.progress_at(elapsed_secs), self.intensity)
    }
}

/// Offset for a pan of `translation` points inside a view of `view_size` points.
pub fn pan_offset(translation: Vec2, view_size: Size2) -> Vec2 {
    if view_size.is_empty() {
        return Vec2::ZERO;
    }
    clamp_offset(Vec2::new(
        translation.x / f64::from(view_size.width) * PAN_SCALE,
        translation.y / f64::from(view_size.height) * PAN_SCALE,
    ))
}

/// Owns the current offset and decides, per frame, where it comes from.
#[derive(Clone, Debug)]
pub struct OffsetController {
    animation: AnimationState,
    state: OffsetState,
    offset: Vec2,
    drag_suspended: bool,
}

impl OffsetController {
    /// Idle controller with zero offset.
    pub fn new(animation: AnimationState) -> Self {
        Self {
            animation,
            state: OffsetState::IdleAnimating,
            offset: Vec2::ZERO,
            drag_suspended: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> OffsetState {
        self.state
    }

    /// Offset of the most recent frame or gesture.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Animation parameters.
    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    /// Change the animation shape. Returns `true` if it changed.
    pub fn set_kind(&mut self, kind: AnimationKind) -> bool {
        replace_if_changed(&mut self.animation.kind, kind)
    }

    /// Change the cycle length. Returns `true` if it changed.
    pub fn set_interval_secs(&mut self, secs: f64) -> bool {
        replace_if_changed(&mut self.animation.interval_secs, secs)
    }

    /// Change the amplitude. Returns `true` if it changed.
    pub fn set_intensity(&mut self, intensity: f64) -> bool {
        replace_if_changed(&mut self.animation.intensity, intensity)
    }

    /// Pause or resume the idle animation. The next frame observes the change.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        replace_if_changed(&mut self.animation.should_animate, !paused)
    }

    /// Advance to `elapsed_secs` and return the offset to render with.
    pub fn tick(&mut self, elapsed_secs: f64) -> Vec2 {
        if self.state == OffsetState::IdleAnimating && self.animation.should_animate {
            self.offset = self.animation.offset_at(elapsed_secs);
        }
        self.offset
    }

    /// Apply a pan gesture. Ignored while exporting; returns whether it was applied.
    pub fn pan(&mut self, phase: PanPhase, translation: Vec2, view_size: Size2) -> bool {
        if self.state == OffsetState::Exporting {
            return false;
        }
        match phase {
            PanPhase::Began => {
                self.state = OffsetState::UserDragging;
                self.drag_suspended = true;
            }
            PanPhase::Changed => {
                if self.state != OffsetState::UserDragging {
                    self.state = OffsetState::UserDragging;
                    self.drag_suspended = true;
                }
            }
            PanPhase::Ended => {
                self.state = OffsetState::IdleAnimating;
                self.drag_suspended = false;
            }
        }
        self.offset = pan_offset(translation, view_size);
        true
    }

    /// Hand the offset to an export job. Fails if an export already owns it.
    pub fn begin_export(&mut self) -> bool {
        if self.state == OffsetState::Exporting {
            return false;
        }
        self.state = OffsetState::Exporting;
        self.drag_suspended = false;
        true
    }

    /// Offset chosen by the export job for the next frame.
    pub fn set_export_offset(&mut self, offset: Vec2) {
        if self.state == OffsetState::Exporting {
            self.offset = offset;
        }
    }

    /// Return to idle animation once the export job is drained.
    pub fn end_export(&mut self) {
        if self.state == OffsetState::Exporting {
            self.state = OffsetState::IdleAnimating;
        }
    }

    /// `true` while a gesture holds the offset.
    pub fn is_dragging(&self) -> bool {
        self.drag_suspended
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
#[path = "../../tests/unit/animation/controller.rs"]
mod tests;
