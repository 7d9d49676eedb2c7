use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::{
    animation::{controller::AnimationState, kind::AnimationKind},
    assets::parallax_image::DepthConvention,
    export::job::VideoExportPlan,
    foundation::{
        core::{
            BLUR_INTENSITY_RANGE, ClearColor, FOCAL_POINT_RANGE, Fps, INTENSITY_RANGE,
            INTERVAL_SECS_RANGE, check_range,
        },
        error::{ParallaxError, ParallaxResult},
    },
};

/// User-facing parameters of the effect, loadable from JSON.
///
/// Missing fields take their defaults, so a settings file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallaxSettings {
    /// Idle motion shape.
    pub animation: AnimationKind,
    /// Seconds per animation cycle, `1..=10`.
    pub interval_secs: f64,
    /// Offset amplitude, `0..=0.1`.
    pub intensity: f64,
    /// Depth that does not move and stays sharp, `0..=1`.
    pub focal_point: f32,
    /// Depth-of-field strength, `0..=3`. Zero disables the blur passes.
    pub blur_intensity: f32,
    /// How depth inputs encode near and far.
    pub depth_convention: DepthConvention,
    /// Color written where nothing is drawn.
    pub clear_color: ClearColor,
    /// Render loop rate.
    pub display_fps: Fps,
    /// Video export frame rate.
    pub export_fps: Fps,
    /// Approximate video length, rounded down to whole cycles.
    pub export_target_secs: f64,
}

impl Default for ParallaxSettings {
    fn default() -> Self {
        Self {
            animation: AnimationKind::TurnTable,
            interval_secs: 4.0,
            intensity: 0.05,
            focal_point: 0.5,
            blur_intensity: 0.0,
            depth_convention: DepthConvention::NearIsOne,
            clear_color: ClearColor::OPAQUE_BLACK,
            display_fps: Fps { num: 60, den: 1 },
            export_fps: Fps { num: 30, den: 1 },
            export_target_secs: 10.0,
        }
    }
}

impl ParallaxSettings {
    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> ParallaxResult<()> {
        check_range("interval_secs", self.interval_secs, &INTERVAL_SECS_RANGE)?;
        check_range("intensity", self.intensity, &INTENSITY_RANGE)?;
        check_range("focal_point", f64::from(self.focal_point), &FOCAL_POINT_RANGE)?;
        check_range(
            "blur_intensity",
            f64::from(self.blur_intensity),
            &BLUR_INTENSITY_RANGE,
        )?;
        if !(self.export_target_secs.is_finite() && self.export_target_secs > 0.0) {
            return Err(ParallaxError::validation(
                "export_target_secs must be positive",
            ));
        }
        for (name, fps) in [("display_fps", self.display_fps), ("export_fps", self.export_fps)] {
            if fps.num == 0 || fps.den == 0 {
                return Err(ParallaxError::validation(format!(
                    "{name} must have num>0 and den>0"
                )));
            }
        }
        self.clear_color.validate()
    }

    /// Parse settings from a JSON string and validate them.
    pub fn from_json(s: &str) -> ParallaxResult<Self> {
        let settings: Self =
            serde_json::from_str(s).map_err(|e| ParallaxError::serde(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a JSON settings file.
    pub fn from_path(path: impl AsRef<Path>) -> ParallaxResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open settings '{}'", path.display()))?;
        let settings: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ParallaxError::serde(format!("parse '{}': {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> ParallaxResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ParallaxError::serde(e.to_string()))
    }

    /// Idle animation parameters described by these settings.
    pub fn animation_state(&self) -> AnimationState {
        AnimationState {
            kind: self.animation,
            interval_secs: self.interval_secs,
            intensity: self.intensity,
            should_animate: true,
        }
    }

    /// Video export plan for the current animation.
    pub fn video_plan(&self) -> VideoExportPlan {
        VideoExportPlan {
            kind: self.animation,
            interval_secs: self.interval_secs,
            intensity: self.intensity,
            fps: self.export_fps,
            target_secs: self.export_target_secs,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/settings.rs"]
mod tests;
