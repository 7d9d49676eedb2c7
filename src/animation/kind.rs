use std::f64::consts::TAU;

use crate::foundation::{
    core::Vec2,
    error::{ParallaxError, ParallaxResult},
};

/// Shape of the idle viewpoint motion.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    /// The viewpoint circles the focal plane.
    #[default]
    TurnTable,
    /// The viewpoint swings left and right.
    HorizontalSwitch,
    /// The viewpoint swings up and down.
    VerticalSwitch,
}

impl AnimationKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 3] = [Self::TurnTable, Self::HorizontalSwitch, Self::VerticalSwitch];

    /// Stable snake_case name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            Self::TurnTable => "turn_table",
            Self::HorizontalSwitch => "horizontal_switch",
            Self::VerticalSwitch => "vertical_switch",
        }
    }

    /// Viewpoint offset at `progress` (period 1) scaled by `intensity`.
    pub fn offset(self, progress: f64, intensity: f64) -> Vec2 {
        let phase = progress.rem_euclid(1.0) * TAU;
        let (s, c) = phase.sin_cos();
        match self {
            Self::TurnTable => Vec2::new(s * intensity, c * intensity),
            Self::HorizontalSwitch => Vec2::new(s * intensity, 0.0),
            Self::VerticalSwitch => Vec2::new(0.0, s * intensity),
        }
    }
}

impl std::fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for AnimationKind {
    type Err = ParallaxError;

    fn from_str(s: &str) -> ParallaxResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                ParallaxError::validation(format!(
                    "unknown animation kind '{s}' (expected turn_table, horizontal_switch or vertical_switch)"
                ))
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/kind.rs"]
mod tests;
