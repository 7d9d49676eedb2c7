use std::ops::RangeInclusive;

use crate::foundation::error::{ParallaxError, ParallaxResult};

pub use kurbo::Vec2;

/// Largest parallax offset (per axis, in normalized texture units) a gesture may produce.
pub const OFFSET_LIMIT: f64 = 0.06;

pub(crate) const INTERVAL_SECS_RANGE: RangeInclusive<f64> = 1.0..=10.0;
pub(crate) const INTENSITY_RANGE: RangeInclusive<f64> = 0.0..=0.1;
pub(crate) const FOCAL_POINT_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub(crate) const BLUR_INTENSITY_RANGE: RangeInclusive<f64> = 0.0..=3.0;

/// Reject `value` unless it is finite and inside `range`. The error names the parameter.
pub(crate) fn check_range(
    name: &str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> ParallaxResult<()> {
    if !value.is_finite() || !range.contains(&value) {
        return Err(ParallaxError::validation(format!(
            "{name} must be in [{}, {}], got {value}",
            range.start(),
            range.end()
        )));
    }
    Ok(())
}

/// Pixel dimensions of a texture, drawable or image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size2 {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size2 {
    /// Create a size without validation. Zero extents are allowed and mean "no surface yet".
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` if either extent is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels, saturating on overflow.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Height over width. Returns `None` for empty sizes.
    pub fn aspect_ratio(self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(f64::from(self.height) / f64::from(self.width))
    }
}

impl std::fmt::Display for Size2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size an image so it fills `container` while keeping its aspect ratio.
///
/// One extent matches the container, the other overflows it. This is how the drawable is sized
/// relative to the view hosting it.
pub fn aspect_fill(image: Size2, container: Size2) -> ParallaxResult<Size2> {
    let (Some(image_ar), Some(view_ar)) = (image.aspect_ratio(), container.aspect_ratio()) else {
        return Err(ParallaxError::validation(
            "aspect_fill requires non-empty image and container sizes",
        ));
    };

    if image_ar > view_ar {
        let width = container.width;
        let height = (f64::from(width) * image_ar).round().max(1.0) as u32;
        Ok(Size2::new(width, height))
    } else {
        let height = container.height;
        let width = (f64::from(height) / image_ar).round().max(1.0) as u32;
        Ok(Size2::new(width, height))
    }
}

/// Clamp an offset to `±OFFSET_LIMIT` on both axes.
pub fn clamp_offset(offset: Vec2) -> Vec2 {
    Vec2::new(
        offset.x.clamp(-OFFSET_LIMIT, OFFSET_LIMIT),
        offset.y.clamp(-OFFSET_LIMIT, OFFSET_LIMIT),
    )
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ParallaxResult<Self> {
        if den == 0 {
            return Err(ParallaxError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ParallaxError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Integer frame rate, if `den == 1`.
    pub fn as_integer(self) -> Option<u32> {
        (self.den == 1).then_some(self.num)
    }
}

/// Linear RGBA clear color, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClearColor(pub [f32; 4]);

impl ClearColor {
    /// Opaque black, the default clear color of the parallax view.
    pub const OPAQUE_BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);

    /// Validate that every component is finite and inside `[0, 1]`.
    pub fn validate(self) -> ParallaxResult<()> {
        if self
            .0
            .iter()
            .any(|c| !c.is_finite() || !(0.0..=1.0).contains(c))
        {
            return Err(ParallaxError::validation(
                "clear color components must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::OPAQUE_BLACK
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
