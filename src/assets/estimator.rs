use image::RgbaImage;

use crate::{
    assets::parallax_image::{DepthConvention, DepthMap},
    foundation::{
        core::Size2,
        error::{ParallaxError, ParallaxResult},
    },
};

/// Produces a depth map for a photograph that has none.
///
/// Implementations wrap whatever inference backend the host uses. The returned map must already be
/// in the crate's orientation (`1` = near); build it with the backend's [`DepthConvention`] so
/// [`DepthMap::new`] inverts it if needed.
pub trait DepthEstimator: Send {
    /// Estimate depth for `diffuse`. The map may have a different extent than the image.
    fn estimate(&mut self, diffuse: &RgbaImage) -> ParallaxResult<DepthMap>;
}

/// Estimator deriving depth from luminance: bright pixels are treated as near.
///
/// A stand-in for hosts without an inference backend; output is contrast stretched.
#[derive(Clone, Copy, Debug, Default)]
pub struct LuminanceDepthEstimator {
    /// Orientation of luminance relative to distance.
    pub convention: DepthConvention,
}

impl DepthEstimator for LuminanceDepthEstimator {
    fn estimate(&mut self, diffuse: &RgbaImage) -> ParallaxResult<DepthMap> {
        let size = Size2::new(diffuse.width(), diffuse.height());
        if size.is_empty() {
            return Err(ParallaxError::validation("cannot estimate depth of an empty image"));
        }
        let values = diffuse
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0.map(f32::from);
                (0.2126 * r + 0.7152 * g + 0.0722 * b) / 255.0
            })
            .collect();
        Ok(DepthMap::new(size, values, self.convention)?.contrast_stretched())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/estimator.rs"]
mod tests;
