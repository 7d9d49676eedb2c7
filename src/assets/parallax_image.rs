use std::path::Path;

use anyhow::Context;
use image::{ImageBuffer, Luma, RgbaImage, imageops::FilterType};

use crate::foundation::{
    core::Size2,
    error::{ParallaxError, ParallaxResult},
    math::{Fingerprint, StableHasher, f32_to_unorm8},
};

type DepthBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// How depth values of a source are oriented.
///
/// Inside the crate depth is always [`DepthConvention::NearIsOne`]; sources using the other
/// orientation are inverted once, when the [`DepthMap`] is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthConvention {
    /// `1` is closest to the camera, `0` farthest. Disparity maps use this orientation.
    #[default]
    NearIsOne,
    /// `0` is closest to the camera, `1` farthest. Metric-depth style maps use this orientation.
    NearIsZero,
}

/// Single-channel depth in `[0, 1]`, `1` = near.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMap {
    buf: DepthBuffer,
}

impl DepthMap {
    /// Build from row-major values. Values are clamped to `[0, 1]`; non-finite values are
    /// rejected.
    pub fn new(
        size: Size2,
        values: Vec<f32>,
        convention: DepthConvention,
    ) -> ParallaxResult<Self> {
        if size.is_empty() {
            return Err(ParallaxError::validation(format!(
                "depth map size {size} is empty"
            )));
        }
        if values.len() != size.pixel_count() {
            return Err(ParallaxError::validation(format!(
                "depth map {size} needs {} values, got {}",
                size.pixel_count(),
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ParallaxError::validation("depth map contains non-finite values"));
        }
        let values = values
            .into_iter()
            .map(|v| {
                let v = v.clamp(0.0, 1.0);
                match convention {
                    DepthConvention::NearIsOne => v,
                    DepthConvention::NearIsZero => 1.0 - v,
                }
            })
            .collect();
        let buf = DepthBuffer::from_raw(size.width, size.height, values)
            .ok_or_else(|| ParallaxError::validation("depth buffer size mismatch"))?;
        Ok(Self { buf })
    }

    /// Uniform depth, mostly useful for tests and flat placeholders.
    pub fn filled(size: Size2, depth: f32) -> ParallaxResult<Self> {
        Self::new(size, vec![depth; size.pixel_count()], DepthConvention::NearIsOne)
    }

    /// Luminance of any decoded image, normalized to `[0, 1]`.
    pub fn from_image(img: &image::DynamicImage, convention: DepthConvention) -> ParallaxResult<Self> {
        let luma = img.to_luma32f();
        let size = Size2::new(luma.width(), luma.height());
        Self::new(size, luma.into_raw(), convention)
    }

    /// Decode a depth image from disk.
    pub fn open(path: impl AsRef<Path>, convention: DepthConvention) -> ParallaxResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("decode depth image '{}'", path.display()))?;
        Self::from_image(&img, convention)
    }

    /// Extent in pixels.
    pub fn size(&self) -> Size2 {
        Size2::new(self.buf.width(), self.buf.height())
    }

    /// Depth at `(x, y)`, or `None` outside the map.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.buf.width() && y < self.buf.height()).then(|| self.buf.get_pixel(x, y).0[0])
    }

    /// Row-major values.
    pub fn values(&self) -> &[f32] {
        self.buf.as_raw()
    }

    /// Smallest and largest depth.
    pub fn range(&self) -> (f32, f32) {
        self.values()
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Rescale so the nearest value becomes `1` and the farthest `0`. Flat maps are returned
    /// unchanged.
    pub fn contrast_stretched(&self) -> Self {
        let (lo, hi) = self.range();
        let span = hi - lo;
        if span <= f32::EPSILON {
            return self.clone();
        }
        let mut buf = self.buf.clone();
        for p in buf.pixels_mut() {
            p.0[0] = ((p.0[0] - lo) / span).clamp(0.0, 1.0);
        }
        Self { buf }
    }

    /// Bilinear resample to `size`.
    pub fn resized(&self, size: Size2) -> ParallaxResult<Self> {
        if size.is_empty() {
            return Err(ParallaxError::validation(format!(
                "cannot resize depth map to {size}"
            )));
        }
        if size == self.size() {
            return Ok(self.clone());
        }
        let mut buf = image::imageops::resize(&self.buf, size.width, size.height, FilterType::Triangle);
        for p in buf.pixels_mut() {
            p.0[0] = p.0[0].clamp(0.0, 1.0);
        }
        Ok(Self { buf })
    }

    /// Grayscale RGBA rendering of the map, near = white.
    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_fn(self.buf.width(), self.buf.height(), |x, y| {
            let v = f32_to_unorm8(self.buf.get_pixel(x, y).0[0]);
            image::Rgba([v, v, v, 255])
        })
    }
}

/// A photograph and its aligned depth map.
///
/// Immutable once built; replace it wholesale to change what the compositor shows.
#[derive(Clone, Debug)]
pub struct ParallaxImage {
    diffuse: RgbaImage,
    depth: DepthMap,
    fingerprint: Fingerprint,
}

impl ParallaxImage {
    /// Pair a diffuse image with a depth map of the same non-zero extent.
    pub fn new(diffuse: RgbaImage, depth: DepthMap) -> ParallaxResult<Self> {
        let size = Size2::new(diffuse.width(), diffuse.height());
        if size.is_empty() {
            return Err(ParallaxError::validation(format!(
                "diffuse image size {size} is empty"
            )));
        }
        if depth.size() != size {
            return Err(ParallaxError::validation(format!(
                "depth map is {}, diffuse image is {size}",
                depth.size()
            )));
        }
        let fingerprint = fingerprint_of(&diffuse, &depth);
        Ok(Self {
            diffuse,
            depth,
            fingerprint,
        })
    }

    /// Like [`ParallaxImage::new`], resampling the depth map to the diffuse extent first.
    /// Sensor depth is usually captured at a lower resolution than the photograph.
    pub fn fit(diffuse: RgbaImage, depth: DepthMap) -> ParallaxResult<Self> {
        let size = Size2::new(diffuse.width(), diffuse.height());
        if size.is_empty() {
            return Err(ParallaxError::validation(format!(
                "diffuse image size {size} is empty"
            )));
        }
        let depth = depth.resized(size)?;
        Self::new(diffuse, depth)
    }

    /// Choose between sensor and predicted depth, preferring the sensor.
    pub fn from_depth_sources(
        diffuse: RgbaImage,
        true_depth: Option<DepthMap>,
        predicted_depth: Option<DepthMap>,
    ) -> ParallaxResult<Self> {
        let depth = true_depth.or(predicted_depth).ok_or_else(|| {
            ParallaxError::validation("neither true nor predicted depth is available")
        })?;
        Self::fit(diffuse, depth)
    }

    /// Decode a diffuse/depth pair from disk.
    #[tracing::instrument(skip_all, fields(diffuse = %diffuse.as_ref().display()))]
    pub fn open(
        diffuse: impl AsRef<Path>,
        depth: impl AsRef<Path>,
        convention: DepthConvention,
    ) -> ParallaxResult<Self> {
        let diffuse = diffuse.as_ref();
        let img = image::open(diffuse)
            .with_context(|| format!("decode diffuse image '{}'", diffuse.display()))?
            .to_rgba8();
        let depth = DepthMap::open(depth, convention)?;
        if depth.size() != Size2::new(img.width(), img.height()) {
            tracing::debug!(depth = %depth.size(), "resampling depth to diffuse size");
        }
        Self::fit(img, depth)
    }

    /// The photograph.
    pub fn diffuse(&self) -> &RgbaImage {
        &self.diffuse
    }

    /// The depth map, `1` = near.
    pub fn depth(&self) -> &DepthMap {
        &self.depth
    }

    /// Extent shared by both layers.
    pub fn size(&self) -> Size2 {
        self.depth.size()
    }

    /// Content fingerprint over both layers.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

fn fingerprint_of(diffuse: &RgbaImage, depth: &DepthMap) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_u32(diffuse.width());
    h.write_u32(diffuse.height());
    h.write_bytes(diffuse.as_raw());
    for &v in depth.values() {
        h.write_f32(v);
    }
    h.finish()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/parallax_image.rs"]
mod tests;
