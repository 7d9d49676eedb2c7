use crate::gpu::texture::Texel;

/// Distance from a texel center under which a sample snaps to that texel.
const TEXEL_SNAP: f32 = 1e-4;

/// What happens to texture coordinates outside `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    /// Coordinates clamp to the edge texel.
    ClampToEdge,
    /// Coordinates reflect at each edge, so `1.1` reads like `0.9` and `-0.1` like `0.1`.
    MirrorRepeat,
}

/// Bilinear sampler state bound alongside fragment textures.
///
/// The blur kernel reads whole texels through [`TexelView::fetch_clamped`] and needs no sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sampler {
    /// Addressing on both axes.
    pub address_mode: AddressMode,
}

impl Sampler {
    /// Bilinear with mirrored addressing: the occlusion pass sampler.
    pub const LINEAR_MIRROR: Self = Self {
        address_mode: AddressMode::MirrorRepeat,
    };

    /// Bilinear blend of the four closest texels at normalized coordinates `uv`, texel centers
    /// at `(i + 0.5) / extent`.
    pub(crate) fn sample(&self, view: &TexelView<'_>, uv: [f32; 2]) -> Texel {
        let u = address(uv[0], self.address_mode);
        let v = address(uv[1], self.address_mode);
        let px = snap(u * view.width as f32 - 0.5);
        let py = snap(v * view.height as f32 - 0.5);
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let t00 = view.fetch_clamped(x0, y0);
        let t10 = view.fetch_clamped(x0 + 1, y0);
        let t01 = view.fetch_clamped(x0, y0 + 1);
        let t11 = view.fetch_clamped(x0 + 1, y0 + 1);

        let mut out = [0.0f32; 4];
        for c in 0..4 {
            let top = t00[c] + (t10[c] - t00[c]) * fx;
            let bottom = t01[c] + (t11[c] - t01[c]) * fx;
            out[c] = top + (bottom - top) * fy;
        }
        out
    }
}

fn address(u: f32, mode: AddressMode) -> f32 {
    match mode {
        AddressMode::ClampToEdge => u.clamp(0.0, 1.0),
        AddressMode::MirrorRepeat => {
            let t = u.rem_euclid(2.0);
            if t > 1.0 { 2.0 - t } else { t }
        }
    }
}

fn snap(p: f32) -> f32 {
    let r = p.round();
    if (p - r).abs() < TEXEL_SNAP { r } else { p }
}

/// Borrowed, read-only view of a texture's texels used by fragment kernels.
#[derive(Clone, Copy)]
pub(crate) struct TexelView<'a> {
    texels: &'a [Texel],
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl<'a> TexelView<'a> {
    pub(crate) fn new(texels: &'a [Texel], width: u32, height: u32) -> Self {
        debug_assert_eq!(texels.len(), (width as usize) * (height as usize));
        Self {
            texels,
            width,
            height,
        }
    }

    /// Integer fetch with clamp-to-edge addressing.
    pub(crate) fn fetch_clamped(&self, x: i64, y: i64) -> Texel {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.texels[y * self.width as usize + x]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/sampler.rs"]
mod tests;
