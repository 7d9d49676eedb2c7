//! Fragment functions available to render pipelines.
//!
//! The library plays the role of a compiled shader library: pipelines look functions up by name,
//! and every function declares its fixed input and output counts. Kernels run once per target
//! texel and are dispatched a row at a time across the rayon pool.

use std::collections::BTreeMap;

use crate::{
    foundation::{
        core::Size2,
        error::{ParallaxError, ParallaxResult},
        math::gaussian_weights,
    },
    gpu::{
        buffer::BufferBinding,
        sampler::{Sampler, TexelView},
        texture::{PixelFormat, Texel},
    },
};
use rayon::prelude::*;

/// Name of the occlusion fragment function.
pub const PARALLAX_OCCLUSION_FUNCTION: &str = "parallax_occlusion";
/// Name of the separable blur fragment function.
pub const BLUR_FUNCTION: &str = "blur";

/// Blur radius in texels per unit of blur intensity.
pub const BLUR_RADIUS_PER_INTENSITY: f32 = 4.0;

/// Uniforms of the occlusion pass. Layout matches the fragment function's constant buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParallaxOcclusionUniforms {
    /// Horizontal parallax offset in normalized texture units.
    pub offset_x: f32,
    /// Vertical parallax offset in normalized texture units.
    pub offset_y: f32,
    /// Depth that stays fixed under any offset.
    pub focal_point: f32,
}

/// Uniforms of one blur pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurPassUniforms {
    /// Non-zero for the vertical pass.
    pub is_vertical: u32,
    /// Blur strength, `0` disables.
    pub blur_intensity: f32,
    /// Depth that stays sharp.
    pub focal_point: f32,
}

impl BlurPassUniforms {
    /// `true` for the vertical pass.
    pub fn vertical(&self) -> bool {
        self.is_vertical != 0
    }
}

/// A fragment function the library knows how to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FragmentFunction {
    /// Depth-driven reprojection. Inputs: color, depth. Outputs: color, depth.
    ParallaxOcclusion,
    /// Depth-weighted separable gaussian. Inputs: color, depth. Outputs: color.
    Blur,
}

impl FragmentFunction {
    /// Function name as registered in the library.
    pub fn name(self) -> &'static str {
        match self {
            Self::ParallaxOcclusion => PARALLAX_OCCLUSION_FUNCTION,
            Self::Blur => BLUR_FUNCTION,
        }
    }

    /// Number of fragment textures the function reads.
    pub fn input_count(self) -> usize {
        2
    }

    /// Number of color attachments the function writes.
    pub fn output_count(self) -> usize {
        match self {
            Self::ParallaxOcclusion => 2,
            Self::Blur => 1,
        }
    }
}

/// Name-to-function table.
#[derive(Clone, Debug)]
pub struct ShaderLibrary {
    functions: BTreeMap<&'static str, FragmentFunction>,
}

impl ShaderLibrary {
    /// Library with every built-in function.
    pub fn builtin() -> Self {
        let functions = [FragmentFunction::ParallaxOcclusion, FragmentFunction::Blur]
            .into_iter()
            .map(|f| (f.name(), f))
            .collect();
        Self { functions }
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> ParallaxResult<FragmentFunction> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| ParallaxError::resource(format!("unknown fragment function '{name}'")))
    }

    /// Registered function names, sorted.
    pub fn function_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }
}

/// Inputs and outputs of one kernel dispatch.
pub(crate) struct Dispatch<'a, 'b> {
    pub(crate) target: Size2,
    pub(crate) inputs: &'a [TexelView<'a>],
    pub(crate) outputs: &'a mut [&'b mut [Texel]],
    pub(crate) formats: &'a [PixelFormat],
    pub(crate) uniforms: &'a BufferBinding,
}

pub(crate) fn run_fragment(function: FragmentFunction, d: Dispatch<'_, '_>) -> ParallaxResult<()> {
    if d.inputs.len() != function.input_count()
        || d.outputs.len() != function.output_count()
        || d.formats.len() != d.outputs.len()
    {
        return Err(ParallaxError::encode(format!(
            "{} expects {} inputs and {} outputs",
            function.name(),
            function.input_count(),
            function.output_count()
        )));
    }
    let width = d.target.width as usize;
    if width == 0 || d.target.height == 0 {
        return Ok(());
    }

    match function {
        FragmentFunction::ParallaxOcclusion => {
            let u = d.uniforms.read_as::<ParallaxOcclusionUniforms>()?;
            let (color_in, depth_in) = (d.inputs[0], d.inputs[1]);
            let (color_fmt, depth_fmt) = (d.formats[0], d.formats[1]);
            let [color_out, depth_out] = d.outputs else {
                return Err(ParallaxError::encode("occlusion expects two outputs"));
            };
            color_out
                .par_chunks_mut(width)
                .zip(depth_out.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (color_row, depth_row))| {
                    for x in 0..width {
                        let (c, z) = parallax_occlusion(
                            &color_in, &depth_in, x as u32, y as u32, d.target, &u,
                        );
                        color_row[x] = color_fmt.store(c);
                        depth_row[x] = depth_fmt.store(z);
                    }
                });
        }
        FragmentFunction::Blur => {
            let u = d.uniforms.read_as::<BlurPassUniforms>()?;
            let (color_in, depth_in) = (d.inputs[0], d.inputs[1]);
            let fmt = d.formats[0];
            let weights = blur_weights(u.blur_intensity);
            let [out] = d.outputs else {
                return Err(ParallaxError::encode("blur expects one output"));
            };
            out.par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, texel) in row.iter_mut().enumerate() {
                        let c = blur(&color_in, &depth_in, x as i64, y as i64, &u, &weights);
                        *texel = fmt.store(c);
                    }
                });
        }
    }
    Ok(())
}

/// Reproject one fragment: look the depth up at the fragment, move the lookup by
/// `(depth - focal_point) * offset`, then read color and depth at the moved coordinate.
pub(crate) fn parallax_occlusion(
    color: &TexelView<'_>,
    depth: &TexelView<'_>,
    x: u32,
    y: u32,
    target: Size2,
    u: &ParallaxOcclusionUniforms,
) -> (Texel, Texel) {
    let uv = [
        (x as f32 + 0.5) / target.width as f32,
        (y as f32 + 0.5) / target.height as f32,
    ];
    let d = Sampler::LINEAR_MIRROR.sample(depth, uv)[0];
    let shift = d - u.focal_point;
    let src = [uv[0] + shift * u.offset_x, uv[1] + shift * u.offset_y];
    (
        Sampler::LINEAR_MIRROR.sample(color, src),
        Sampler::LINEAR_MIRROR.sample(depth, src),
    )
}

/// Blur radius in texels for an intensity. `0` means the pass is an identity.
pub fn blur_radius(intensity: f32) -> u32 {
    if !intensity.is_finite() || intensity <= 0.0 {
        return 0;
    }
    (intensity * BLUR_RADIUS_PER_INTENSITY).ceil() as u32
}

fn blur_weights(intensity: f32) -> Vec<f32> {
    let radius = blur_radius(intensity);
    let sigma = (radius as f32 / 2.0).max(0.5);
    gaussian_weights(radius, sigma)
}

fn circle_of_confusion(depth: f32, u: &BlurPassUniforms) -> f32 {
    ((depth - u.focal_point).abs() * u.blur_intensity).clamp(0.0, 1.0)
}

/// One tap line of the separable blur. Neighbors only contribute in proportion to how far both
/// they and the center are from the focal plane, so in-focus texels stay sharp and never bleed.
pub(crate) fn blur(
    color: &TexelView<'_>,
    depth: &TexelView<'_>,
    x: i64,
    y: i64,
    u: &BlurPassUniforms,
    weights: &[f32],
) -> Texel {
    let center = color.fetch_clamped(x, y);
    let radius = weights.len().saturating_sub(1);
    if radius == 0 {
        return center;
    }
    let coc_center = circle_of_confusion(depth.fetch_clamped(x, y)[0], u);
    if coc_center <= 0.0 {
        return center;
    }

    let mut acc = center;
    let mut total = 1.0f32;
    for (k, g) in weights.iter().enumerate().skip(1) {
        for sign in [-1i64, 1] {
            let step = sign * k as i64;
            let (sx, sy) = if u.vertical() { (x, y + step) } else { (x + step, y) };
            let w = g * coc_center * circle_of_confusion(depth.fetch_clamped(sx, sy)[0], u);
            if w <= 0.0 {
                continue;
            }
            let c = color.fetch_clamped(sx, sy);
            for i in 0..4 {
                acc[i] += c[i] * w;
            }
            total += w;
        }
    }
    acc.map(|c| c / total)
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/library.rs"]
mod tests;
