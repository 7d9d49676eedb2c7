use smallvec::smallvec;

use crate::{
    foundation::{
        core::{BLUR_INTENSITY_RANGE, ClearColor, Size2},
        error::ParallaxResult,
    },
    gpu::{
        buffer::UniformBuffer,
        command::{CommandBuffer, LoadAction, RenderPassDescriptor},
        device::Device,
        library::{BLUR_FUNCTION, BlurPassUniforms},
        pipeline::{RenderPipelineDescriptor, RenderPipelineState},
        texture::{PixelFormat, Texture},
    },
};

/// Axis a [`BlurPass`] filters along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurAxis {
    /// Along columns.
    Vertical,
    /// Along rows.
    Horizontal,
}

/// One half of the separable depth-of-field blur.
pub struct BlurPass {
    axis: BlurAxis,
    pipeline: RenderPipelineState,
    buffer: UniformBuffer<BlurPassUniforms>,
    uniforms: BlurPassUniforms,
}

impl BlurPass {
    /// Build a pass for `axis` writing `output_format` targets.
    pub fn new(device: &Device, axis: BlurAxis, output_format: PixelFormat) -> ParallaxResult<Self> {
        let label = match axis {
            BlurAxis::Vertical => "blur_vertical",
            BlurAxis::Horizontal => "blur_horizontal",
        };
        let pipeline = device.make_render_pipeline_state(&RenderPipelineDescriptor {
            label: label.to_string(),
            fragment_function: BLUR_FUNCTION.to_string(),
            color_formats: smallvec![output_format],
        })?;
        let uniforms = BlurPassUniforms {
            is_vertical: u32::from(axis == BlurAxis::Vertical),
            blur_intensity: 0.0,
            focal_point: 0.5,
        };
        let buffer = device.make_uniform_buffer(format!("{label}_uniforms"), &uniforms)?;
        Ok(Self {
            axis,
            pipeline,
            buffer,
            uniforms,
        })
    }

    /// Filter axis, fixed at construction.
    pub fn axis(&self) -> BlurAxis {
        self.axis
    }

    /// Uniforms used by the next encode.
    pub fn uniforms(&self) -> BlurPassUniforms {
        self.uniforms
    }

    /// Set the blur strength. Negative and non-finite values disable the blur; values above 3
    /// are clamped so the kernel radius stays bounded.
    pub fn set_blur_intensity(&mut self, intensity: f32) {
        self.uniforms.blur_intensity = if intensity.is_finite() {
            intensity.clamp(0.0, *BLUR_INTENSITY_RANGE.end() as f32)
        } else {
            0.0
        };
    }

    /// Set the depth that stays sharp.
    pub fn set_focal_point(&mut self, focal_point: f32) {
        self.uniforms.focal_point = focal_point;
    }

    /// Encode the pass. Nothing is recorded and the uniform buffer is untouched on error.
    pub fn encode(
        &self,
        cmd: &mut CommandBuffer,
        input_color: &Texture,
        input_depth: &Texture,
        output: &Texture,
        target: Size2,
        clear_color: ClearColor,
    ) -> ParallaxResult<()> {
        let desc = RenderPassDescriptor::new(self.pipeline.label().to_string(), target)
            .with_attachment(output, LoadAction::Clear, clear_color);
        let mut enc = cmd.make_render_command_encoder(&desc)?;
        enc.set_render_pipeline_state(&self.pipeline);
        enc.set_fragment_texture(input_color, 0);
        enc.set_fragment_texture(input_depth, 1);
        enc.set_fragment_buffer(&self.buffer);
        enc.draw_full_screen()?;
        enc.end_encoding();
        self.buffer.write(&self.uniforms);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/passes/blur.rs"]
mod tests;
