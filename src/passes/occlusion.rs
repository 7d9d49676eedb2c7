use smallvec::smallvec;

use crate::{
    foundation::{
        core::{ClearColor, Size2, Vec2},
        error::ParallaxResult,
    },
    gpu::{
        buffer::UniformBuffer,
        command::{CommandBuffer, LoadAction, RenderPassDescriptor},
        device::Device,
        library::{PARALLAX_OCCLUSION_FUNCTION, ParallaxOcclusionUniforms},
        pipeline::{RenderPipelineDescriptor, RenderPipelineState},
        texture::{PixelFormat, Texture},
    },
};

/// Reprojects the input image against its depth map for the current offset.
///
/// Writes the displaced color and the displaced depth; the blur passes read both.
pub struct ParallaxOcclusionPass {
    pipeline: RenderPipelineState,
    buffer: UniformBuffer<ParallaxOcclusionUniforms>,
    uniforms: ParallaxOcclusionUniforms,
}

impl ParallaxOcclusionPass {
    /// Build the pipeline and uniform buffer. Fails if the device cannot provide either.
    pub fn new(device: &Device) -> ParallaxResult<Self> {
        let pipeline = device.make_render_pipeline_state(&RenderPipelineDescriptor {
            label: "parallax_occlusion".to_string(),
            fragment_function: PARALLAX_OCCLUSION_FUNCTION.to_string(),
            color_formats: smallvec![PixelFormat::Rgba16Float, PixelFormat::Rgba16Float],
        })?;
        let uniforms = ParallaxOcclusionUniforms {
            offset_x: 0.0,
            offset_y: 0.0,
            focal_point: 0.5,
        };
        let buffer = device.make_uniform_buffer("parallax_occlusion_uniforms", &uniforms)?;
        Ok(Self {
            pipeline,
            buffer,
            uniforms,
        })
    }

    /// Uniforms used by the next encode.
    pub fn uniforms(&self) -> ParallaxOcclusionUniforms {
        self.uniforms
    }

    /// Set the viewpoint offset.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.uniforms.offset_x = offset.x as f32;
        self.uniforms.offset_y = offset.y as f32;
    }

    /// Set the depth that stays fixed.
    pub fn set_focal_point(&mut self, focal_point: f32) {
        self.uniforms.focal_point = focal_point;
    }

    /// Encode the pass. Nothing is recorded and the uniform buffer is untouched on error.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        cmd: &mut CommandBuffer,
        input_color: &Texture,
        input_depth: &Texture,
        output_color: &Texture,
        output_depth: &Texture,
        target: Size2,
        clear_color: ClearColor,
    ) -> ParallaxResult<()> {
        let desc = RenderPassDescriptor::new("parallax_occlusion", target)
            .with_attachment(output_color, LoadAction::Clear, clear_color)
            .with_attachment(output_depth, LoadAction::Clear, ClearColor::OPAQUE_BLACK);
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
#[path = "../../tests/unit/passes/occlusion.rs"]
mod tests;
