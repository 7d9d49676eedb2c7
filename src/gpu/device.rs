use crate::{
    foundation::{
        core::Size2,
        error::{ParallaxError, ParallaxResult},
    },
    gpu::{
        buffer::UniformBuffer,
        library::ShaderLibrary,
        pipeline::{RenderPipelineDescriptor, RenderPipelineState},
        queue::CommandQueue,
        surface::Drawable,
        texture::{PixelFormat, Texture, TextureDescriptor, TextureUsage},
    },
};

/// Resource limits enforced at allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Largest width or height of a texture.
    pub max_texture_dimension: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16_384,
        }
    }
}

/// Software render device. Allocates resources and owns the shader library.
#[derive(Clone, Debug)]
pub struct Device {
    name: String,
    limits: DeviceLimits,
    library: ShaderLibrary,
}

impl Device {
    /// Default device. The software device is always available; the `Result` keeps call sites
    /// honest about device acquisition being fallible.
    pub fn system_default() -> ParallaxResult<Self> {
        Ok(Self::with_limits(DeviceLimits::default()))
    }

    /// Device with explicit limits.
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            name: "parallaxfx software device".to_string(),
            limits,
            library: ShaderLibrary::builtin(),
        }
    }

    /// Human-readable device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocation limits.
    pub fn limits(&self) -> DeviceLimits {
        self.limits
    }

    /// Built-in shader library.
    pub fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    /// Allocate a zero-filled texture.
    pub fn make_texture(&self, desc: &TextureDescriptor) -> ParallaxResult<Texture> {
        if desc.size.is_empty() {
            return Err(ParallaxError::resource(format!(
                "texture '{}' has empty size {}",
                desc.label, desc.size
            )));
        }
        let max = self.limits.max_texture_dimension;
        if desc.size.width > max || desc.size.height > max {
            return Err(ParallaxError::resource(format!(
                "texture '{}' size {} exceeds device limit {max}",
                desc.label, desc.size
            )));
        }
        Ok(Texture::allocate(desc))
    }

    /// Allocate the on-screen texture.
    pub fn make_drawable(&self, size: Size2) -> ParallaxResult<Drawable> {
        let texture = self.make_texture(&TextureDescriptor {
            label: "drawable".to_string(),
            size,
            format: PixelFormat::Rgba8Unorm,
            usage: TextureUsage::RENDER_TARGET_AND_READ,
        })?;
        Ok(Drawable::new(texture))
    }

    /// Allocate a uniform buffer initialized to `initial`.
    pub fn make_uniform_buffer<T: bytemuck::Pod>(
        &self,
        label: impl Into<String>,
        initial: &T,
    ) -> ParallaxResult<UniformBuffer<T>> {
        let label = label.into();
        if std::mem::size_of::<T>() == 0 {
            return Err(ParallaxError::resource(format!(
                "uniform buffer '{label}' has zero size"
            )));
        }
        Ok(UniformBuffer::new(label, initial))
    }

    /// Resolve a fragment function and bind it to attachment formats.
    pub fn make_render_pipeline_state(
        &self,
        desc: &RenderPipelineDescriptor,
    ) -> ParallaxResult<RenderPipelineState> {
        let function = self.library.function(&desc.fragment_function)?;
        if desc.color_formats.len() != function.output_count() {
            return Err(ParallaxError::resource(format!(
                "pipeline '{}': {} writes {} attachments, descriptor lists {}",
                desc.label,
                function.name(),
                function.output_count(),
                desc.color_formats.len()
            )));
        }
        Ok(RenderPipelineState {
            label: desc.label.clone(),
            function,
            color_formats: desc.color_formats.clone(),
        })
    }

    /// Start a serial command queue.
    pub fn make_command_queue(&self, label: impl Into<String>) -> ParallaxResult<CommandQueue> {
        CommandQueue::new(label)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/device.rs"]
mod tests;
