use crate::{
    assets::parallax_image::ParallaxImage,
    foundation::{
        error::ParallaxResult,
        math::{Fingerprint, unorm8_to_f32},
    },
    gpu::{
        device::Device,
        texture::{PixelFormat, Texel, Texture, TextureDescriptor, TextureUsage},
    },
};

/// Immutable input textures built from one [`ParallaxImage`].
#[derive(Clone, Debug)]
pub struct InputTextures {
    /// Straight-alpha diffuse color.
    pub color: Texture,
    /// Depth replicated into RGB, alpha 1.
    pub depth: Texture,
    /// Fingerprint of the image the textures were built from.
    pub fingerprint: Fingerprint,
}

/// Uploads images into shader-readable textures.
pub struct TextureLoader<'d> {
    device: &'d Device,
}

impl<'d> TextureLoader<'d> {
    /// Loader allocating on `device`.
    pub fn new(device: &'d Device) -> Self {
        Self { device }
    }

    /// Allocate and fill the color and depth textures for `image`.
    #[tracing::instrument(skip_all, fields(size = %image.size()))]
    pub fn upload(&self, image: &ParallaxImage) -> ParallaxResult<InputTextures> {
        let size = image.size();

        let color_texels: Vec<Texel> = image
            .diffuse()
            .pixels()
            .map(|p| p.0.map(unorm8_to_f32))
            .collect();
        let depth_texels: Vec<Texel> = image
            .depth()
            .values()
            .iter()
            .map(|&d| [d, d, d, 1.0])
            .collect();

        let color = self.device.make_texture(&TextureDescriptor {
            label: "input_color".to_string(),
            size,
            format: PixelFormat::Rgba16Float,
            usage: TextureUsage::SHADER_READ,
        })?;
        color.upload(&color_texels)?;

        let depth = self.device.make_texture(&TextureDescriptor {
            label: "input_depth".to_string(),
            size,
            format: PixelFormat::Rgba16Float,
            usage: TextureUsage::SHADER_READ,
        })?;
        depth.upload(&depth_texels)?;

        tracing::debug!("uploaded input textures");
        Ok(InputTextures {
            color,
            depth,
            fingerprint: image.fingerprint(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
