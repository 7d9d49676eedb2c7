use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::foundation::{
    core::{ClearColor, Size2},
    error::{ParallaxError, ParallaxResult},
    math::{f32_to_unorm8, unorm8_to_f32},
};

/// One texel: linear RGBA as `f32`.
pub type Texel = [f32; 4];

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Storage format of a texture. Values are kept as `f32`; the format decides how they are
/// quantized on store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Half-float working format of the intermediate targets. Stored unclamped.
    Rgba16Float,
    /// 8-bit normalized format of the drawable. Stored clamped and quantized to `n / 255`.
    Rgba8Unorm,
}

impl PixelFormat {
    /// Apply the format's store semantics to a shader output.
    pub fn store(self, v: Texel) -> Texel {
        match self {
            Self::Rgba16Float => v,
            Self::Rgba8Unorm => v.map(|c| unorm8_to_f32(f32_to_unorm8(c))),
        }
    }
}

/// How a texture may be bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureUsage {
    /// Can be a color attachment of a render pass.
    pub render_target: bool,
    /// Can be bound as a fragment input.
    pub shader_read: bool,
}

impl TextureUsage {
    /// Immutable inputs uploaded from the CPU.
    pub const SHADER_READ: Self = Self {
        render_target: false,
        shader_read: true,
    };
    /// Intermediate targets: written by one pass, read by the next.
    pub const RENDER_TARGET_AND_READ: Self = Self {
        render_target: true,
        shader_read: true,
    };
}

/// Parameters for [`Device::make_texture`](crate::gpu::device::Device::make_texture).
#[derive(Clone, Debug)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: String,
    /// Extent in texels.
    pub size: Size2,
    /// Storage format.
    pub format: PixelFormat,
    /// Allowed bindings.
    pub usage: TextureUsage,
}

/// Reference-counted handle to a 2D texture.
///
/// Cloning the handle does not copy texels. Command buffers keep handles alive until they finish
/// executing, the compositor keeps the owning handle.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

struct TextureInner {
    id: u64,
    label: String,
    size: Size2,
    format: PixelFormat,
    usage: TextureUsage,
    texels: RwLock<Vec<Texel>>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("size", &self.inner.size)
            .field("format", &self.inner.format)
            .finish()
    }
}

impl Texture {
    pub(crate) fn allocate(desc: &TextureDescriptor) -> Self {
        Self {
            inner: Arc::new(TextureInner {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                label: desc.label.clone(),
                size: desc.size,
                format: desc.format,
                usage: desc.usage,
                texels: RwLock::new(vec![[0.0; 4]; desc.size.pixel_count()]),
            }),
        }
    }

    /// Process-unique texture id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Extent in texels.
    pub fn size(&self) -> Size2 {
        self.inner.size
    }

    /// Storage format.
    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// Allowed bindings.
    pub fn usage(&self) -> TextureUsage {
        self.inner.usage
    }

    /// `true` when both handles refer to the same texture.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn texels(&self) -> RwLockReadGuard<'_, Vec<Texel>> {
        self.inner.texels.read()
    }

    pub(crate) fn texels_mut(&self) -> RwLockWriteGuard<'_, Vec<Texel>> {
        self.inner.texels.write()
    }

    /// Replace the whole texture contents from CPU memory.
    pub fn upload(&self, texels: &[Texel]) -> ParallaxResult<()> {
        let mut dst = self.texels_mut();
        if texels.len() != dst.len() {
            return Err(ParallaxError::validation(format!(
                "upload to '{}' expects {} texels, got {}",
                self.label(),
                dst.len(),
                texels.len()
            )));
        }
        let format = self.format();
        for (d, s) in dst.iter_mut().zip(texels) {
            *d = format.store(*s);
        }
        Ok(())
    }

    pub(crate) fn clear(&self, color: ClearColor) {
        let value = self.format().store(color.0);
        self.texels_mut().fill(value);
    }

    /// Read a single texel. Returns `None` outside the texture.
    pub fn texel(&self, x: u32, y: u32) -> Option<Texel> {
        let size = self.size();
        if x >= size.width || y >= size.height {
            return None;
        }
        let idx = (y as usize) * (size.width as usize) + (x as usize);
        self.texels().get(idx).copied()
    }

    /// Copy the texture back to CPU memory as straight-alpha RGBA8.
    pub fn read_rgba8(&self) -> FrameRGBA {
        let size = self.size();
        let texels = self.texels();
        let mut data = Vec::with_capacity(texels.len() * 4);
        for t in texels.iter() {
            data.extend(t.map(f32_to_unorm8));
        }
        FrameRGBA {
            width: size.width,
            height: size.height,
            data,
            premultiplied: false,
        }
    }
}

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha. Frames produced by this crate are straight.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Frame extent.
    pub fn size(&self) -> Size2 {
        Size2::new(self.width, self.height)
    }

    /// `true` if the frame has no pixels or the buffer length disagrees with the extent.
    pub fn is_degenerate(&self) -> bool {
        self.size().is_empty() || self.data.len() != self.size().pixel_count() * 4
    }

    /// Convert to an `image` buffer for encoding.
    pub fn to_rgba_image(&self) -> ParallaxResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            ParallaxError::validation("frame data length does not match width*height*4")
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/texture.rs"]
mod tests;
