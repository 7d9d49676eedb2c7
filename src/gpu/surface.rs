use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::gpu::texture::{FrameRGBA, Texture};

/// The texture shown on screen. Presenting bumps a counter the host can observe.
#[derive(Clone, Debug)]
pub struct Drawable {
    texture: Texture,
    presented: Arc<AtomicU64>,
}

impl Drawable {
    pub(crate) fn new(texture: Texture) -> Self {
        Self {
            texture,
            presented: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Backing texture.
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// How many command buffers presented this drawable.
    pub fn present_count(&self) -> u64 {
        self.presented.load(Ordering::Acquire)
    }

    /// Read the current contents back to CPU memory.
    pub fn snapshot(&self) -> FrameRGBA {
        self.texture.read_rgba8()
    }

    pub(crate) fn mark_presented(&self) {
        self.presented.fetch_add(1, Ordering::AcqRel);
    }
}
