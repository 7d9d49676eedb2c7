use std::{marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::foundation::error::{ParallaxError, ParallaxResult};

/// Typed, CPU-writable uniform buffer.
///
/// Writes land immediately; a command buffer reads the bytes when it executes, not when it is
/// encoded. Callers that rewrite the buffer every frame must therefore bound the number of frames
/// in flight.
pub struct UniformBuffer<T: bytemuck::Pod> {
    label: String,
    bytes: Arc<Mutex<Vec<u8>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: bytemuck::Pod> UniformBuffer<T> {
    pub(crate) fn new(label: impl Into<String>, initial: &T) -> Self {
        Self {
            label: label.into(),
            bytes: Arc::new(Mutex::new(bytemuck::bytes_of(initial).to_vec())),
            _marker: PhantomData,
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Overwrite the buffer contents.
    pub fn write(&self, value: &T) {
        self.bytes
            .lock()
            .copy_from_slice(bytemuck::bytes_of(value));
    }

    /// Current contents.
    pub fn read(&self) -> T {
        bytemuck::pod_read_unaligned(&self.bytes.lock())
    }

    pub(crate) fn binding(&self) -> BufferBinding {
        BufferBinding {
            label: self.label.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

/// Untyped reference to a uniform buffer captured by an encoded pass.
#[derive(Clone)]
pub(crate) struct BufferBinding {
    label: String,
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl BufferBinding {
    pub(crate) fn read_as<T: bytemuck::Pod>(&self) -> ParallaxResult<T> {
        let bytes = self.bytes.lock();
        if bytes.len() != std::mem::size_of::<T>() {
            return Err(ParallaxError::encode(format!(
                "buffer '{}' holds {} bytes, kernel expects {}",
                self.label,
                bytes.len(),
                std::mem::size_of::<T>()
            )));
        }
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/buffer.rs"]
mod tests;
