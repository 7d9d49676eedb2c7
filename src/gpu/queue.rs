use std::{
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use crate::{
    foundation::error::{ParallaxError, ParallaxResult},
    gpu::command::CommandBuffer,
};

/// Serial queue executing committed command buffers on a dedicated thread.
///
/// Dropping the queue waits for every buffer already committed. Buffers still being encoded keep
/// the worker alive until they are committed or dropped.
pub struct CommandQueue {
    label: String,
    submit: Option<Sender<CommandBuffer>>,
    worker: Option<JoinHandle<()>>,
}

impl CommandQueue {
    pub(crate) fn new(label: impl Into<String>) -> ParallaxResult<Self> {
        let label = label.into();
        let (submit, rx) = mpsc::channel::<CommandBuffer>();
        let worker = thread::Builder::new()
            .name(format!("parallaxfx-queue-{label}"))
            .spawn(move || {
                for buffer in rx {
                    buffer.execute();
                }
            })
            .map_err(|e| ParallaxError::resource(format!("spawn queue '{label}' worker: {e}")))?;
        Ok(Self {
            label,
            submit: Some(submit),
            worker: Some(worker),
        })
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// New empty command buffer bound to this queue.
    pub fn make_command_buffer(&self, label: impl Into<String>) -> ParallaxResult<CommandBuffer> {
        let submit = self
            .submit
            .as_ref()
            .ok_or_else(|| ParallaxError::resource(format!("queue '{}' is shut down", self.label)))?;
        Ok(CommandBuffer::new(label, submit.clone()))
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.submit.take();
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::error!(queue = %self.label, "queue worker panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/queue.rs"]
mod tests;
