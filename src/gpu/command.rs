use std::sync::{Arc, mpsc::Sender};

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use crate::{
    foundation::{
        core::{ClearColor, Size2},
        error::{ParallaxError, ParallaxResult},
    },
    gpu::{
        buffer::{BufferBinding, UniformBuffer},
        library::{Dispatch, run_fragment},
        pipeline::RenderPipelineState,
        sampler::TexelView,
        surface::Drawable,
        texture::{PixelFormat, Texel, Texture},
    },
};

/// Callback run on the queue thread once a command buffer starts executing.
pub type ScheduledHandler = Box<dyn FnOnce() + Send + 'static>;
/// Callback run on the queue thread once a command buffer finished, successfully or not.
pub type CompletedHandler = Box<dyn FnOnce(&CommandBufferStatus) + Send + 'static>;

/// Lifecycle of a command buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandBufferStatus {
    /// Still being encoded.
    NotEnqueued,
    /// Handed to the queue.
    Committed,
    /// Executing.
    Scheduled,
    /// Every pass ran.
    Completed,
    /// Execution stopped at a failing pass.
    Error(String),
}

impl CommandBufferStatus {
    /// `true` once the buffer will not change state again.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Error(_))
    }
}

/// What an attachment holds before the pass writes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadAction {
    /// Keep previous contents.
    Load,
    /// Fill with the attachment's clear color.
    Clear,
}

/// One color attachment of a render pass.
#[derive(Clone, Debug)]
pub struct ColorAttachment {
    /// Target texture. Must be render-target capable and sized like the pass.
    pub texture: Texture,
    /// Load behavior.
    pub load_action: LoadAction,
    /// Used when `load_action` is [`LoadAction::Clear`].
    pub clear_color: ClearColor,
}

/// Attachments and extent of a render pass.
#[derive(Clone, Debug)]
pub struct RenderPassDescriptor {
    /// Debug label.
    pub label: String,
    /// Color attachments in slot order.
    pub color_attachments: SmallVec<[ColorAttachment; 2]>,
    /// Rasterization extent. Every attachment must match it.
    pub render_target_size: Size2,
}

impl RenderPassDescriptor {
    /// Empty descriptor; add attachments with [`RenderPassDescriptor::with_attachment`].
    pub fn new(label: impl Into<String>, render_target_size: Size2) -> Self {
        Self {
            label: label.into(),
            color_attachments: SmallVec::new(),
            render_target_size,
        }
    }

    /// Append a color attachment.
    pub fn with_attachment(
        mut self,
        texture: &Texture,
        load_action: LoadAction,
        clear_color: ClearColor,
    ) -> Self {
        self.color_attachments.push(ColorAttachment {
            texture: texture.clone(),
            load_action,
            clear_color,
        });
        self
    }

    /// Check the descriptor can be encoded.
    pub fn validate(&self) -> ParallaxResult<()> {
        if self.color_attachments.is_empty() {
            return Err(ParallaxError::encode(format!(
                "pass '{}' has no color attachments",
                self.label
            )));
        }
        if self.render_target_size.is_empty() {
            return Err(ParallaxError::encode(format!(
                "pass '{}' has an empty render target",
                self.label
            )));
        }
        for (i, a) in self.color_attachments.iter().enumerate() {
            if !a.texture.usage().render_target {
                return Err(ParallaxError::encode(format!(
                    "pass '{}' attachment {i} ('{}') is not a render target",
                    self.label,
                    a.texture.label()
                )));
            }
            if a.texture.size() != self.render_target_size {
                return Err(ParallaxError::encode(format!(
                    "pass '{}' attachment {i} is {}, render target is {}",
                    self.label,
                    a.texture.size(),
                    self.render_target_size
                )));
            }
            if self.color_attachments[..i]
                .iter()
                .any(|prev| prev.texture.same_as(&a.texture))
            {
                return Err(ParallaxError::encode(format!(
                    "pass '{}' binds '{}' to more than one attachment",
                    self.label,
                    a.texture.label()
                )));
            }
        }
        Ok(())
    }
}

struct DrawPass {
    label: String,
    pipeline: RenderPipelineState,
    inputs: SmallVec<[Texture; 2]>,
    uniforms: BufferBinding,
    attachments: SmallVec<[ColorAttachment; 2]>,
    target: Size2,
}

impl DrawPass {
    fn execute(&self) -> ParallaxResult<()> {
        for a in &self.attachments {
            if a.load_action == LoadAction::Clear {
                a.texture.clear(a.clear_color);
            }
        }

        let in_guards: SmallVec<[_; 2]> = self.inputs.iter().map(Texture::texels).collect();
        let views: SmallVec<[TexelView<'_>; 2]> = self
            .inputs
            .iter()
            .zip(&in_guards)
            .map(|(t, g)| TexelView::new(g, t.size().width, t.size().height))
            .collect();
        let mut out_guards: SmallVec<[_; 2]> = self
            .attachments
            .iter()
            .map(|a| a.texture.texels_mut())
            .collect();
        let mut outputs: SmallVec<[&mut [Texel]; 2]> =
            out_guards.iter_mut().map(|g| g.as_mut_slice()).collect();
        let formats: SmallVec<[PixelFormat; 2]> = self
            .attachments
            .iter()
            .map(|a| a.texture.format())
            .collect();

        run_fragment(
            self.pipeline.function,
            Dispatch {
                target: self.target,
                inputs: &views,
                outputs: &mut outputs,
                formats: &formats,
                uniforms: &self.uniforms,
            },
        )
    }
}

enum EncodedPass {
    Draw(DrawPass),
    Copy {
        label: String,
        src: Texture,
        dst: Texture,
    },
}

impl EncodedPass {
    fn label(&self) -> &str {
        match self {
            Self::Draw(d) => &d.label,
            Self::Copy { label, .. } => label,
        }
    }

    fn execute(&self) -> ParallaxResult<()> {
        match self {
            Self::Draw(d) => d.execute(),
            Self::Copy { src, dst, .. } => {
                let s = src.texels();
                let mut d = dst.texels_mut();
                let format = dst.format();
                for (o, i) in d.iter_mut().zip(s.iter()) {
                    *o = format.store(*i);
                }
                Ok(())
            }
        }
    }
}

struct Shared {
    status: Mutex<CommandBufferStatus>,
    cv: Condvar,
}

impl Shared {
    fn set(&self, status: CommandBufferStatus) {
        *self.status.lock() = status;
        self.cv.notify_all();
    }
}

/// A list of passes executed in order on the queue thread.
///
/// Encoding records texture and buffer handles; contents are read at execution time.
pub struct CommandBuffer {
    label: String,
    passes: Vec<EncodedPass>,
    present: SmallVec<[Drawable; 1]>,
    scheduled: Vec<ScheduledHandler>,
    completed: Vec<CompletedHandler>,
    shared: Arc<Shared>,
    submit: Sender<CommandBuffer>,
}

impl CommandBuffer {
    pub(crate) fn new(label: impl Into<String>, submit: Sender<CommandBuffer>) -> Self {
        Self {
            label: label.into(),
            passes: Vec::new(),
            present: SmallVec::new(),
            scheduled: Vec::new(),
            completed: Vec::new(),
            shared: Arc::new(Shared {
                status: Mutex::new(CommandBufferStatus::NotEnqueued),
                cv: Condvar::new(),
            }),
            submit,
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of encoded passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Start a render pass. Fails without encoding anything if the descriptor is invalid.
    pub fn make_render_command_encoder(
        &mut self,
        descriptor: &RenderPassDescriptor,
    ) -> ParallaxResult<RenderCommandEncoder<'_>> {
        descriptor.validate()?;
        Ok(RenderCommandEncoder {
            buffer: self,
            descriptor: descriptor.clone(),
            pipeline: None,
            textures: SmallVec::new(),
            uniforms: None,
        })
    }

    /// Encode a texture-to-texture copy of equal extents.
    pub fn copy_texture(&mut self, src: &Texture, dst: &Texture) -> ParallaxResult<()> {
        if src.same_as(dst) {
            return Err(ParallaxError::encode(format!(
                "copy source and destination are both '{}'",
                src.label()
            )));
        }
        if src.size() != dst.size() {
            return Err(ParallaxError::encode(format!(
                "copy from '{}' ({}) to '{}' ({}) needs equal sizes",
                src.label(),
                src.size(),
                dst.label(),
                dst.size()
            )));
        }
        self.passes.push(EncodedPass::Copy {
            label: format!("copy {} -> {}", src.label(), dst.label()),
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(())
    }

    /// Present `drawable` once every pass ran.
    pub fn present(&mut self, drawable: &Drawable) {
        self.present.push(drawable.clone());
    }

    /// Register a callback for when execution starts.
    pub fn add_scheduled_handler(&mut self, f: impl FnOnce() + Send + 'static) {
        self.scheduled.push(Box::new(f));
    }

    /// Register a callback for when execution ends. Runs on failure too.
    pub fn add_completed_handler(&mut self, f: impl FnOnce(&CommandBufferStatus) + Send + 'static) {
        self.completed.push(Box::new(f));
    }

    /// Hand the buffer to its queue. Buffers execute in commit order.
    pub fn commit(self) -> CommitHandle {
        let handle = CommitHandle {
            label: self.label.clone(),
            shared: Arc::clone(&self.shared),
        };
        self.shared.set(CommandBufferStatus::Committed);
        let submit = self.submit.clone();
        if let Err(std::sync::mpsc::SendError(buffer)) = submit.send(self) {
            buffer.finish(CommandBufferStatus::Error(
                "command queue is no longer running".to_string(),
            ));
        }
        handle
    }

    #[tracing::instrument(skip_all, fields(label = %self.label, passes = self.passes.len()))]
    pub(crate) fn execute(mut self) {
        self.shared.set(CommandBufferStatus::Scheduled);
        for h in self.scheduled.drain(..) {
            h();
        }

        let mut status = CommandBufferStatus::Completed;
        for pass in &self.passes {
            tracing::trace!(pass = pass.label(), "execute pass");
            if let Err(e) = pass.execute() {
                tracing::warn!(pass = pass.label(), error = %e, "pass failed");
                status = CommandBufferStatus::Error(e.to_string());
                break;
            }
        }
        if status == CommandBufferStatus::Completed {
            for d in &self.present {
                d.mark_presented();
            }
        }
        self.finish(status);
    }

    fn finish(mut self, status: CommandBufferStatus) {
        for h in self.completed.drain(..) {
            h(&status);
        }
        self.shared.set(status);
    }
}

/// Waitable view of a committed command buffer.
#[derive(Clone)]
pub struct CommitHandle {
    label: String,
    shared: Arc<Shared>,
}

impl CommitHandle {
    /// Debug label of the committed buffer.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current status.
    pub fn status(&self) -> CommandBufferStatus {
        self.shared.status.lock().clone()
    }

    /// Block until the buffer completed or failed. Completed handlers have run by then.
    pub fn wait_until_completed(&self) -> CommandBufferStatus {
        let mut status = self.shared.status.lock();
        while !status.is_finished() {
            self.shared.cv.wait(&mut status);
        }
        status.clone()
    }
}

/// Records one render pass into a command buffer.
pub struct RenderCommandEncoder<'a> {
    buffer: &'a mut CommandBuffer,
    descriptor: RenderPassDescriptor,
    pipeline: Option<RenderPipelineState>,
    textures: SmallVec<[Option<Texture>; 2]>,
    uniforms: Option<BufferBinding>,
}

impl RenderCommandEncoder<'_> {
    /// Bind the pipeline used by subsequent draws.
    pub fn set_render_pipeline_state(&mut self, pipeline: &RenderPipelineState) {
        self.pipeline = Some(pipeline.clone());
    }

    /// Bind a fragment texture at `index`.
    pub fn set_fragment_texture(&mut self, texture: &Texture, index: usize) {
        if self.textures.len() <= index {
            self.textures.resize(index + 1, None);
        }
        self.textures[index] = Some(texture.clone());
    }

    /// Bind the fragment uniform buffer.
    pub fn set_fragment_buffer<T: bytemuck::Pod>(&mut self, buffer: &UniformBuffer<T>) {
        self.uniforms = Some(buffer.binding());
    }

    /// Record a full-screen draw with the current bindings.
    pub fn draw_full_screen(&mut self) -> ParallaxResult<()> {
        let label = &self.descriptor.label;
        let Some(pipeline) = self.pipeline.clone() else {
            return Err(ParallaxError::encode(format!("pass '{label}' has no pipeline")));
        };
        let Some(uniforms) = self.uniforms.clone() else {
            return Err(ParallaxError::encode(format!("pass '{label}' has no fragment buffer")));
        };
        let function = pipeline.function;

        let mut inputs: SmallVec<[Texture; 2]> = SmallVec::new();
        for (i, t) in self.textures.iter().enumerate() {
            let Some(t) = t else {
                return Err(ParallaxError::encode(format!(
                    "pass '{label}' leaves fragment texture {i} unbound"
                )));
            };
            if !t.usage().shader_read {
                return Err(ParallaxError::encode(format!(
                    "pass '{label}' reads '{}' which is not shader-readable",
                    t.label()
                )));
            }
            if self
                .descriptor
                .color_attachments
                .iter()
                .any(|a| a.texture.same_as(t))
            {
                return Err(ParallaxError::encode(format!(
                    "pass '{label}' reads and writes '{}'",
                    t.label()
                )));
            }
            inputs.push(t.clone());
        }
        if inputs.len() != function.input_count() {
            return Err(ParallaxError::encode(format!(
                "pass '{label}' binds {} textures, {} needs {}",
                inputs.len(),
                function.name(),
                function.input_count()
            )));
        }

        let formats: SmallVec<[PixelFormat; 2]> = self
            .descriptor
            .color_attachments
            .iter()
            .map(|a| a.texture.format())
            .collect();
        if formats != pipeline.color_formats {
            return Err(ParallaxError::encode(format!(
                "pass '{label}' attachments {formats:?} do not match pipeline '{}' {:?}",
                pipeline.label, pipeline.color_formats
            )));
        }

        self.buffer.passes.push(EncodedPass::Draw(DrawPass {
            label: label.clone(),
            pipeline,
            inputs,
            uniforms,
            attachments: self.descriptor.color_attachments.clone(),
            target: self.descriptor.render_target_size,
        }));
        Ok(())
    }

    /// Finish the pass.
    pub fn end_encoding(self) {}
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/command.rs"]
mod tests;
