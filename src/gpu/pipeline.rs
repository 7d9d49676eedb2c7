use smallvec::SmallVec;

use crate::gpu::{library::FragmentFunction, texture::PixelFormat};

/// Parameters for [`Device::make_render_pipeline_state`](crate::gpu::device::Device::make_render_pipeline_state).
#[derive(Clone, Debug)]
pub struct RenderPipelineDescriptor {
    /// Debug label.
    pub label: String,
    /// Fragment function name in the device's shader library.
    pub fragment_function: String,
    /// One format per color attachment, in attachment order.
    pub color_formats: SmallVec<[PixelFormat; 2]>,
}

/// Compiled pipeline: a resolved fragment function plus its attachment formats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderPipelineState {
    pub(crate) label: String,
    pub(crate) function: FragmentFunction,
    pub(crate) color_formats: SmallVec<[PixelFormat; 2]>,
}

impl RenderPipelineState {
    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Fragment function this pipeline runs.
    pub fn function(&self) -> FragmentFunction {
        self.function
    }

    /// Attachment formats the pipeline writes.
    pub fn color_formats(&self) -> &[PixelFormat] {
        &self.color_formats
    }
}
