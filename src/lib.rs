//! parallaxfx renders an animated parallax effect from a photograph and an aligned depth map.
//!
//! The public API is compositor-oriented:
//!
//! - Load a [`ParallaxImage`] (diffuse + depth, `1` = near)
//! - Create a [`FrameCompositor`] from [`ParallaxSettings`] and an [`ExportSink`]
//! - Call [`FrameCompositor::draw`] per display frame, or let a [`RenderLoop`] do it
//! - Trigger still or video exports and follow them through [`ExportEvent`]s
//!
//! Frames run on a small software GPU ([`gpu`]): the occlusion pass reprojects color and depth by
//! the viewpoint offset, then a separable depth-weighted blur adds depth of field.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Offset animation and gesture handling.
pub mod animation;
/// Image pairs, depth maps and texture upload.
pub mod assets;
/// Frame compositor, render loop and settings.
pub mod compositor;
/// Still and video export.
pub mod export;
/// Software render device.
pub mod gpu;
/// Render passes encoded by the compositor.
pub mod passes;

pub use crate::foundation::core::{
    ClearColor, Fps, OFFSET_LIMIT, Size2, Vec2, aspect_fill, clamp_offset,
};
pub use crate::foundation::error::{ParallaxError, ParallaxResult};
pub use crate::foundation::math::Fingerprint;

pub use crate::animation::controller::{
    AnimationState, OffsetController, OffsetState, PAN_SCALE, PanPhase, pan_offset,
};
pub use crate::animation::kind::AnimationKind;
pub use crate::assets::estimator::{DepthEstimator, LuminanceDepthEstimator};
pub use crate::assets::parallax_image::{DepthConvention, DepthMap, ParallaxImage};
pub use crate::compositor::frame_compositor::{FrameCompositor, FrameOutcome, SkipReason};
pub use crate::compositor::render_loop::RenderLoop;
pub use crate::compositor::settings::ParallaxSettings;
pub use crate::export::events::{ExportEvent, ExportKind, ExportObserver};
pub use crate::export::ffmpeg::{FfmpegEncoder, FfmpegEncoderOpts, is_ffmpeg_on_path};
pub use crate::export::sink::{ExportSink, FileExportSink, InMemoryExportSink};
pub use crate::gpu::texture::FrameRGBA;
