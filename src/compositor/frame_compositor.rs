use std::sync::Arc;

use crate::{
    animation::{
        controller::{OffsetController, OffsetState, PanPhase},
        kind::AnimationKind,
    },
    assets::{
        loader::{InputTextures, TextureLoader},
        parallax_image::ParallaxImage,
    },
    compositor::settings::ParallaxSettings,
    export::{
        events::ExportObserver,
        hooks::ExportHooks,
        job::{FrameDirective, VideoExportPlan},
        sink::ExportSink,
    },
    foundation::{
        core::{
            BLUR_INTENSITY_RANGE, ClearColor, FOCAL_POINT_RANGE, Fps, INTENSITY_RANGE,
            INTERVAL_SECS_RANGE, Size2, Vec2, aspect_fill, check_range,
        },
        error::{ParallaxError, ParallaxResult},
    },
    gpu::{
        command::{CommandBuffer, CommandBufferStatus},
        device::Device,
        queue::CommandQueue,
        semaphore::FrameSemaphore,
        surface::Drawable,
        texture::{FrameRGBA, PixelFormat, Texture, TextureDescriptor, TextureUsage},
    },
    passes::{
        blur::{BlurAxis, BlurPass},
        occlusion::ParallaxOcclusionPass,
    },
};

/// Why [`FrameCompositor::draw`] did not present a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No image has been set.
    NoImage,
    /// The drawable size is zero.
    NoSurface,
    /// Encoding failed; the error is logged and the next frame starts clean.
    EncodeFailed(String),
}

/// Result of one [`FrameCompositor::draw`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A command buffer was committed and presents the drawable.
    Presented,
    /// Nothing was committed.
    Skipped(SkipReason),
}

/// Render targets sized to the drawable.
#[derive(Clone, Debug)]
struct FrameTargets {
    occlusion_color: Texture,
    occlusion_depth: Texture,
    v_blur: Texture,
    drawable: Drawable,
}

impl FrameTargets {
    fn new(device: &Device, size: Size2) -> ParallaxResult<Self> {
        let target = |label: &str| {
            device.make_texture(&TextureDescriptor {
                label: label.to_string(),
                size,
                format: PixelFormat::Rgba16Float,
                usage: TextureUsage::RENDER_TARGET_AND_READ,
            })
        };
        Ok(Self {
            occlusion_color: target("occlusion_color")?,
            occlusion_depth: target("occlusion_depth")?,
            v_blur: target("v_blur")?,
            drawable: device.make_drawable(size)?,
        })
    }
}

/// Renders the parallax effect into a drawable, one frame at a time.
///
/// Each frame runs the occlusion pass, then the vertical and horizontal blur passes, on the
/// command queue. A semaphore with a single permit keeps at most one frame in flight, so uniform
/// buffers and targets are never rewritten while the queue reads them.
///
/// Every setter is idempotent and returns whether anything changed.
pub struct FrameCompositor {
    device: Device,
    queue: CommandQueue,
    occlusion: ParallaxOcclusionPass,
    v_blur: BlurPass,
    h_blur: BlurPass,

    image: Option<Arc<ParallaxImage>>,
    inputs: Option<InputTextures>,
    targets: Option<FrameTargets>,
    size: Size2,

    semaphore: Arc<FrameSemaphore>,
    controller: OffsetController,
    export: ExportHooks,

    focal_point: f32,
    blur_intensity: f32,
    show_depth: bool,
    clear_color: ClearColor,
    export_fps: Fps,
    export_target_secs: f64,
    frame_index: u64,
}

impl FrameCompositor {
    /// Build a compositor on the default device. Finished exports go to `sink`.
    #[tracing::instrument(skip_all)]
    pub fn new(settings: &ParallaxSettings, sink: Box<dyn ExportSink>) -> ParallaxResult<Self> {
        settings.validate()?;
        let device = Device::system_default()?;
        let queue = device.make_command_queue("frames")?;
        let mut occlusion = ParallaxOcclusionPass::new(&device)?;
        let mut v_blur = BlurPass::new(&device, BlurAxis::Vertical, PixelFormat::Rgba16Float)?;
        let mut h_blur = BlurPass::new(&device, BlurAxis::Horizontal, PixelFormat::Rgba8Unorm)?;

        occlusion.set_focal_point(settings.focal_point);
        for pass in [&mut v_blur, &mut h_blur] {
            pass.set_focal_point(settings.focal_point);
            pass.set_blur_intensity(settings.blur_intensity);
        }

        tracing::debug!(device = device.name(), "compositor ready");
        Ok(Self {
            device,
            queue,
            occlusion,
            v_blur,
            h_blur,
            image: None,
            inputs: None,
            targets: None,
            size: Size2::default(),
            semaphore: Arc::new(FrameSemaphore::new(1)),
            controller: OffsetController::new(settings.animation_state()),
            export: ExportHooks::new(sink),
            focal_point: settings.focal_point,
            blur_intensity: settings.blur_intensity,
            show_depth: false,
            clear_color: settings.clear_color,
            export_fps: settings.export_fps,
            export_target_secs: settings.export_target_secs,
            frame_index: 0,
        })
    }

    /// Apply the per-frame fields of `settings`. Returns `true` if any of them changed.
    ///
    /// `depth_convention` is read when an image is loaded and `display_fps` when a
    /// [`RenderLoop`](crate::compositor::render_loop::RenderLoop) is spawned, so neither is
    /// applied or reported here.
    pub fn apply_settings(&mut self, settings: &ParallaxSettings) -> ParallaxResult<bool> {
        settings.validate()?;
        let mut changed = false;
        changed |= self.set_animation_kind(settings.animation);
        changed |= self.set_animation_interval(settings.interval_secs)?;
        changed |= self.set_animation_intensity(settings.intensity)?;
        changed |= self.set_focal_point(settings.focal_point)?;
        changed |= self.set_blur_intensity(settings.blur_intensity)?;
        changed |= self.set_clear_color(settings.clear_color);
        if self.export_fps != settings.export_fps
            || self.export_target_secs != settings.export_target_secs
        {
            self.export_fps = settings.export_fps;
            self.export_target_secs = settings.export_target_secs;
            changed = true;
        }
        Ok(changed)
    }

    /// Replace the image. Unchanged images (same fingerprint) are ignored.
    ///
    /// A running export is abandoned, since its frames would mix two images.
    #[tracing::instrument(skip_all, fields(size = %image.size()))]
    pub fn set_image(&mut self, image: Arc<ParallaxImage>) -> ParallaxResult<bool> {
        if self
            .image
            .as_ref()
            .is_some_and(|cur| cur.fingerprint() == image.fingerprint())
        {
            return Ok(false);
        }
        let inputs = TextureLoader::new(&self.device).upload(&image)?;
        if self.export.cancel("image replaced during export") {
            self.controller.end_export();
        }
        self.inputs = Some(inputs);
        self.image = Some(image);
        Ok(true)
    }

    /// Current image.
    pub fn image(&self) -> Option<&Arc<ParallaxImage>> {
        self.image.as_ref()
    }

    /// Resize the drawable and intermediate targets. Waits for the frame in flight.
    ///
    /// A zero size drops the targets; frames are skipped until a real size arrives.
    #[tracing::instrument(skip(self))]
    pub fn resize(&mut self, size: Size2) -> ParallaxResult<bool> {
        if size == self.size {
            return Ok(false);
        }
        self.semaphore.wait();
        let targets = if size.is_empty() {
            Ok(None)
        } else {
            FrameTargets::new(&self.device, size).map(Some)
        };
        self.semaphore.signal();
        self.targets = targets?;
        self.size = size;
        tracing::debug!("targets recreated");
        Ok(true)
    }

    /// Resize so the current image fills `container`, keeping its aspect ratio.
    ///
    /// One extent matches the container and the other overflows it.
    pub fn resize_to_fill(&mut self, container: Size2) -> ParallaxResult<bool> {
        let Some(image) = self.image.as_ref() else {
            return Err(ParallaxError::validation("resize_to_fill needs an image"));
        };
        let size = aspect_fill(image.size(), container)?;
        self.resize(size)
    }

    /// Drawable size.
    pub fn size(&self) -> Size2 {
        self.size
    }

    /// Render one frame at `elapsed_secs` since the animation started.
    ///
    /// Blocks while the previous frame is still executing. Export frames additionally wait for
    /// their own completion so the drawable can be snapshotted.
    #[tracing::instrument(skip(self), fields(frame = self.frame_index))]
    pub fn draw(&mut self, elapsed_secs: f64) -> FrameOutcome {
        let Some(inputs) = self.inputs.clone() else {
            return FrameOutcome::Skipped(SkipReason::NoImage);
        };
        let Some(targets) = self.targets.clone() else {
            return FrameOutcome::Skipped(SkipReason::NoSurface);
        };

        let directive = self.export.before_frame();
        if directive.is_none() && self.controller.state() == OffsetState::Exporting {
            self.controller.end_export();
        }
        let (offset, show_depth) = match directive {
            Some(FrameDirective { offset, show_depth }) => {
                self.controller.set_export_offset(offset);
                (offset, show_depth)
            }
            None => (self.controller.tick(elapsed_secs), self.show_depth),
        };

        self.semaphore.wait();
        let mut cmd = match self.encode_frame(&inputs, &targets, offset, show_depth) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!(error = %e, "frame encode failed, skipping");
                self.semaphore.signal();
                if directive.is_some() && self.export.after_frame(None) {
                    self.controller.end_export();
                }
                return FrameOutcome::Skipped(SkipReason::EncodeFailed(e.to_string()));
            }
        };

        let semaphore = Arc::clone(&self.semaphore);
        cmd.add_completed_handler(move |status| {
            if let CommandBufferStatus::Error(e) = status {
                tracing::warn!(error = %e, "frame execution failed");
            }
            semaphore.signal();
        });
        cmd.present(&targets.drawable);
        let handle = cmd.commit();
        self.frame_index += 1;

        if directive.is_some() {
            let frame = match handle.wait_until_completed() {
                CommandBufferStatus::Completed => Some(targets.drawable.snapshot()),
                _ => None,
            };
            if self.export.after_frame(frame) {
                self.controller.end_export();
            }
        }
        FrameOutcome::Presented
    }

    fn encode_frame(
        &mut self,
        inputs: &InputTextures,
        targets: &FrameTargets,
        offset: Vec2,
        show_depth: bool,
    ) -> ParallaxResult<CommandBuffer> {
        let mut cmd = self
            .queue
            .make_command_buffer(format!("frame {}", self.frame_index))?;
        let size = self.size;
        let drawable = targets.drawable.texture();

        self.occlusion.set_offset(offset);
        self.occlusion.encode(
            &mut cmd,
            &inputs.color,
            &inputs.depth,
            &targets.occlusion_color,
            &targets.occlusion_depth,
            size,
            self.clear_color,
        )?;

        if show_depth {
            cmd.copy_texture(&targets.occlusion_depth, drawable)?;
        } else if self.blur_intensity <= 0.0 {
            cmd.copy_texture(&targets.occlusion_color, drawable)?;
        } else {
            self.v_blur.encode(
                &mut cmd,
                &targets.occlusion_color,
                &targets.occlusion_depth,
                &targets.v_blur,
                size,
                self.clear_color,
            )?;
            self.h_blur.encode(
                &mut cmd,
                &targets.v_blur,
                &targets.occlusion_depth,
                drawable,
                size,
                self.clear_color,
            )?;
        }
        Ok(cmd)
    }

    /// Snapshot the drawable once the frame in flight completed.
    pub fn snapshot(&self) -> Option<FrameRGBA> {
        let targets = self.targets.as_ref()?;
        self.semaphore.wait();
        let frame = targets.drawable.snapshot();
        self.semaphore.signal();
        Some(frame)
    }

    /// The current drawable, if the compositor has a non-zero size.
    pub fn drawable(&self) -> Option<&Drawable> {
        self.targets.as_ref().map(|t| &t.drawable)
    }

    /// Block until the frame in flight, if any, completed.
    pub fn wait_idle(&self) {
        self.semaphore.wait();
        self.semaphore.signal();
    }

    /// Number of frames committed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Offset of the most recent frame or gesture.
    pub fn offset(&self) -> Vec2 {
        self.controller.offset()
    }

    /// Who currently drives the offset.
    pub fn offset_state(&self) -> OffsetState {
        self.controller.state()
    }

    /// Forward a pan gesture in view points. Ignored while exporting.
    pub fn pan(&mut self, phase: PanPhase, translation: Vec2, view_size: Size2) -> bool {
        self.controller.pan(phase, translation, view_size)
    }

    /// Pause or resume the idle animation.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        self.controller.set_paused(paused)
    }

    /// Change the animation shape.
    pub fn set_animation_kind(&mut self, kind: AnimationKind) -> bool {
        self.controller.set_kind(kind)
    }

    /// Change the animation cycle length, 1 to 10 seconds.
    pub fn set_animation_interval(&mut self, secs: f64) -> ParallaxResult<bool> {
        check_range("interval_secs", secs, &INTERVAL_SECS_RANGE)?;
        Ok(self.controller.set_interval_secs(secs))
    }

    /// Change the animation amplitude, 0 to 0.1.
    pub fn set_animation_intensity(&mut self, intensity: f64) -> ParallaxResult<bool> {
        check_range("intensity", intensity, &INTENSITY_RANGE)?;
        Ok(self.controller.set_intensity(intensity))
    }

    /// Set the depth that stays still and sharp, 0 to 1.
    pub fn set_focal_point(&mut self, focal_point: f32) -> ParallaxResult<bool> {
        check_range("focal_point", f64::from(focal_point), &FOCAL_POINT_RANGE)?;
        if self.focal_point == focal_point {
            return Ok(false);
        }
        self.focal_point = focal_point;
        self.occlusion.set_focal_point(focal_point);
        self.v_blur.set_focal_point(focal_point);
        self.h_blur.set_focal_point(focal_point);
        Ok(true)
    }

    /// Focal depth.
    pub fn focal_point(&self) -> f32 {
        self.focal_point
    }

    /// Set the depth-of-field strength, 0 to 3. Zero skips both blur passes.
    pub fn set_blur_intensity(&mut self, intensity: f32) -> ParallaxResult<bool> {
        check_range("blur_intensity", f64::from(intensity), &BLUR_INTENSITY_RANGE)?;
        if self.blur_intensity == intensity {
            return Ok(false);
        }
        self.blur_intensity = intensity;
        self.v_blur.set_blur_intensity(intensity);
        self.h_blur.set_blur_intensity(intensity);
        Ok(true)
    }

    /// Depth-of-field strength.
    pub fn blur_intensity(&self) -> f32 {
        self.blur_intensity
    }

    /// Show the reprojected depth instead of the color image.
    pub fn set_show_depth(&mut self, show_depth: bool) -> bool {
        if self.show_depth == show_depth {
            return false;
        }
        self.show_depth = show_depth;
        true
    }

    /// `true` while the depth layer is displayed.
    pub fn show_depth(&self) -> bool {
        self.show_depth
    }

    /// Set the color written where nothing is drawn.
    pub fn set_clear_color(&mut self, clear_color: ClearColor) -> bool {
        if self.clear_color == clear_color {
            return false;
        }
        self.clear_color = clear_color;
        true
    }

    /// Replace the destination of finished exports.
    pub fn set_export_sink(&mut self, sink: Box<dyn ExportSink>) {
        self.export.set_sink(sink);
    }

    /// Install or clear the export progress observer.
    pub fn set_export_observer(&mut self, observer: Option<ExportObserver>) {
        self.export.set_observer(observer);
    }

    /// Start exporting the diffuse and depth stills over the next two frames.
    ///
    /// Returns `false` if an export is already running, no image is set, or the drawable has
    /// no size.
    pub fn begin_still_export(&mut self) -> bool {
        if self.inputs.is_none() || self.targets.is_none() {
            tracing::debug!("still export ignored, no image or surface");
            return false;
        }
        if !self.export.begin_still() {
            return false;
        }
        self.controller.begin_export();
        true
    }

    /// Start exporting one looping video of the current animation.
    ///
    /// Returns `false` if an export is already running, no image is set, the drawable has no
    /// size, or the plan is empty. Odd drawable sizes are fine; the encoder pads them.
    pub fn begin_video_export(&mut self) -> bool {
        if self.inputs.is_none() || self.targets.is_none() {
            tracing::debug!("video export ignored, no image or surface");
            return false;
        }
        let animation = self.controller.animation();
        let plan = VideoExportPlan {
            kind: animation.kind,
            interval_secs: animation.interval_secs,
            intensity: animation.intensity,
            fps: self.export_fps,
            target_secs: self.export_target_secs,
        };
        if !self.export.begin_video(&plan) {
            return false;
        }
        self.controller.begin_export();
        true
    }

    /// A still export is running.
    pub fn is_saving_to_photos(&self) -> bool {
        self.export.is_saving_to_photos()
    }

    /// A video export is running.
    pub fn is_saving_to_video(&self) -> bool {
        self.export.is_saving_to_video()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/frame_compositor.rs"]
mod tests;
