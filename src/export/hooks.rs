use crate::{
    export::{
        events::{ExportEvent, ExportKind, ExportObserver},
        job::{ExportJob, ExportPayload, FrameDirective, JobStep, VideoExportPlan},
        sink::ExportSink,
    },
    gpu::texture::FrameRGBA,
};

/// The single pending-export slot driven by the compositor.
///
/// At most one job exists at a time. Triggers while a job is active are ignored. The flags are
/// cleared on every terminal event so a failed export can be retried.
pub struct ExportHooks {
    job: Option<ExportJob>,
    sink: Box<dyn ExportSink>,
    observer: Option<ExportObserver>,
    saving_to_photos: bool,
    saving_to_video: bool,
}

impl std::fmt::Debug for ExportHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportHooks")
            .field("job", &self.job.as_ref().map(ExportJob::kind))
            .field("has_observer", &self.observer.is_some())
            .field("saving_to_photos", &self.saving_to_photos)
            .field("saving_to_video", &self.saving_to_video)
            .finish()
    }
}

impl ExportHooks {
    /// Hooks delivering finished exports to `sink`.
    pub fn new(sink: Box<dyn ExportSink>) -> Self {
        Self {
            job: None,
            sink,
            observer: None,
            saving_to_photos: false,
            saving_to_video: false,
        }
    }

    /// Replace the sink. Takes effect for the next save.
    pub fn set_sink(&mut self, sink: Box<dyn ExportSink>) {
        self.sink = sink;
    }

    /// Install or clear the event observer.
    pub fn set_observer(&mut self, observer: Option<ExportObserver>) {
        self.observer = observer;
    }

    /// A still export is running.
    pub fn is_saving_to_photos(&self) -> bool {
        self.saving_to_photos
    }

    /// A video export is running.
    pub fn is_saving_to_video(&self) -> bool {
        self.saving_to_video
    }

    /// Any export is running.
    pub fn is_active(&self) -> bool {
        self.saving_to_photos || self.saving_to_video
    }

    /// Start a still export. Returns `false` if an export is already running.
    pub fn begin_still(&mut self) -> bool {
        if self.is_active() {
            tracing::debug!("still export ignored, export already running");
            return false;
        }
        self.job = Some(ExportJob::still());
        self.saving_to_photos = true;
        tracing::info!("still export started");
        true
    }

    /// Start a video export. Returns `false` if an export is already running or the plan yields
    /// no frames (the latter emits `Failed`).
    pub fn begin_video(&mut self, plan: &VideoExportPlan) -> bool {
        if self.is_active() {
            tracing::debug!("video export ignored, export already running");
            return false;
        }
        match ExportJob::video(plan) {
            Ok(job) => {
                tracing::info!(frames = plan.total_frames(), fps = %plan.fps.as_f64(), "video export started");
                self.job = Some(job);
                self.saving_to_video = true;
                true
            }
            Err(e) => {
                self.emit(ExportEvent::Failed(e.to_string()));
                false
            }
        }
    }

    /// Directive for the frame about to be rendered, or `None` when no export is running.
    pub fn before_frame(&mut self) -> Option<FrameDirective> {
        let directive = self.job.as_mut()?.before_frame();
        if directive.is_none() {
            self.finish(ExportEvent::Failed(
                "export job has nothing left to render".to_string(),
            ));
        }
        directive
    }

    /// Feed the snapshot of the frame rendered for the last directive.
    ///
    /// Returns `true` when the export reached a terminal event during this call.
    pub fn after_frame(&mut self, frame: Option<FrameRGBA>) -> bool {
        let Some(job) = self.job.as_mut() else {
            return false;
        };
        match job.after_frame(frame) {
            JobStep::Continue(pct) => {
                self.emit(ExportEvent::Rendering(pct));
                false
            }
            JobStep::Ready(pct, payload) => {
                self.emit(ExportEvent::Rendering(pct));
                self.emit(ExportEvent::Saving);
                let saved = match &payload {
                    ExportPayload::Still { diffuse, depth } => self.sink.save_still(diffuse, depth),
                    ExportPayload::Video { frames, fps } => self.sink.save_video(frames, *fps),
                };
                match saved {
                    Ok(()) => self.finish(ExportEvent::Finished),
                    Err(e) => self.finish(ExportEvent::Failed(e.to_string())),
                }
                true
            }
            JobStep::Failed(reason) => {
                self.finish(ExportEvent::Failed(reason));
                true
            }
        }
    }

    /// Abandon the running export, if any.
    pub fn cancel(&mut self, reason: &str) -> bool {
        if self.job.is_none() {
            return false;
        }
        self.finish(ExportEvent::Failed(reason.to_string()));
        true
    }

    /// Kind of the running export.
    pub fn active_kind(&self) -> Option<ExportKind> {
        self.job.as_ref().map(ExportJob::kind)
    }

    fn finish(&mut self, event: ExportEvent) {
        self.job = None;
        self.saving_to_photos = false;
        self.saving_to_video = false;
        self.emit(event);
    }

    fn emit(&mut self, event: ExportEvent) {
        match &event {
            ExportEvent::Failed(reason) => tracing::warn!(%reason, "export failed"),
            ExportEvent::Rendering(pct) => tracing::debug!(pct, "export rendering"),
            other => tracing::info!(event = ?other, "export"),
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/hooks.rs"]
mod tests;
