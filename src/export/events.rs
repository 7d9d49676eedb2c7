/// Progress of a still or video export.
///
/// Every export emits zero or more `Rendering` events with non-decreasing percentages, then
/// `Saving`, then exactly one of `Finished` or `Failed`. An export that fails before anything was
/// handed to the sink skips `Saving`.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportEvent {
    /// Frames rendered so far, in percent.
    Rendering(f64),
    /// All frames are captured and are being handed to the sink.
    Saving,
    /// The sink accepted the export.
    Finished,
    /// The export was abandoned; nothing partial was persisted.
    Failed(String),
}

impl ExportEvent {
    /// `true` for `Finished` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}

/// Receives export events on the render thread.
pub type ExportObserver = Box<dyn FnMut(&ExportEvent) + Send + 'static>;

/// Which export a job performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    /// Diffuse and depth stills.
    Still,
    /// A looping video.
    Video,
}
