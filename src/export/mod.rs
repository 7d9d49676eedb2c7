//! Still and video export.
//!
//! An export is a job living in the compositor's single pending slot ([`hooks::ExportHooks`]).
//! Each rendered frame is snapshotted and fed to the job; once every frame is captured the payload
//! goes to an [`sink::ExportSink`].

/// Progress events and the observer type.
pub mod events;
/// MP4 encoding through the system `ffmpeg`.
pub mod ffmpeg;
/// The pending-export slot.
pub mod hooks;
/// Still and video job state machines.
pub mod job;
/// Destinations for finished exports.
pub mod sink;
