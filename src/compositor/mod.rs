//! Frame composition: the per-frame pass sequence, its pacing and its settings.

/// The multi-pass frame compositor.
pub mod frame_compositor;
/// Fixed-rate render thread.
pub mod render_loop;
/// Effect parameters and their JSON form.
pub mod settings;
