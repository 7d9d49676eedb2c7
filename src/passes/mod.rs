//! Render passes of one frame: occlusion, then vertical blur, then horizontal blur.
//!
//! Passes own their pipeline state and uniform buffer. Textures are always borrowed from the
//! compositor.

/// Separable depth-of-field blur.
pub mod blur;
/// Depth-driven reprojection.
pub mod occlusion;
