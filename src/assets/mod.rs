/// Depth estimation seam.
pub mod estimator;
/// Uploading images into input textures.
pub mod loader;
/// Diffuse/depth image pairs.
pub mod parallax_image;
