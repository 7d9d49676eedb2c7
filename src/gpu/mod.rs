//! Software render device.
//!
//! The model follows the usual explicit-GPU shape: a [`device::Device`] allocates textures,
//! uniform buffers and pipelines; passes are encoded into a [`command::CommandBuffer`] and
//! executed in commit order by a [`queue::CommandQueue`] thread. Fragment kernels run on the
//! rayon pool.

/// Typed uniform buffers.
pub mod buffer;
/// Command buffers, render pass descriptors and encoders.
pub mod command;
/// Resource allocation.
pub mod device;
/// Built-in fragment functions and their uniform layouts.
pub mod library;
/// Render pipeline state.
pub mod pipeline;
/// Texture sampling.
pub mod sampler;
/// Frame pacing semaphore.
pub mod semaphore;
/// Presentable drawable.
pub mod surface;
/// Textures and CPU readback.
pub mod texture;
/// Serial command queue.
pub mod queue;
