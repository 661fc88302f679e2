//! wgpu implementation of the frame pipeline.
//!
//! [`GpuBackend`] records dispatch and blit work into one command encoder per
//! frame and submits it on the device queue. [`GpuTracer`] bundles it with a
//! [`FrameDriver`](super::FrameDriver) for hosts that just want to render.

mod backend;
mod blit;
mod environment;
mod kernel;
mod scope;
mod tracer;

pub use backend::{DisplayTarget, GpuBackend, GpuImage};
pub use environment::EnvironmentImage;
pub use tracer::GpuTracer;
