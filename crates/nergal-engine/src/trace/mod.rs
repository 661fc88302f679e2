//! Per-frame compute orchestration.
//!
//! Each presented frame runs four steps in order:
//! - capture camera parameters from the host's viewpoint (`camera`)
//! - make sure the off-screen buffer matches the display ([`BufferManager`])
//! - dispatch the kernel over the buffer in `GROUP_EDGE`-sized tiles ([`dispatch()`])
//! - blit the buffer onto the display target ([`composite()`])
//!
//! [`FrameDriver`] sequences them. All device work goes through the
//! [`TraceBackend`] trait; [`gpu`] implements it on wgpu.

mod backend;
mod buffer;
mod composite;
mod config;
mod dispatch;
mod driver;
mod extent;
pub mod gpu;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::TraceBackend;
pub use buffer::{BufferDesc, BufferHandle, BufferManager, BufferState, OffscreenBuffer};
pub use composite::composite;
pub use config::{BufferFormat, EnvironmentSource, TracerConfig};
pub use dispatch::{dispatch, DispatchExtent, GROUP_EDGE};
pub use driver::{FrameDriver, FrameReport, FrameStats};
pub use extent::Extent;
