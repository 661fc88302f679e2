//! Nergal engine crate.
//!
//! Drives a GPU compute kernel once per presented frame: keeps an off-screen
//! storage image sized to the display, feeds the kernel the camera transforms it
//! needs to rebuild view rays, dispatches it over the whole image and blits the
//! result onto the swapchain. The platform + GPU runtime pieces live here too.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod camera;
pub mod error;
pub mod trace;

pub use error::{TraceError, TraceResult};
