//! Camera parameter capture.
//!
//! The host owns its viewpoint and lends it to the frame driver each frame
//! through the [`Viewpoint`] trait. [`CameraProvider`] turns one read of it
//! into the matrices the kernel needs to rebuild per-pixel view rays.

mod projection;
mod provider;
mod viewpoint;

pub use projection::Projection;
pub use provider::{invert_projection, CameraFrameParameters, CameraProvider};
pub use viewpoint::{Camera, ViewTransforms, Viewpoint};
