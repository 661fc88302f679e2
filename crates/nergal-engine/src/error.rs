//! Error taxonomy of the frame pipeline.
//!
//! Every failure of the capture/ensure/dispatch/composite sequence is one of
//! these variants. The frame driver surfaces them unchanged and skips the
//! composite; retry policy belongs to whoever runs the frame loop.

use crate::trace::{BufferFormat, Extent};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    /// The off-screen buffer could not be allocated.
    #[error("cannot allocate {format:?} off-screen buffer of {extent}: {reason}")]
    ResourceExhausted {
        extent: Extent,
        format: BufferFormat,
        reason: String,
    },

    /// The viewpoint's projection matrix has no usable inverse.
    #[error("projection is not invertible: {0}")]
    InvalidProjection(String),

    /// The device rejected or could not execute the compute dispatch.
    #[error("compute dispatch failed: {0}")]
    DispatchFailed(String),

    /// Buffer and target (or requested resolution) disagree on size.
    #[error("off-screen buffer is {buffer} but target is {target}")]
    DimensionMismatch { buffer: Extent, target: Extent },

    /// A resolution with a zero dimension was requested.
    #[error("extent {0} has a zero dimension")]
    InvalidExtent(Extent),
}

impl TraceError {
    /// Returns `true` when the frame loop should stop instead of skipping a frame.
    ///
    /// Allocation failure has no defined recovery, and a dimension mismatch is a
    /// programming error that would repeat on every frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TraceError::ResourceExhausted { .. } | TraceError::DimensionMismatch { .. }
        )
    }
}

/// Result type alias for frame pipeline operations.
pub type TraceResult<T> = Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_and_mismatch_are_fatal() {
        let e = TraceError::ResourceExhausted {
            extent: Extent::new(64, 64),
            format: BufferFormat::Rgba32Float,
            reason: "out of memory".into(),
        };
        assert!(e.is_fatal());

        let e = TraceError::DimensionMismatch {
            buffer: Extent::new(64, 64),
            target: Extent::new(32, 64),
        };
        assert!(e.is_fatal());
    }

    #[test]
    fn per_frame_errors_are_not_fatal() {
        assert!(!TraceError::InvalidProjection("zero fov".into()).is_fatal());
        assert!(!TraceError::DispatchFailed("device busy".into()).is_fatal());
        assert!(!TraceError::InvalidExtent(Extent::new(0, 10)).is_fatal());
    }

    #[test]
    fn messages_name_the_extents() {
        let e = TraceError::DimensionMismatch {
            buffer: Extent::new(801, 600),
            target: Extent::new(800, 600),
        };
        assert_eq!(e.to_string(), "off-screen buffer is 801x600 but target is 800x600");
    }
}
