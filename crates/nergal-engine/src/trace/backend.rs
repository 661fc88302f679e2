use crate::camera::CameraFrameParameters;
use crate::error::TraceResult;

use super::{BufferDesc, DispatchExtent, Extent};

/// Device operations the frame pipeline needs.
///
/// Commands are recorded in call order onto one in-order stream and only
/// reach the device on [`submit`](Self::submit). [`discard`](Self::discard)
/// drops everything recorded since the last submit, which is how a failed
/// frame avoids compositing a half-written buffer.
pub trait TraceBackend {
    /// Off-screen storage image.
    type Image;

    /// Background image bound as `EnvironmentImage`.
    type Environment;

    /// Presentation surface the buffer is blitted onto.
    type Target;

    /// Allocates an image described by `desc`.
    ///
    /// Device memory exhaustion is reported as `ResourceExhausted`.
    fn allocate_image(&mut self, desc: &BufferDesc) -> TraceResult<Self::Image>;

    /// Releases an image. Work already recorded against it stays valid.
    fn release_image(&mut self, image: Self::Image);

    /// Records one kernel dispatch of `groups` writing into `output`.
    ///
    /// Errors the device raises while recording are reported as
    /// `DispatchFailed`.
    fn dispatch(
        &mut self,
        output: &Self::Image,
        params: &CameraFrameParameters<Self::Environment>,
        groups: DispatchExtent,
    ) -> TraceResult<()>;

    /// Size of the display target.
    fn target_extent(&self, target: &Self::Target) -> Extent;

    /// Records a texel-exact copy of `source` over the whole of `target`.
    fn blit(&mut self, source: &Self::Image, target: &Self::Target) -> TraceResult<()>;

    /// Sends recorded commands to the device.
    ///
    /// Device errors that only surface when the commands are finished are
    /// reported as `DispatchFailed`; the recorded work is gone either way.
    fn submit(&mut self) -> TraceResult<()>;

    /// Drops recorded commands without executing them.
    fn discard(&mut self);
}
