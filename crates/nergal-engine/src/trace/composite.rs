use crate::error::{TraceError, TraceResult};

use super::{OffscreenBuffer, TraceBackend};

/// Copies the whole off-screen buffer over the display target.
///
/// The target is overwritten, never blended. Sizes must match exactly; there is
/// no scaling or cropping path.
pub fn composite<B>(backend: &mut B, buffer: &OffscreenBuffer<B::Image>, target: &B::Target) -> TraceResult<()>
where
    B: TraceBackend,
{
    let target_extent = backend.target_extent(target);
    if target_extent != buffer.extent() {
        return Err(TraceError::DimensionMismatch {
            buffer: buffer.extent(),
            target: target_extent,
        });
    }

    backend.blit(buffer.image(), target)
}
