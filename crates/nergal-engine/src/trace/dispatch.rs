use crate::camera::CameraFrameParameters;
use crate::error::{TraceError, TraceResult};

use super::{Extent, OffscreenBuffer, TraceBackend};

/// Edge length, in pixels, of the square tile one work group covers.
///
/// The kernel's `@workgroup_size` is built from this value through a pipeline
/// override constant, so the two cannot drift apart.
pub const GROUP_EDGE: u32 = 8;

/// Number of work groups per axis for one dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DispatchExtent {
    pub groups_x: u32,
    pub groups_y: u32,
}

impl DispatchExtent {
    /// Smallest grid of `GROUP_EDGE` tiles covering every pixel of `extent`.
    ///
    /// Groups on the right and bottom edge may hang over the image; the kernel
    /// discards those invocations.
    #[inline]
    pub const fn covering(extent: Extent) -> Self {
        Self {
            groups_x: extent.width.div_ceil(GROUP_EDGE),
            groups_y: extent.height.div_ceil(GROUP_EDGE),
        }
    }

    /// Always one: the output is a single 2D image.
    #[inline]
    pub const fn groups_z(self) -> u32 {
        1
    }

    /// Pixel area covered by the grid, including overhang.
    ///
    /// Saturates at `u32::MAX` for grids over the largest extents.
    #[inline]
    pub const fn covered(self) -> Extent {
        Extent::new(
            self.groups_x.saturating_mul(GROUP_EDGE),
            self.groups_y.saturating_mul(GROUP_EDGE),
        )
    }

    #[inline]
    pub const fn total_groups(self) -> u64 {
        self.groups_x as u64 * self.groups_y as u64
    }
}

/// Dispatches the kernel over the whole of `buffer`.
///
/// The buffer must be write-enabled and exactly `resolution` in size; it is
/// bound as `Result` and the camera parameters as the kernel inputs. Returns
/// the grid that was dispatched.
pub fn dispatch<B>(
    backend: &mut B,
    buffer: &OffscreenBuffer<B::Image>,
    params: &CameraFrameParameters<B::Environment>,
    resolution: Extent,
) -> TraceResult<DispatchExtent>
where
    B: TraceBackend,
{
    let resolution = resolution.validated()?;

    if buffer.extent() != resolution {
        return Err(TraceError::DimensionMismatch {
            buffer: buffer.extent(),
            target: resolution,
        });
    }

    if !buffer.desc().random_write {
        return Err(TraceError::DispatchFailed(
            "output buffer was allocated without random-write access".to_string(),
        ));
    }

    let groups = DispatchExtent::covering(resolution);
    log::trace!(
        "dispatching {}x{}x{} groups for {}",
        groups.groups_x,
        groups.groups_y,
        groups.groups_z(),
        resolution
    );

    backend
        .dispatch(buffer.image(), params, groups)
        .inspect_err(|e| log::warn!("dispatch into buffer #{} failed: {e}", buffer.handle().id()))?;

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(w: u32, h: u32) -> (u32, u32) {
        let g = DispatchExtent::covering(Extent::new(w, h));
        (g.groups_x, g.groups_y)
    }

    // ── covering ──────────────────────────────────────────────────────────

    #[test]
    fn full_hd() {
        assert_eq!(groups(1920, 1080), (240, 135));
    }

    #[test]
    fn non_multiple_rounds_up() {
        assert_eq!(groups(801, 600), (101, 75));
    }

    #[test]
    fn single_pixel_needs_one_group() {
        assert_eq!(groups(1, 1), (1, 1));
    }

    #[test]
    fn exact_multiple_has_no_overhang() {
        let g = DispatchExtent::covering(Extent::new(64, 32));
        assert_eq!(g.covered(), Extent::new(64, 32));
    }

    #[test]
    fn coverage_is_tight_for_all_small_sizes() {
        for w in 1..=200u32 {
            for h in [1u32, 7, 8, 9, 599, 600, 601] {
                let g = DispatchExtent::covering(Extent::new(w, h));
                assert!(g.groups_x * GROUP_EDGE >= w, "{w}x{h}");
                assert!(g.groups_y * GROUP_EDGE >= h, "{w}x{h}");
                assert!((g.groups_x - 1) * GROUP_EDGE < w, "{w}x{h}");
                assert!((g.groups_y - 1) * GROUP_EDGE < h, "{w}x{h}");
            }
        }
    }

    #[test]
    fn largest_extent_does_not_overflow() {
        let g = DispatchExtent::covering(Extent::new(u32::MAX, u32::MAX));
        assert_eq!(g.groups_x, u32::MAX.div_ceil(GROUP_EDGE));
        assert_eq!(g.groups_z(), 1);
        assert_eq!(g.covered(), Extent::new(u32::MAX, u32::MAX));
    }
}
