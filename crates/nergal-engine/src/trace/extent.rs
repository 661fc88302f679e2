use std::fmt;

use winit::dpi::PhysicalSize;

use crate::error::{TraceError, TraceResult};

/// Image size in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `self` when both dimensions are non-zero.
    pub fn validated(self) -> TraceResult<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(TraceError::InvalidExtent(self))
        }
    }

    /// Width divided by height, for projection setup.
    #[inline]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl From<PhysicalSize<u32>> for Extent {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(
            Extent::new(0, 600).validated(),
            Err(TraceError::InvalidExtent(Extent::new(0, 600)))
        );
        assert!(Extent::new(800, 0).validated().is_err());
    }

    #[test]
    fn pixel_count_does_not_overflow_u32() {
        assert_eq!(Extent::new(65_536, 65_536).pixel_count(), 1 << 32);
    }

    #[test]
    fn aspect_of_full_hd() {
        assert!((Extent::new(1920, 1080).aspect() - 16.0 / 9.0).abs() < 1e-6);
    }
}
