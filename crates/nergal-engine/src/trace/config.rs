use std::path::PathBuf;

/// Channel layout of the off-screen buffer.
///
/// Both variants are four-channel float formats the kernel can store to from
/// any invocation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BufferFormat {
    /// 32-bit float per channel.
    #[default]
    Rgba32Float,
    /// 16-bit float per channel; half the memory, enough for display.
    Rgba16Float,
}

impl BufferFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u64 {
        match self {
            BufferFormat::Rgba32Float => 16,
            BufferFormat::Rgba16Float => 8,
        }
    }

    /// Storage texel format name as spelled in WGSL.
    #[inline]
    pub const fn wgsl_name(self) -> &'static str {
        match self {
            BufferFormat::Rgba32Float => "rgba32float",
            BufferFormat::Rgba16Float => "rgba16float",
        }
    }

    #[inline]
    pub const fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            BufferFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            BufferFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Where the kernel's background image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentSource {
    /// Equirectangular image file (PNG, JPEG, BMP, TIFF or WebP).
    Path(PathBuf),
    /// Uniform background, straight sRGB RGBA bytes.
    Solid([u8; 4]),
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        EnvironmentSource::Solid([40, 44, 52, 255])
    }
}

/// Configuration of the frame pipeline.
#[derive(Debug, Clone, Default)]
pub struct TracerConfig {
    /// Format of the off-screen buffer.
    pub buffer_format: BufferFormat,

    /// Upper bound on the off-screen buffer size in bytes.
    ///
    /// Requests above it fail with `ResourceExhausted` instead of reaching the
    /// device. `None` leaves only the device's own limits.
    pub max_buffer_bytes: Option<u64>,

    /// Background image bound as `EnvironmentImage`.
    pub environment: EnvironmentSource,
}
