use anyhow::{Context, Result};

use crate::trace::{EnvironmentSource, Extent};

/// Background image sampled by the kernel for rays leaving the scene.
///
/// Stored as sRGB RGBA8 and sampled bilinearly with horizontal wrap, so the
/// equirectangular seam at the back of the sphere is continuous.
#[derive(Debug)]
pub struct EnvironmentImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    extent: Extent,
}

impl EnvironmentImage {
    /// Uploads the image described by `source`.
    pub fn load(device: &wgpu::Device, queue: &wgpu::Queue, source: &EnvironmentSource) -> Result<Self> {
        let (pixels, extent) = match source {
            EnvironmentSource::Path(path) => {
                let img = image::open(path)
                    .with_context(|| format!("failed to load environment image {}", path.display()))?
                    .to_rgba8();
                let extent = Extent::new(img.width(), img.height());
                (img.into_raw(), extent)
            }
            EnvironmentSource::Solid(rgba) => (rgba.to_vec(), Extent::new(1, 1)),
        };

        Self::from_rgba8(device, queue, &pixels, extent)
    }

    /// Uploads tightly packed RGBA8 pixels of `extent`.
    pub fn from_rgba8(device: &wgpu::Device, queue: &wgpu::Queue, pixels: &[u8], extent: Extent) -> Result<Self> {
        check_rgba8(pixels.len(), extent, device.limits().max_texture_dimension_2d)?;

        let size = extent.to_wgpu();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("nergal environment image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * extent.width),
                rows_per_image: Some(extent.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nergal environment sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!("uploaded environment image {extent}");

        Ok(Self { texture, view, sampler, extent })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(super) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// Checks that `len` bytes are exactly one RGBA8 image of `extent` that the
/// device can hold.
fn check_rgba8(len: usize, extent: Extent, max_dimension: u32) -> Result<()> {
    anyhow::ensure!(extent.is_valid(), "environment image {extent} has a zero dimension");
    anyhow::ensure!(
        extent.width <= max_dimension && extent.height <= max_dimension,
        "environment image {extent} is outside the device limit of {max_dimension}"
    );

    let expected = extent.pixel_count() * 4;
    anyhow::ensure!(
        len as u64 == expected,
        "environment image {extent} needs {expected} bytes of RGBA8, got {len}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rgba8_length_is_accepted() {
        assert!(check_rgba8(4 * 6, Extent::new(3, 2), 8192).is_ok());
    }

    #[test]
    fn short_pixel_slice_is_rejected() {
        let err = check_rgba8(4 * 5, Extent::new(3, 2), 8192).unwrap_err();
        assert!(err.to_string().contains("needs 24 bytes"));
    }

    #[test]
    fn long_pixel_slice_is_rejected() {
        assert!(check_rgba8(4 * 7, Extent::new(3, 2), 8192).is_err());
    }

    #[test]
    fn oversized_or_empty_images_are_rejected() {
        assert!(check_rgba8(4 * 16385, Extent::new(16385, 1), 16384).is_err());
        assert!(check_rgba8(0, Extent::new(0, 4), 16384).is_err());
    }
}
