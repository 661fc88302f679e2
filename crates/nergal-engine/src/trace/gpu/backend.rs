use crate::camera::CameraFrameParameters;
use crate::error::{TraceError, TraceResult};
use crate::trace::{BufferDesc, BufferFormat, DispatchExtent, Extent, TraceBackend};

use super::blit::BlitPipeline;
use super::kernel::KernelPipeline;
use super::scope::{allocation_error, capture, dispatch_error};
use super::EnvironmentImage;

/// Off-screen buffer texture.
#[derive(Debug)]
pub struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: BufferFormat,
}

impl GpuImage {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn format(&self) -> BufferFormat {
        self.format
    }
}

/// Acquired swapchain image the frame is composited onto.
#[derive(Debug)]
pub struct DisplayTarget {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub extent: Extent,
}

impl DisplayTarget {
    pub fn from_surface_texture(texture: &wgpu::SurfaceTexture) -> Self {
        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            format: texture.texture.format(),
            extent: Extent::new(texture.texture.width(), texture.texture.height()),
        }
    }
}

/// [`TraceBackend`] on a wgpu device.
///
/// All work of a frame goes into one command encoder, created lazily by the
/// first recording call and finished on [`submit`](TraceBackend::submit).
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    kernel: KernelPipeline,
    blit: BlitPipeline,

    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            kernel: KernelPipeline::new(),
            blit: BlitPipeline::new(),
            encoder: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

fn frame_encoder<'a>(slot: &'a mut Option<wgpu::CommandEncoder>, device: &wgpu::Device) -> &'a mut wgpu::CommandEncoder {
    slot.get_or_insert_with(|| {
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("nergal frame encoder"),
        })
    })
}

impl TraceBackend for GpuBackend {
    type Image = GpuImage;
    type Environment = EnvironmentImage;
    type Target = DisplayTarget;

    fn allocate_image(&mut self, desc: &BufferDesc) -> TraceResult<GpuImage> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.extent.width > max || desc.extent.height > max {
            return Err(TraceError::ResourceExhausted {
                extent: desc.extent,
                format: desc.format,
                reason: format!("device textures are limited to {max}x{max}"),
            });
        }

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC;
        if desc.random_write {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }

        let device = &self.device;
        let ((texture, oom), invalid) = capture(device, wgpu::ErrorFilter::Validation, || {
            capture(device, wgpu::ErrorFilter::OutOfMemory, || {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("nergal off-screen buffer"),
                    size: desc.extent.to_wgpu(),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: desc.format.to_wgpu(),
                    usage,
                    view_formats: &[],
                })
            })
        });
        if let Some(err) = oom.or(invalid) {
            texture.destroy();
            return Err(allocation_error(desc, &err));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuImage {
            texture,
            view,
            format: desc.format,
        })
    }

    fn release_image(&mut self, image: GpuImage) {
        // Submitted work that still reads the texture completes first.
        image.texture.destroy();
    }

    fn dispatch(
        &mut self,
        output: &GpuImage,
        params: &CameraFrameParameters<EnvironmentImage>,
        groups: DispatchExtent,
    ) -> TraceResult<()> {
        let max = self.device.limits().max_compute_workgroups_per_dimension;
        if groups.groups_x > max || groups.groups_y > max {
            return Err(TraceError::DispatchFailed(format!(
                "{}x{} groups exceed the device limit of {max} per dimension",
                groups.groups_x, groups.groups_y
            )));
        }

        let encoder = frame_encoder(&mut self.encoder, &self.device);
        let kernel = &mut self.kernel;
        let device = &self.device;
        let ((), err) = capture(device, wgpu::ErrorFilter::Validation, || {
            kernel.record(device, encoder, &output.view, output.format, params, groups);
        });
        err.map_or(Ok(()), |e| Err(dispatch_error("kernel dispatch", &e)))
    }

    fn target_extent(&self, target: &DisplayTarget) -> Extent {
        target.extent
    }

    fn blit(&mut self, source: &GpuImage, target: &DisplayTarget) -> TraceResult<()> {
        let encoder = frame_encoder(&mut self.encoder, &self.device);
        let blit = &mut self.blit;
        let device = &self.device;
        let ((), err) = capture(device, wgpu::ErrorFilter::Validation, || {
            blit.record(device, encoder, &source.view, &target.view, target.format);
        });
        err.map_or(Ok(()), |e| Err(dispatch_error("composite", &e)))
    }

    fn submit(&mut self) -> TraceResult<()> {
        let Some(encoder) = self.encoder.take() else { return Ok(()) };

        // Pass errors surface when the encoder is finished.
        let queue = &self.queue;
        let ((), err) = capture(&self.device, wgpu::ErrorFilter::Validation, || {
            queue.submit(std::iter::once(encoder.finish()));
        });
        err.map_or(Ok(()), |e| Err(dispatch_error("frame submission", &e)))
    }

    fn discard(&mut self) {
        if self.encoder.take().is_some() {
            log::trace!("discarded recorded frame commands");
        }
    }
}
