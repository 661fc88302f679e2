use std::sync::Arc;

use anyhow::Result;

use crate::camera::Viewpoint;
use crate::error::TraceResult;
use crate::trace::{FrameDriver, FrameReport, FrameStats, TracerConfig};

use super::{DisplayTarget, EnvironmentImage, GpuBackend, GpuImage};

/// Frame driver and wgpu backend in one value.
///
/// Dropping it releases the off-screen buffer.
pub struct GpuTracer {
    backend: GpuBackend,
    driver: FrameDriver<GpuImage, EnvironmentImage>,
}

impl GpuTracer {
    /// Creates the tracer and uploads the configured environment image.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: &TracerConfig) -> Result<Self> {
        let environment = EnvironmentImage::load(device, queue, &config.environment)?;
        log::info!(
            "tracer ready: {:?} buffer, environment {}",
            config.buffer_format,
            environment.extent()
        );

        Ok(Self {
            backend: GpuBackend::new(device, queue),
            driver: FrameDriver::new(config, Arc::new(environment)),
        })
    }

    /// Renders `viewpoint` over the whole of `target`.
    ///
    /// The off-screen buffer follows the target size.
    pub fn render<V>(&mut self, viewpoint: &V, target: &DisplayTarget) -> TraceResult<FrameReport>
    where
        V: Viewpoint + ?Sized,
    {
        self.driver
            .render_frame(&mut self.backend, viewpoint, target, target.extent)
    }

    /// Replaces the environment image from the next frame on.
    pub fn set_environment(&mut self, environment: EnvironmentImage) {
        self.driver.camera_mut().set_environment(Arc::new(environment));
    }

    pub fn stats(&self) -> FrameStats {
        self.driver.stats()
    }

    pub fn backend(&self) -> &GpuBackend {
        &self.backend
    }
}

impl Drop for GpuTracer {
    fn drop(&mut self) {
        self.driver.shutdown(&mut self.backend);
    }
}
