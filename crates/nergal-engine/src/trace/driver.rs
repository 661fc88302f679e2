use std::sync::Arc;

use crate::camera::{CameraProvider, Viewpoint};
use crate::error::TraceResult;

use super::{
    composite, dispatch, BufferHandle, BufferManager, DispatchExtent, Extent, TraceBackend,
    TracerConfig,
};

/// Outcome of one successfully composited frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub handle: BufferHandle,
    pub resolution: Extent,
    pub groups: DispatchExtent,
    /// The off-screen buffer was (re)allocated during this frame.
    pub reallocated: bool,
}

/// Running counters of the frame driver.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames composited and submitted.
    pub frames: u64,
    /// Frames abandoned on an error.
    pub aborted: u64,
    pub allocations: u64,
    pub releases: u64,
}

/// Runs the capture → ensure → dispatch → composite sequence once per frame.
///
/// Taking `&mut self` per frame means a frame cannot start while another is
/// being recorded. Everything a frame records is submitted together at the
/// end, behind the previous frame's submission on the same queue.
///
/// `I` and `E` are the backend's image and environment types.
#[derive(Debug)]
pub struct FrameDriver<I, E> {
    buffers: BufferManager<I>,
    camera: CameraProvider<E>,
    stats: FrameStats,
}

impl<I, E> FrameDriver<I, E> {
    pub fn new(config: &TracerConfig, environment: Arc<E>) -> Self {
        Self {
            buffers: BufferManager::new(config.buffer_format).with_budget(config.max_buffer_bytes),
            camera: CameraProvider::new(environment),
            stats: FrameStats::default(),
        }
    }

    pub fn buffers(&self) -> &BufferManager<I> {
        &self.buffers
    }

    pub fn camera(&self) -> &CameraProvider<E> {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraProvider<E> {
        &mut self.camera
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            allocations: self.buffers.allocations(),
            releases: self.buffers.releases(),
            ..self.stats
        }
    }

    /// Renders one frame of `viewpoint` at `resolution` onto `target`.
    ///
    /// On success the recorded work is submitted. On any error, including one
    /// reported by the submit itself, the recorded work is discarded, so
    /// nothing reaches the target for this frame, and the error is returned
    /// unchanged.
    pub fn render_frame<B, V>(
        &mut self,
        backend: &mut B,
        viewpoint: &V,
        target: &B::Target,
        resolution: Extent,
    ) -> TraceResult<FrameReport>
    where
        B: TraceBackend<Image = I, Environment = E>,
        V: Viewpoint + ?Sized,
    {
        let frame = self
            .record_frame(backend, viewpoint, target, resolution)
            .and_then(|report| backend.submit().map(|()| report));

        match frame {
            Ok(report) => {
                self.stats.frames += 1;
                if report.reallocated {
                    log::debug!("frame {} rendered into new buffer at {}", self.stats.frames, resolution);
                }
                Ok(report)
            }
            Err(err) => {
                backend.discard();
                self.stats.aborted += 1;
                if err.is_fatal() {
                    log::error!("frame aborted: {err}");
                } else {
                    log::warn!("frame skipped: {err}");
                }
                Err(err)
            }
        }
    }

    /// Releases the off-screen buffer. Call before dropping the backend.
    pub fn shutdown<B>(&mut self, backend: &mut B)
    where
        B: TraceBackend<Image = I>,
    {
        self.buffers.release(backend);
        log::debug!(
            "frame driver shut down after {} frames ({} aborted)",
            self.stats.frames,
            self.stats.aborted
        );
    }

    fn record_frame<B, V>(
        &mut self,
        backend: &mut B,
        viewpoint: &V,
        target: &B::Target,
        resolution: Extent,
    ) -> TraceResult<FrameReport>
    where
        B: TraceBackend<Image = I, Environment = E>,
        V: Viewpoint + ?Sized,
    {
        let params = self.camera.capture_frame_parameters(viewpoint)?;

        let allocations_before = self.buffers.allocations();
        let buffer = self.buffers.ensure_buffer(backend, resolution)?;

        let groups = dispatch(backend, buffer, &params, resolution)?;
        composite(backend, buffer, target)?;

        let handle = buffer.handle();
        Ok(FrameReport {
            handle,
            resolution,
            groups,
            reallocated: self.buffers.allocations() != allocations_before,
        })
    }
}
