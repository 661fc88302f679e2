use crate::error::{TraceError, TraceResult};

use super::{BufferFormat, Extent, TraceBackend};

/// Identity of one off-screen buffer allocation.
///
/// A new handle is minted for every allocation, so two frames seeing the same
/// handle used the very same image.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Everything that makes two off-screen buffers interchangeable.
///
/// Reuse compares the full descriptor, not only the extent, so a format
/// change also forces a reallocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub extent: Extent,
    pub format: BufferFormat,
    /// The kernel may store to any texel in any order.
    pub random_write: bool,
}

impl BufferDesc {
    /// Descriptor of a kernel output buffer.
    pub fn storage(extent: Extent, format: BufferFormat) -> Self {
        Self {
            extent,
            format,
            random_write: true,
        }
    }

    pub fn byte_size(&self) -> u64 {
        self.extent.pixel_count() * self.format.bytes_per_pixel()
    }
}

/// A live off-screen buffer.
#[derive(Debug)]
pub struct OffscreenBuffer<I> {
    handle: BufferHandle,
    desc: BufferDesc,
    image: I,
}

impl<I> OffscreenBuffer<I> {
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    pub fn extent(&self) -> Extent {
        self.desc.extent
    }

    pub fn image(&self) -> &I {
        &self.image
    }
}

/// Allocation state of the managed buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferState {
    Unallocated,
    Allocated(Extent),
}

/// Owns the single off-screen buffer and keeps it sized to the display.
///
/// State machine: `Unallocated -> Allocated(w, h)` on the first
/// [`ensure_buffer`](Self::ensure_buffer), `Allocated(w, h) -> Allocated(w', h')`
/// by releasing the old image before allocating the new one, and back to
/// `Unallocated` only through [`release`](Self::release) at teardown (or a
/// failed reallocation).
#[derive(Debug)]
pub struct BufferManager<I> {
    format: BufferFormat,
    max_bytes: Option<u64>,

    current: Option<OffscreenBuffer<I>>,
    next_handle: u64,

    allocations: u64,
    releases: u64,
}

impl<I> BufferManager<I> {
    pub fn new(format: BufferFormat) -> Self {
        Self {
            format,
            max_bytes: None,
            current: None,
            next_handle: 0,
            allocations: 0,
            releases: 0,
        }
    }

    /// Caps the buffer size; larger requests fail with `ResourceExhausted`.
    pub fn with_budget(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn format(&self) -> BufferFormat {
        self.format
    }

    /// Changes the format of future allocations.
    ///
    /// The live buffer is replaced by the next `ensure_buffer`.
    pub fn set_format(&mut self, format: BufferFormat) {
        self.format = format;
    }

    pub fn state(&self) -> BufferState {
        match &self.current {
            Some(buffer) => BufferState::Allocated(buffer.extent()),
            None => BufferState::Unallocated,
        }
    }

    pub fn current(&self) -> Option<&OffscreenBuffer<I>> {
        self.current.as_ref()
    }

    /// Total allocations performed so far.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Total releases performed so far.
    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Returns a write-enabled buffer of exactly `extent`.
    ///
    /// An existing buffer with the same descriptor is returned as is. Otherwise
    /// the existing buffer is released first and a new one allocated. If that
    /// allocation fails (device or budget) the manager is left `Unallocated`.
    pub fn ensure_buffer<B>(&mut self, backend: &mut B, extent: Extent) -> TraceResult<&OffscreenBuffer<I>>
    where
        B: TraceBackend<Image = I>,
    {
        let desc = BufferDesc::storage(extent.validated()?, self.format);

        let buffer = match self.current.take() {
            Some(buffer) if buffer.desc == desc => buffer,
            stale => {
                if let Some(old) = stale {
                    log::info!("off-screen buffer {} -> {}; reallocating", old.extent(), extent);
                    self.release_buffer(backend, old);
                }
                self.check_budget(&desc)?;
                self.allocate(backend, desc)?
            }
        };

        let buffer: &OffscreenBuffer<I> = self.current.insert(buffer);
        Ok(buffer)
    }

    /// Releases the live buffer, if any.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: TraceBackend<Image = I>,
    {
        if let Some(buffer) = self.current.take() {
            self.release_buffer(backend, buffer);
        }
    }

    fn check_budget(&self, desc: &BufferDesc) -> TraceResult<()> {
        match self.max_bytes {
            Some(max) if desc.byte_size() > max => Err(TraceError::ResourceExhausted {
                extent: desc.extent,
                format: desc.format,
                reason: format!("{} bytes exceeds the {max} byte budget", desc.byte_size()),
            }),
            _ => Ok(()),
        }
    }

    fn allocate<B>(&mut self, backend: &mut B, desc: BufferDesc) -> TraceResult<OffscreenBuffer<I>>
    where
        B: TraceBackend<Image = I>,
    {
        let image = backend.allocate_image(&desc).inspect_err(|e| {
            log::error!("off-screen buffer allocation failed: {e}");
        })?;

        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        self.allocations += 1;

        log::debug!(
            "allocated off-screen buffer #{} {} {:?} ({} bytes)",
            handle.0,
            desc.extent,
            desc.format,
            desc.byte_size()
        );

        Ok(OffscreenBuffer { handle, desc, image })
    }

    fn release_buffer<B>(&mut self, backend: &mut B, buffer: OffscreenBuffer<I>)
    where
        B: TraceBackend<Image = I>,
    {
        log::debug!("releasing off-screen buffer #{} {}", buffer.handle.0, buffer.extent());
        backend.release_image(buffer.image);
        self.releases += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::testing::{Event, RecordingBackend};

    fn manager() -> BufferManager<crate::trace::testing::MockImage> {
        BufferManager::new(BufferFormat::Rgba32Float)
    }

    // ── ensure_buffer ─────────────────────────────────────────────────────

    #[test]
    fn first_call_allocates() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        assert_eq!(buffers.state(), BufferState::Unallocated);

        let buffer = buffers.ensure_buffer(&mut backend, Extent::new(640, 480)).unwrap();
        assert_eq!(buffer.extent(), Extent::new(640, 480));
        assert!(buffer.desc().random_write);
        assert_eq!(buffers.state(), BufferState::Allocated(Extent::new(640, 480)));
        assert_eq!(backend.live_images(), 1);
    }

    #[test]
    fn same_extent_returns_same_handle() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        let a = buffers.ensure_buffer(&mut backend, Extent::new(320, 200)).unwrap().handle();
        let b = buffers.ensure_buffer(&mut backend, Extent::new(320, 200)).unwrap().handle();
        assert_eq!(a, b);
        assert_eq!(buffers.allocations(), 1);
        assert_eq!(buffers.releases(), 0);
    }

    #[test]
    fn resize_releases_before_allocating() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        buffers.ensure_buffer(&mut backend, Extent::new(320, 200)).unwrap();
        buffers.ensure_buffer(&mut backend, Extent::new(640, 400)).unwrap();

        assert_eq!(
            backend.events,
            vec![
                Event::Allocate(0, Extent::new(320, 200)),
                Event::Release(0),
                Event::Allocate(1, Extent::new(640, 400)),
            ]
        );
        assert_eq!(backend.live_images(), 1);
    }

    #[test]
    fn format_change_reallocates() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        let a = buffers.ensure_buffer(&mut backend, Extent::new(64, 64)).unwrap().handle();
        buffers.set_format(BufferFormat::Rgba16Float);
        let b = buffers.ensure_buffer(&mut backend, Extent::new(64, 64)).unwrap();
        assert_ne!(a, b.handle());
        assert_eq!(b.desc().format, BufferFormat::Rgba16Float);
        assert_eq!(buffers.releases(), 1);
    }

    #[test]
    fn zero_extent_is_rejected_without_touching_the_device() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        let err = buffers.ensure_buffer(&mut backend, Extent::new(0, 480)).unwrap_err();
        assert_eq!(err, TraceError::InvalidExtent(Extent::new(0, 480)));
        assert!(backend.events.is_empty());
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn allocation_failure_is_resource_exhausted() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        buffers.ensure_buffer(&mut backend, Extent::new(64, 64)).unwrap();

        backend.fail_allocation = true;
        let err = buffers.ensure_buffer(&mut backend, Extent::new(128, 128)).unwrap_err();
        assert!(matches!(err, TraceError::ResourceExhausted { .. }));

        // The old buffer was released and nothing replaced it: no orphan.
        assert_eq!(buffers.state(), BufferState::Unallocated);
        assert_eq!(backend.live_images(), 0);
    }

    #[test]
    fn budget_rejects_oversized_buffer() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager().with_budget(Some(64 * 64 * 16));
        buffers.ensure_buffer(&mut backend, Extent::new(64, 64)).unwrap();

        let err = buffers.ensure_buffer(&mut backend, Extent::new(65, 64)).unwrap_err();
        assert!(matches!(err, TraceError::ResourceExhausted { .. }));
        assert_eq!(buffers.allocations(), 1);
        assert_eq!(buffers.state(), BufferState::Unallocated);
        assert_eq!(backend.live_images(), 0);
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn release_returns_to_unallocated() {
        let mut backend = RecordingBackend::default();
        let mut buffers = manager();
        buffers.ensure_buffer(&mut backend, Extent::new(64, 64)).unwrap();
        buffers.release(&mut backend);
        assert_eq!(buffers.state(), BufferState::Unallocated);
        assert_eq!(backend.live_images(), 0);

        // Releasing twice is a no-op.
        buffers.release(&mut backend);
        assert_eq!(buffers.releases(), 1);
    }
}
