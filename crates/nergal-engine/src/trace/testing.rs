//! Recording backend for GPU-free tests.

use crate::camera::CameraFrameParameters;
use crate::error::{TraceError, TraceResult};

use super::{BufferDesc, DispatchExtent, Extent, TraceBackend};

/// Image stand-in: an id plus the extent it was allocated with.
#[derive(Debug, PartialEq, Eq)]
pub struct MockImage {
    pub id: u32,
    pub extent: Extent,
}

/// Something the pipeline asked the backend to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Allocate(u32, Extent),
    Release(u32),
    Dispatch(u32, DispatchExtent),
    Blit(u32),
    Submit,
    Discard,
}

/// Backend that records calls instead of touching a device.
///
/// Recorded dispatches and blits stay pending until `submit`; `discard`
/// forgets them, like a dropped command encoder.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<Event>,
    pub fail_allocation: bool,
    pub fail_dispatch: bool,
    pub fail_submit: bool,

    next_id: u32,
    live: Vec<u32>,
    pending: Vec<Event>,
    pub submitted: Vec<Event>,
}

impl RecordingBackend {
    pub fn live_images(&self) -> usize {
        self.live.len()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn allocations(&self) -> usize {
        self.count(|e| matches!(e, Event::Allocate(..)))
    }

    pub fn releases(&self) -> usize {
        self.count(|e| matches!(e, Event::Release(_)))
    }

    pub fn submitted_blits(&self) -> usize {
        self.submitted.iter().filter(|e| matches!(e, Event::Blit(_))).count()
    }

    pub fn submitted_dispatches(&self) -> Vec<DispatchExtent> {
        self.submitted
            .iter()
            .filter_map(|e| match e {
                Event::Dispatch(_, groups) => Some(*groups),
                _ => None,
            })
            .collect()
    }
}

impl TraceBackend for RecordingBackend {
    type Image = MockImage;
    type Environment = ();
    type Target = Extent;

    fn allocate_image(&mut self, desc: &BufferDesc) -> TraceResult<MockImage> {
        if self.fail_allocation {
            return Err(TraceError::ResourceExhausted {
                extent: desc.extent,
                format: desc.format,
                reason: "mock device is out of memory".to_string(),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live.push(id);
        self.events.push(Event::Allocate(id, desc.extent));
        Ok(MockImage { id, extent: desc.extent })
    }

    fn release_image(&mut self, image: MockImage) {
        self.live.retain(|&id| id != image.id);
        self.events.push(Event::Release(image.id));
    }

    fn dispatch(
        &mut self,
        output: &MockImage,
        _params: &CameraFrameParameters<()>,
        groups: DispatchExtent,
    ) -> TraceResult<()> {
        if self.fail_dispatch {
            return Err(TraceError::DispatchFailed("mock device lost".to_string()));
        }
        let event = Event::Dispatch(output.id, groups);
        self.events.push(event.clone());
        self.pending.push(event);
        Ok(())
    }

    fn target_extent(&self, target: &Extent) -> Extent {
        *target
    }

    fn blit(&mut self, source: &MockImage, _target: &Extent) -> TraceResult<()> {
        let event = Event::Blit(source.id);
        self.events.push(event.clone());
        self.pending.push(event);
        Ok(())
    }

    fn submit(&mut self) -> TraceResult<()> {
        self.events.push(Event::Submit);
        if self.fail_submit {
            self.pending.clear();
            return Err(TraceError::DispatchFailed("mock command validation failed".to_string()));
        }
        self.submitted.append(&mut self.pending);
        Ok(())
    }

    fn discard(&mut self) {
        self.events.push(Event::Discard);
        self.pending.clear();
    }
}
