use crate::error::TraceError;
use crate::trace::BufferDesc;

/// Runs `f` inside a wgpu error scope and returns what the scope caught.
///
/// Errors raised by the device inside the scope are handed back here instead
/// of reaching the uncaptured-error handler, which panics by default.
pub(super) fn capture<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    f: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    let scope = device.push_error_scope(filter);
    let value = f();
    let error = pollster::block_on(scope.pop());
    (value, error)
}

/// Device error while creating the off-screen buffer.
pub(super) fn allocation_error(desc: &BufferDesc, err: &wgpu::Error) -> TraceError {
    log::error!("device rejected {} buffer allocation: {err}", desc.extent);
    TraceError::ResourceExhausted {
        extent: desc.extent,
        format: desc.format,
        reason: format!("device reported: {err}"),
    }
}

/// Device error while recording or submitting frame work.
pub(super) fn dispatch_error(stage: &str, err: &wgpu::Error) -> TraceError {
    TraceError::DispatchFailed(format!("{stage}: {err}"))
}
