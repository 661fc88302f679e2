use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::error::TraceResult;
use crate::time::FrameTime;
use crate::trace::gpu::DisplayTarget;
use crate::trace::Extent;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Drawable size in physical pixels.
    pub fn physical_extent(&self) -> Extent {
        self.window.inner_size().into()
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Acquires the next swapchain image, calls `draw` with it, then presents.
    ///
    /// Nothing is presented when `draw` fails: a recoverable error skips the
    /// frame and a fatal one ends the app. A minimized window skips without
    /// acquiring.
    pub fn render<F, T>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&DisplayTarget) -> TraceResult<T>,
    {
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return AppControl::Continue;
        }

        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        match draw(&frame.target) {
            Ok(_) => {
                self.window.window.pre_present_notify();
                self.gpu.present(frame);
                AppControl::Continue
            }
            Err(err) if err.is_fatal() => {
                log::error!("stopping after fatal frame error: {err}");
                AppControl::Exit
            }
            Err(_) => AppControl::Continue,
        }
    }
}
