//! Interactive viewer: orbits a camera around the origin and shows the
//! kernel's output every frame.
//!
//! `NERGAL_ENVIRONMENT=<path>` loads an equirectangular background image;
//! `NERGAL_HALF_FLOAT=1` renders into an rgba16float buffer. Escape quits.

use std::path::PathBuf;

use anyhow::Result;
use glam::Vec3;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use nergal_engine::camera::Camera;
use nergal_engine::core::{App, AppControl, FrameCtx};
use nergal_engine::device::GpuInit;
use nergal_engine::logging::{init_logging, LoggingConfig};
use nergal_engine::trace::gpu::GpuTracer;
use nergal_engine::trace::{BufferFormat, EnvironmentSource, TracerConfig};
use nergal_engine::window::{Runtime, RuntimeConfig};

const ORBIT_RADIUS: f32 = 6.0;
const ORBIT_HEIGHT: f32 = 1.5;
/// Radians per second.
const ORBIT_SPEED: f32 = 0.25;
const TITLE_EVERY: u64 = 120;

struct Viewer {
    config: TracerConfig,
    tracer: Option<GpuTracer>,
    camera: Camera,
}

impl Viewer {
    fn new(config: TracerConfig) -> Self {
        Self {
            config,
            tracer: None,
            camera: Camera::default(),
        }
    }

    fn orbit(&mut self, elapsed: f32, aspect: f32) {
        let angle = elapsed * ORBIT_SPEED;
        let eye = Vec3::new(angle.sin() * ORBIT_RADIUS, ORBIT_HEIGHT, angle.cos() * ORBIT_RADIUS);

        let mut projection = self.camera.projection;
        projection.set_aspect(aspect);
        self.camera = Camera::look_at(eye, Vec3::ZERO, Vec3::Y, projection);
    }
}

impl App for Viewer {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.tracer.is_none() {
            match GpuTracer::new(ctx.gpu.device(), ctx.gpu.queue(), &self.config) {
                Ok(tracer) => self.tracer = Some(tracer),
                Err(e) => {
                    log::error!("failed to set up the tracer: {e:#}");
                    return AppControl::Exit;
                }
            }
        }

        let extent = ctx.window.physical_extent();
        if extent.is_valid() {
            self.orbit(ctx.time.elapsed, extent.aspect());
        }

        let Some(tracer) = self.tracer.as_mut() else { return AppControl::Exit };
        let camera = &self.camera;
        let control = ctx.render(|target| tracer.render(camera, target));

        if ctx.time.frame_index % TITLE_EVERY == 0 {
            let stats = tracer.stats();
            ctx.runtime.set_title(format!(
                "nergal  {extent}  {:.0} fps  {} frames, {} skipped, {} buffers",
                1.0 / ctx.time.dt,
                stats.frames,
                stats.aborted,
                stats.allocations
            ));
        }

        control
    }

    fn on_exit(&mut self) {
        if let Some(tracer) = self.tracer.take() {
            let stats = tracer.stats();
            log::info!(
                "rendered {} frames ({} skipped), {} buffer allocations",
                stats.frames,
                stats.aborted,
                stats.allocations
            );
        }
    }
}

fn tracer_config() -> TracerConfig {
    let environment = std::env::var_os("NERGAL_ENVIRONMENT")
        .map(|p| EnvironmentSource::Path(PathBuf::from(p)))
        .unwrap_or_default();

    let buffer_format = match std::env::var("NERGAL_HALF_FLOAT").as_deref() {
        Ok("1") | Ok("true") => BufferFormat::Rgba16Float,
        _ => BufferFormat::Rgba32Float,
    };

    TracerConfig {
        buffer_format,
        environment,
        ..Default::default()
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = tracer_config();
    log::info!("environment: {:?}", config.environment);

    Runtime::run(
        RuntimeConfig {
            title: "nergal".to_string(),
            ..Default::default()
        },
        GpuInit::default(),
        Viewer::new(config),
    )
}
