//! Application runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use cadence_core::{Extent, FrameScheduler, Tick};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::app::CadenceApp;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::host::FrameHost;

/// Run a `CadenceApp` with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and drives
/// the event loop until the application exits.
pub fn run_app<A: CadenceApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
    };

    if let Err(e) = event_loop.run_app(&mut runner) {
        error!("Event loop error: {e}");
    }

    Ok(())
}

/// Internal application runner implementing winit's `ApplicationHandler`.
struct AppRunner<A: CadenceApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
}

/// Internal application state.
struct AppState<A: CadenceApp> {
    ctx: AppContext,
    app: A,
    scheduler: FrameScheduler,
    // FPS tracking
    min_fps: f64,
    max_fps: f64,
    fps_sum: f64,
    fps_samples: u64,
}

impl<A: CadenceApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // Let the app handle the event first
        if let Some(state) = &mut self.state {
            if state.app.on_event(&mut state.ctx, &event) {
                if state.ctx.stop_requested {
                    self.shutdown(event_loop);
                }
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    match state.render_frame() {
                        // A fatal error means the device may be corrupt;
                        // stop before any further GPU call
                        Err(e) => {
                            error!("Render error: {e:#}");
                            self.shutdown(event_loop);
                        }
                        Ok(_) => {
                            if state.ctx.stop_requested {
                                self.shutdown(event_loop);
                            } else {
                                state.ctx.window.request_redraw();
                            }
                        }
                    }
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.handle_resize(size) {
                        error!("Resize error: {e:#}");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }
}

impl<A: CadenceApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let mut ctx = AppContext::new(window, &self.config)?;

        let negotiated = ctx.extent();
        let scheduler = FrameScheduler::new(
            ctx.frames_in_flight(),
            Extent::new(negotiated.width, negotiated.height),
        );

        let app = A::init(&mut ctx)?;

        Ok(AppState {
            ctx,
            app,
            scheduler,
            min_fps: f64::MAX,
            max_fps: 0.0,
            fps_sum: 0.0,
            fps_samples: 0,
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
        event_loop.exit();
    }
}

impl<A: CadenceApp> AppState<A> {
    fn render_frame(&mut self) -> anyhow::Result<Tick> {
        let now = Instant::now();
        let dt = now.duration_since(self.ctx.last_frame_time).as_secs_f32();
        self.ctx.last_frame_time = now;

        if dt > 0.0 {
            let fps = f64::from(1.0 / dt);
            self.min_fps = self.min_fps.min(fps);
            self.max_fps = self.max_fps.max(fps);
            self.fps_sum += fps;
            self.fps_samples += 1;
        }

        self.app.update(&self.ctx, dt);

        // A present-mode change needs a fresh swapchain
        if self.ctx.take_vsync_dirty() {
            self.scheduler.request_recreate();
        }

        let tick = {
            let mut host = FrameHost {
                ctx: &mut self.ctx,
                app: &mut self.app,
                dt,
            };
            self.scheduler.tick(&mut host)?
        };

        if tick == Tick::Presented {
            self.ctx.frame_count += 1;
        }

        Ok(tick)
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> anyhow::Result<()> {
        self.scheduler
            .notify_resized(Extent::new(size.width, size.height));

        if size.width > 0 && size.height > 0 {
            self.app.on_resize(&mut self.ctx, size.width, size.height)?;
            info!("Resized to {}x{}", size.width, size.height);
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.fps_samples > 0 {
            let avg_fps = self.fps_sum / self.fps_samples as f64;
            info!("FPS Statistics:");
            info!("  Min: {:.1}", self.min_fps);
            info!("  Max: {:.1}", self.max_fps);
            info!("  Avg: {:.1}", avg_fps);
            info!("  Total frames: {}", self.ctx.frame_count);
        }

        info!("Starting cleanup...");

        // Nothing may still reference a resource we are about to free
        if let Err(e) = self.ctx.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        self.app.cleanup(&mut self.ctx);

        // SAFETY: The device is idle
        unsafe {
            self.ctx.cleanup();
        }

        info!("Cleanup complete");
    }
}
