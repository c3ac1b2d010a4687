//! `CadenceApp` trait definition.

use crate::context::AppContext;
use crate::frame::FrameContext;
use winit::event::WindowEvent;

/// Trait for Cadence applications.
///
/// Implement this trait to create an application on the Cadence engine.
/// The framework handles window creation, GPU initialization, swapchain
/// lifecycle, frame synchronization, and the event loop.
pub trait CadenceApp: Sized {
    /// Initialize the application.
    ///
    /// Called once, after the GPU context, window, and first swapchain
    /// have been created.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Update application state.
    ///
    /// Called every frame before recording. `dt` is the time in seconds
    /// since the previous update.
    fn update(&mut self, ctx: &AppContext, dt: f32);

    /// Record one frame's commands.
    ///
    /// The framework acquires the presentable image, brackets this call
    /// with the layout transitions the image needs, and submits and
    /// presents the result. Record your drawing into
    /// `frame.command_buffer`; the image is in the color-attachment
    /// layout for the duration of the call.
    ///
    /// An error here is fatal: the run loop exits.
    fn record(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()>;

    /// Handle window resize.
    ///
    /// The framework rebuilds the swapchain on its own; override this to
    /// rebuild your own size-dependent resources. Not called while the
    /// window is minimized.
    ///
    /// Default implementation does nothing.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle window events.
    ///
    /// Called for each window event before the framework processes it.
    /// Return `true` if the event was handled and should not be
    /// processed further.
    ///
    /// Default implementation does nothing and returns `false`.
    #[allow(unused_variables)]
    fn on_event(&mut self, ctx: &mut AppContext, event: &WindowEvent) -> bool {
        false
    }

    /// Cleanup resources before shutdown.
    ///
    /// The GPU is idle when this is called, so it is safe to destroy GPU
    /// resources.
    ///
    /// Default implementation does nothing.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
