//! Application context.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use cadence_gpu::swapchain::Swapchain;
use cadence_gpu::{CommandPool, FrameSlotRing, GpuContext, GpuContextBuilder, SurfaceContext};
use winit::window::Window;

use crate::config::AppConfig;

/// Application context shared across all app methods.
///
/// Owns the window, GPU context, surface, live swapchain, and the
/// frame slot ring. The swapchain is `None` only while the surface is
/// minimized; the slots live for the whole process.
pub struct AppContext {
    /// The window handle.
    pub window: Arc<Window>,
    /// GPU context with device and queues.
    pub gpu: GpuContext,
    /// Surface context for windowed rendering.
    pub surface: SurfaceContext,
    /// Current swapchain; `None` while suspended.
    pub swapchain: Option<Swapchain>,
    /// Per-frame synchronization and command resources.
    pub slots: FrameSlotRing,
    /// Command pool the slot command buffers come from.
    pub command_pool: CommandPool,
    /// Total frames presented.
    pub frame_count: u64,
    /// Time of last frame (for delta time calculation).
    pub(crate) last_frame_time: Instant,
    pub(crate) vsync: bool,
    pub(crate) vsync_dirty: bool,
    pub(crate) stop_requested: bool,
}

impl AppContext {
    /// Create the GPU context, surface, first swapchain, and slot ring
    /// for a window.
    pub(crate) fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        let (gpu, surface) = GpuContextBuilder::new()
            .app_name(&config.title)
            .validation(config.validation)
            .build(window.as_ref())?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // SAFETY: GPU context and surface are valid
        let swapchain =
            unsafe { surface.create_swapchain(&gpu, width, height, config.vsync, None)? };

        tracing::info!(
            "Swapchain created: {}x{} ({} images)",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len()
        );

        // SAFETY: Device is valid and the graphics family exists
        let command_pool = unsafe {
            CommandPool::new(
                gpu.device(),
                gpu.graphics_queue_family(),
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )?
        };

        // SAFETY: Device and pool are valid
        let slots =
            unsafe { FrameSlotRing::new(gpu.device(), &command_pool, config.frames_in_flight)? };

        Ok(Self {
            window,
            gpu,
            surface,
            swapchain: Some(swapchain),
            slots,
            command_pool,
            frame_count: 0,
            last_frame_time: Instant::now(),
            vsync: config.vsync,
            vsync_dirty: false,
            stop_requested: false,
        })
    }

    /// Extent of the live swapchain, or zero while suspended.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain
            .as_ref()
            .map_or(vk::Extent2D::default(), |chain| chain.extent)
    }

    /// Width of the live swapchain.
    pub fn width(&self) -> u32 {
        self.extent().width
    }

    /// Height of the live swapchain.
    pub fn height(&self) -> u32 {
        self.extent().height
    }

    /// Aspect ratio (width / height) of the live swapchain.
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        extent.width as f32 / extent.height.max(1) as f32
    }

    /// Number of frames that may be in flight at once.
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Whether vsync is currently requested.
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Request a different present mode.
    ///
    /// Takes effect at the next swapchain rebuild, which the framework
    /// schedules for the next frame.
    pub fn set_vsync(&mut self, vsync: bool) {
        if self.vsync != vsync {
            self.vsync = vsync;
            self.vsync_dirty = true;
        }
    }

    /// Exit the run loop after the current frame.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub(crate) fn take_vsync_dirty(&mut self) -> bool {
        std::mem::take(&mut self.vsync_dirty)
    }

    /// Cleanup all resources.
    ///
    /// # Safety
    /// The GPU must be idle and all resources must not be in use.
    pub(crate) unsafe fn cleanup(&mut self) {
        let device = self.gpu.device();

        // SAFETY: Caller guarantees GPU is idle and resources are not in use
        unsafe {
            self.slots.destroy(device);
            self.command_pool.destroy(device);

            if let Some(swapchain) = self.swapchain.take() {
                swapchain.destroy(device, &self.surface.swapchain_loader);
            }
            self.surface.destroy();
        }
    }
}
