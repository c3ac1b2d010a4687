//! Vulkan realization of the frame backend.

use anyhow::Context as _;
use ash::vk;
use cadence_core::{AcquireOutcome, ChainStatus, Extent, FrameBackend};
use cadence_gpu::barrier::{transition_to_color_attachment, transition_to_present};
use cadence_gpu::command::{begin_command_buffer, end_command_buffer, submit_frame};

use crate::app::CadenceApp;
use crate::context::AppContext;
use crate::frame::FrameContext;

/// Wires the app context and the client app into the generic scheduler
/// for the duration of one tick.
pub(crate) struct FrameHost<'a, A: CadenceApp> {
    pub ctx: &'a mut AppContext,
    pub app: &'a mut A,
    pub dt: f32,
}

impl<A: CadenceApp> FrameBackend for FrameHost<'_, A> {
    type Error = anyhow::Error;

    fn wait_for_slot(&mut self, slot: usize) -> anyhow::Result<()> {
        // SAFETY: Device and slot primitives are valid for the ring's lifetime
        unsafe {
            self.ctx
                .slots
                .slot(slot)
                .wait(self.ctx.gpu.device(), u64::MAX)?;
        }
        Ok(())
    }

    fn acquire(&mut self, slot: usize) -> anyhow::Result<AcquireOutcome> {
        let chain = self
            .ctx
            .swapchain
            .as_ref()
            .context("acquire without a live swapchain")?;

        // SAFETY: Swapchain and semaphore are valid
        let outcome = unsafe {
            chain.acquire_next_image(
                &self.ctx.surface.swapchain_loader,
                self.ctx.slots.slot(slot).acquire,
                u64::MAX,
            )?
        };
        Ok(outcome)
    }

    fn prepare_slot(&mut self, slot: usize) -> anyhow::Result<()> {
        let device = self.ctx.gpu.device();
        let slot = self.ctx.slots.slot(slot);

        // SAFETY: The fence was observed signaled and the command buffer
        // is no longer referenced by unretired work
        unsafe {
            slot.reset(device)?;
            device.reset_command_buffer(
                slot.command_buffer,
                vk::CommandBufferResetFlags::empty(),
            )?;
        }
        Ok(())
    }

    fn record_and_submit(&mut self, slot: usize, image_index: u32) -> anyhow::Result<()> {
        let chain = self
            .ctx
            .swapchain
            .as_ref()
            .context("record without a live swapchain")?;
        let device = self.ctx.gpu.device();
        let slot = self.ctx.slots.slot(slot);
        let image = chain.images[image_index as usize];

        let mut frame = FrameContext {
            command_buffer: slot.command_buffer,
            image_index,
            image,
            image_view: chain.image_views[image_index as usize],
            extent: chain.extent,
            dt: self.dt,
            frame_number: self.ctx.frame_count,
        };

        // SAFETY: The command buffer was reset in prepare_slot and the
        // image belongs to the live swapchain
        unsafe {
            begin_command_buffer(
                device,
                slot.command_buffer,
                vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            )?;
            transition_to_color_attachment(device, slot.command_buffer, image);
        }

        self.app.record(self.ctx, &mut frame)?;

        // SAFETY: Recording is still open; the submit waits on the
        // acquire semaphore and signals the present semaphore and the
        // slot's completion fence
        unsafe {
            transition_to_present(device, slot.command_buffer, image);
            end_command_buffer(device, slot.command_buffer)?;
            submit_frame(
                device,
                self.ctx.gpu.graphics_queue(),
                slot.command_buffer,
                slot.acquire,
                slot.present,
                slot.in_flight,
            )?;
        }

        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> anyhow::Result<ChainStatus> {
        let chain = self
            .ctx
            .swapchain
            .as_ref()
            .context("present without a live swapchain")?;

        // SAFETY: Swapchain, queue, and semaphore are valid
        let status = unsafe {
            chain.present(
                &self.ctx.surface.swapchain_loader,
                self.ctx.gpu.present_queue(),
                image_index,
                &[self.ctx.slots.slot(slot).present],
            )?
        };
        Ok(status)
    }

    fn wait_idle(&mut self) -> anyhow::Result<()> {
        self.ctx.gpu.wait_idle()?;
        Ok(())
    }

    fn destroy_chain(&mut self) -> anyhow::Result<()> {
        if let Some(chain) = self.ctx.swapchain.take() {
            // SAFETY: The scheduler waited for device idle before this call
            unsafe {
                chain.destroy(self.ctx.gpu.device(), &self.ctx.surface.swapchain_loader);
            }
        }
        Ok(())
    }

    fn create_chain(&mut self) -> anyhow::Result<Extent> {
        let size = self.ctx.window.inner_size();

        // SAFETY: GPU context and surface are valid
        let chain = unsafe {
            self.ctx.surface.create_swapchain(
                &self.ctx.gpu,
                size.width.max(1),
                size.height.max(1),
                self.ctx.vsync,
                None,
            )?
        };
        let extent = Extent::new(chain.extent.width, chain.extent.height);
        self.ctx.swapchain = Some(chain);
        Ok(extent)
    }

    fn surface_extent(&mut self) -> anyhow::Result<Extent> {
        let size = self.ctx.window.inner_size();
        let (width, height) = self
            .ctx
            .surface
            .current_extent(&self.ctx.gpu, size.width, size.height)?;
        Ok(Extent::new(width, height))
    }
}
