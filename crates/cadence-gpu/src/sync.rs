//! Synchronization primitives.

use crate::command::CommandPool;
use crate::error::{GpuError, Result};
use ash::vk;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = unsafe { device.create_semaphore(&create_info, None)? };
    Ok(semaphore)
}

/// Create a fence, optionally in the signaled state.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = unsafe { device.create_fence(&create_info, None)? };
    Ok(fence)
}

/// Wait for a fence to be signaled.
///
/// A timeout means the GPU stopped retiring work; that is device loss,
/// not a condition to retry.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout_ns: u64,
) -> Result<()> {
    unsafe {
        device
            .wait_for_fences(&[fence], true, timeout_ns)
            .map_err(|e| match e {
                vk::Result::TIMEOUT => {
                    GpuError::DeviceLost("timed out waiting for a frame fence".to_string())
                }
                other => GpuError::from(other),
            })?;
    }
    Ok(())
}

/// Reset a fence to the unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    unsafe {
        device.reset_fences(&[fence])?;
    }
    Ok(())
}

/// Synchronization and recording resources for one in-flight frame.
pub struct FrameSlot {
    /// Semaphore the submit waits on; armed by the acquire call.
    pub acquire: vk::Semaphore,
    /// Semaphore presentation waits on; signaled when rendering finishes.
    pub present: vk::Semaphore,
    /// Fence signaled when this slot's submission has retired.
    ///
    /// Created signaled so the slot's first use never blocks on
    /// nonexistent prior work.
    pub in_flight: vk::Fence,
    /// Command buffer reused across this slot's submissions.
    ///
    /// Only re-recorded after `in_flight` is observed signaled.
    pub command_buffer: vk::CommandBuffer,
}

impl FrameSlot {
    /// Create one slot around an allocated command buffer.
    ///
    /// # Safety
    /// The device must be valid.
    unsafe fn new(device: &ash::Device, command_buffer: vk::CommandBuffer) -> Result<Self> {
        unsafe {
            Ok(Self {
                acquire: create_semaphore(device)?,
                present: create_semaphore(device)?,
                in_flight: create_fence(device, true)?,
                command_buffer,
            })
        }
    }

    /// Block until this slot's previous submission has retired.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device, timeout_ns: u64) -> Result<()> {
        unsafe { wait_for_fence(device, self.in_flight, timeout_ns) }
    }

    /// Reset the fence so the next submission can signal it.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        unsafe { reset_fence(device, self.in_flight) }
    }

    /// Destroy this slot's synchronization primitives.
    ///
    /// The command buffer is returned to its pool when the pool is
    /// destroyed.
    ///
    /// # Safety
    /// The device must be valid and the slot must not be in use.
    unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.acquire, None);
            device.destroy_semaphore(self.present, None);
            device.destroy_fence(self.in_flight, None);
        }
    }
}

/// Fixed ring of frame slots, allocated once for the process lifetime.
///
/// The slot count bounds how many frames of CPU recording may run ahead
/// of GPU completion; it is unrelated to how many images the swapchain
/// holds.
pub struct FrameSlotRing {
    slots: Vec<FrameSlot>,
}

impl FrameSlotRing {
    /// Allocate `count` slots with command buffers from `pool`.
    ///
    /// Construction is all-or-nothing: on failure every slot created so
    /// far is destroyed before the error propagates, so no partial ring
    /// ever exists.
    ///
    /// # Safety
    /// The device and pool must be valid.
    pub unsafe fn new(device: &ash::Device, pool: &CommandPool, count: usize) -> Result<Self> {
        assert!(count >= 2, "a frame slot ring needs at least two slots");

        let command_buffers = unsafe {
            pool.allocate_command_buffers(device, vk::CommandBufferLevel::PRIMARY, count as u32)?
        };

        let mut slots = Vec::with_capacity(count);
        for command_buffer in command_buffers {
            match unsafe { FrameSlot::new(device, command_buffer) } {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    for slot in &slots {
                        unsafe { slot.destroy(device) };
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self { slots })
    }

    /// The slot a cursor value selects; the cursor is taken mod the ring
    /// size.
    pub fn slot(&self, cursor: usize) -> &FrameSlot {
        &self.slots[cursor % self.slots.len()]
    }

    /// Number of slots in the ring.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Rings are never empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Destroy all slots.
    ///
    /// # Safety
    /// The device must be valid and no slot may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            for slot in &self.slots {
                slot.destroy(device);
            }
        }
    }
}
