//! Presentable-image layout transitions.
//!
//! The swapchain hands out images in an undefined layout and the
//! compositor wants them back in `PRESENT_SRC_KHR`, so every frame is
//! bracketed by two synchronization2 barriers. Client recording happens
//! between them with the image in `COLOR_ATTACHMENT_OPTIMAL`.

use ash::vk;

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Transition a presentable image to the color-attachment layout.
///
/// Records before the client callback; the previous contents are
/// discarded (`UNDEFINED` source layout).
///
/// # Safety
/// The command buffer must be in the recording state and the image must
/// belong to the live swapchain.
pub unsafe fn transition_to_color_attachment(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
) {
    let barrier = vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::TOP_OF_PIPE)
        .src_access_mask(vk::AccessFlags2::NONE)
        .dst_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .image(image)
        .subresource_range(color_subresource_range());

    let dependency_info =
        vk::DependencyInfo::default().image_memory_barriers(std::slice::from_ref(&barrier));

    unsafe {
        device.cmd_pipeline_barrier2(cmd, &dependency_info);
    }
}

/// Transition a presentable image to the presentation layout.
///
/// Records after the client callback, making the color writes visible to
/// the compositor.
///
/// # Safety
/// The command buffer must be in the recording state and the image must
/// belong to the live swapchain.
pub unsafe fn transition_to_present(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
) {
    let barrier = vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE)
        .dst_access_mask(vk::AccessFlags2::NONE)
        .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .image(image)
        .subresource_range(color_subresource_range());

    let dependency_info =
        vk::DependencyInfo::default().image_memory_barriers(std::slice::from_ref(&barrier));

    unsafe {
        device.cmd_pipeline_barrier2(cmd, &dependency_info);
    }
}
