//! Per-frame context for recording.

use ash::vk;

/// Context for the frame currently being recorded.
pub struct FrameContext {
    /// Command buffer to record rendering commands into.
    pub command_buffer: vk::CommandBuffer,
    /// Index of the acquired presentable image.
    pub image_index: u32,
    /// The presentable image for this frame.
    pub image: vk::Image,
    /// View over the presentable image, for dynamic-rendering attachments.
    pub image_view: vk::ImageView,
    /// Extent of the presentable image.
    pub extent: vk::Extent2D,
    /// Delta time since the last frame, in seconds.
    pub dt: f32,
    /// Number of frames presented before this one.
    pub frame_number: u64,
}
