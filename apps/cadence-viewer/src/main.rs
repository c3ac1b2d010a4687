//! Cadence demo viewer.
//!
//! Animates a clear color through dynamic rendering, exercising the full
//! acquire/record/submit/present loop with no pipeline state.
//!
//! ## Controls
//!
//! - `Escape`: quit
//! - `V`: toggle vsync (rebuilds the swapchain with a new present mode)
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use ash::vk;
use cadence_app::{run_app, AppConfig, AppContext, CadenceApp, FrameContext, WindowEvent};
use winit::event::ElementState;
use winit::keyboard::{KeyCode, PhysicalKey};

struct PulseApp {
    time: f32,
}

impl CadenceApp for PulseApp {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        tracing::info!(
            "Rendering at {}x{}, {} frames in flight",
            ctx.width(),
            ctx.height(),
            ctx.frames_in_flight()
        );
        Ok(Self { time: 0.0 })
    }

    fn update(&mut self, _ctx: &AppContext, dt: f32) {
        self.time += dt;
    }

    fn record(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
        let device = ctx.gpu.device();

        let clear = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [
                    (self.time.sin() * 0.5 + 0.5) * 0.8,
                    ((self.time * 0.7).sin() * 0.5 + 0.5) * 0.8,
                    ((self.time * 1.3).sin() * 0.5 + 0.5) * 0.8,
                    1.0,
                ],
            },
        };

        let attachment = vk::RenderingAttachmentInfo::default()
            .image_view(frame.image_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(clear);

        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: frame.extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&attachment));

        // SAFETY: The command buffer is recording and the framework put
        // the image in the color-attachment layout
        unsafe {
            device.cmd_begin_rendering(frame.command_buffer, &rendering_info);
            device.cmd_end_rendering(frame.command_buffer);
        }

        Ok(())
    }

    fn on_event(&mut self, ctx: &mut AppContext, event: &WindowEvent) -> bool {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.state == ElementState::Pressed && !event.repeat {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => {
                        ctx.request_stop();
                        return true;
                    }
                    PhysicalKey::Code(KeyCode::KeyV) => {
                        let vsync = !ctx.vsync();
                        tracing::info!("vsync {}", if vsync { "on" } else { "off" });
                        ctx.set_vsync(vsync);
                        return true;
                    }
                    _ => {}
                }
            }
        }
        false
    }
}

fn main() -> anyhow::Result<()> {
    run_app::<PulseApp>(
        AppConfig::new("Cadence Viewer")
            .with_size(1280, 720)
            .with_vsync(true),
    )
}
