//! Vulkan presentation layer for the Cadence engine.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - Surface capability queries
//! - Swapchain negotiation, creation, and teardown
//! - Frame slot synchronization primitives
//! - Command buffer management and presentable-image barriers

pub mod barrier;
pub mod command;
pub mod context;
pub mod error;
pub mod instance;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use command::CommandPool;
pub use context::{GpuContext, GpuContextBuilder};
pub use error::{GpuError, Result};
pub use surface::{SurfaceCaps, SurfaceContext};
pub use swapchain::Swapchain;
pub use sync::{create_fence, create_semaphore, FrameSlot, FrameSlotRing};
