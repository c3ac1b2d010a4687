//! Backend-agnostic frame pacing for the Cadence engine.
//!
//! This crate provides:
//! - The per-tick frame scheduler and its recreation protocol
//! - Invalidation decisions (resize, minimize, stale-chain feedback)
//! - Frame slot cursor arithmetic
//! - The capability-set interface a graphics backend implements
//!
//! Nothing here touches a graphics API. The Vulkan realization lives in
//! `cadence-gpu` and `cadence-app`.

pub mod cursor;
pub mod extent;
pub mod policy;
pub mod scheduler;
pub mod status;

pub use cursor::FrameCursor;
pub use extent::Extent;
pub use policy::{decide, FrameAction};
pub use scheduler::{FrameBackend, FrameScheduler, Tick};
pub use status::{AcquireOutcome, ChainStatus};
