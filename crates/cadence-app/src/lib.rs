//! Application framework for the Cadence engine.
//!
//! This crate provides a trait-based application framework that handles
//! common boilerplate like:
//! - Window creation and management
//! - GPU context initialization
//! - Swapchain creation and recreation
//! - Frame synchronization and presentation
//! - Event loop handling
//!
//! # Example
//!
//! ```no_run
//! use cadence_app::{AppConfig, AppContext, CadenceApp, FrameContext, run_app};
//!
//! struct MyApp {
//!     // Application state
//! }
//!
//! impl CadenceApp for MyApp {
//!     fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(MyApp {})
//!     }
//!
//!     fn update(&mut self, ctx: &AppContext, dt: f32) {
//!         // Update logic
//!     }
//!
//!     fn record(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
//!         // Record rendering commands
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::default())
//! }
//! ```

mod app;
mod config;
mod context;
mod frame;
mod host;
mod runner;

pub use app::CadenceApp;
pub use config::AppConfig;
pub use context::AppContext;
pub use frame::FrameContext;
pub use runner::run_app;

// Re-export commonly used types for convenience
pub use cadence_gpu::{GpuContext, GpuContextBuilder};
pub use winit::event::WindowEvent;
