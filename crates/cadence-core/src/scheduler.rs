//! The per-frame control loop.

use tracing::{debug, info};

use crate::cursor::FrameCursor;
use crate::extent::Extent;
use crate::policy::{decide, FrameAction};
use crate::status::{AcquireOutcome, ChainStatus};

/// Capability set the scheduler drives a graphics backend through.
///
/// One implementation per backend; the scheduler depends only on this
/// interface. The Vulkan variant lives in `cadence-app`.
pub trait FrameBackend {
    type Error;

    /// Block until the slot's previous submission has retired.
    ///
    /// A wait that times out must be reported as an error, not retried.
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Ask the chain for its next presentable image, arming the slot's
    /// acquire semaphore.
    fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome, Self::Error>;

    /// Reset the slot's completion fence and command recording resource.
    ///
    /// Called only after a successful acquire, so a tick that bails out
    /// on `OutOfDate` leaves the fence signaled and the retried slot
    /// cannot deadlock.
    fn prepare_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Record the frame (layout transitions plus the client callback)
    /// and submit it, waiting on the acquire semaphore and signaling the
    /// present semaphore and completion fence.
    fn record_and_submit(&mut self, slot: usize, image_index: u32) -> Result<(), Self::Error>;

    /// Queue the image for presentation, waiting on the slot's present
    /// semaphore.
    fn present(&mut self, slot: usize, image_index: u32) -> Result<ChainStatus, Self::Error>;

    /// Block until the device has retired all submitted work.
    fn wait_idle(&mut self) -> Result<(), Self::Error>;

    /// Release the current chain, if any.
    ///
    /// Only called after `wait_idle`, so no in-flight frame references
    /// the images being released.
    fn destroy_chain(&mut self) -> Result<(), Self::Error>;

    /// Build a fresh chain against the surface; returns the negotiated
    /// extent.
    fn create_chain(&mut self) -> Result<Extent, Self::Error>;

    /// The surface's current pixel extent.
    fn surface_extent(&mut self) -> Result<Extent, Self::Error>;
}

/// Outcome of one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// A frame was recorded, submitted, and queued for presentation.
    Presented,
    /// The chain was rebuilt instead of (or right after) presenting.
    Recreated,
    /// The surface has a zero dimension; nothing was attempted.
    Suspended,
}

/// Drives acquire, record, submit, and present for one frame per tick,
/// rebuilding the presentable chain when the surface invalidates it.
///
/// Frame slot state is owned by the backend; the scheduler owns only the
/// cursor and the invalidation bookkeeping, so chain recreation never
/// touches slot synchronization primitives.
pub struct FrameScheduler {
    cursor: FrameCursor,
    negotiated: Extent,
    suspended: bool,
    recreate_pending: bool,
    frames_presented: u64,
}

impl FrameScheduler {
    /// Create a scheduler over `slot_count` frame slots, with `negotiated`
    /// being the extent the initial chain was built with.
    #[must_use]
    pub fn new(slot_count: usize, negotiated: Extent) -> Self {
        Self {
            cursor: FrameCursor::new(slot_count),
            negotiated,
            suspended: false,
            recreate_pending: false,
            frames_presented: 0,
        }
    }

    /// Index of the slot the next tick will use.
    #[must_use]
    pub const fn frame_index(&self) -> usize {
        self.cursor.index()
    }

    /// Number of frames presented so far.
    #[must_use]
    pub const fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Extent of the live chain (last successful negotiation).
    #[must_use]
    pub const fn negotiated_extent(&self) -> Extent {
        self.negotiated
    }

    /// Whether ticking is suspended (minimized surface).
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// External resize notification from the windowing collaborator.
    pub fn notify_resized(&mut self, extent: Extent) {
        match decide(extent, self.negotiated, ChainStatus::Optimal) {
            FrameAction::Suspend => {
                if !self.suspended {
                    info!("surface minimized, suspending presentation");
                }
                self.suspended = true;
                self.recreate_pending = true;
            }
            FrameAction::Recreate => {
                self.suspended = false;
                self.recreate_pending = true;
            }
            // Same extent as the live chain. Still resume if we were
            // suspended; the pending flag from suspension rebuilds the
            // destroyed chain.
            FrameAction::Continue => self.suspended = false,
        }
    }

    /// Force a chain rebuild at the next tick (e.g. present-mode change).
    pub fn request_recreate(&mut self) {
        self.recreate_pending = true;
    }

    /// Run one frame. Returns the fatal backend error, if any; stale-chain
    /// conditions are handled internally and never surface here.
    pub fn tick<B: FrameBackend>(&mut self, backend: &mut B) -> Result<Tick, B::Error> {
        if self.suspended {
            return Ok(Tick::Suspended);
        }
        if self.recreate_pending {
            self.recreate(backend)?;
            if self.suspended {
                return Ok(Tick::Suspended);
            }
        }

        let slot = self.cursor.index();
        backend.wait_for_slot(slot)?;

        let (image_index, suboptimal) = match backend.acquire(slot)? {
            AcquireOutcome::OutOfDate => {
                debug!(slot, "acquire reported an out-of-date chain");
                self.recreate(backend)?;
                // Cursor untouched: the slot was never used, its fence is
                // still signaled, and the next tick retries it.
                return Ok(if self.suspended {
                    Tick::Suspended
                } else {
                    Tick::Recreated
                });
            }
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
        };
        if suboptimal {
            // Render this frame normally; rebuild before the next acquire.
            debug!(slot, "acquire reported a suboptimal chain");
            self.recreate_pending = true;
        }

        backend.prepare_slot(slot)?;
        backend.record_and_submit(slot, image_index)?;

        let status = backend.present(slot, image_index)?;
        self.frames_presented += 1;
        match status {
            ChainStatus::Optimal => {
                self.cursor.advance();
                Ok(Tick::Presented)
            }
            ChainStatus::Suboptimal | ChainStatus::OutOfDate => {
                debug!(slot, ?status, "present invalidated the chain");
                self.recreate(backend)?;
                Ok(if self.suspended {
                    Tick::Suspended
                } else {
                    Tick::Recreated
                })
            }
        }
    }

    /// The recreation protocol: full device idle, tear down the old chain,
    /// then rebuild it — or suspend if the surface collapsed to zero.
    fn recreate<B: FrameBackend>(&mut self, backend: &mut B) -> Result<(), B::Error> {
        backend.wait_idle()?;
        backend.destroy_chain()?;

        let extent = backend.surface_extent()?;
        if extent.is_zero() {
            info!("surface minimized, suspending presentation");
            self.suspended = true;
            // The chain is gone; keep the rebuild pending until a resize
            // notification reports a nonzero extent.
            self.recreate_pending = true;
            return Ok(());
        }

        self.negotiated = backend.create_chain()?;
        self.suspended = false;
        self.recreate_pending = false;
        info!(
            width = self.negotiated.width,
            height = self.negotiated.height,
            "presentable chain rebuilt"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Prepare(usize),
        Submit(usize, u32),
        Present(usize, u32),
        WaitIdle,
        DestroyChain,
        CreateChain,
        SurfaceExtent,
    }

    struct MockBackend {
        calls: Vec<Call>,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<ChainStatus>,
        surface: Extent,
        chain: Option<Extent>,
        next_image: u32,
        image_count: u32,
        submit_error: Option<&'static str>,
    }

    impl MockBackend {
        fn new(extent: Extent) -> Self {
            Self {
                calls: Vec::new(),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                surface: extent,
                chain: Some(extent),
                next_image: 0,
                image_count: 3,
                submit_error: None,
            }
        }

        fn count(&self, call: Call) -> usize {
            self.calls.iter().filter(|&&c| c == call).count()
        }

        fn position(&self, call: Call) -> Option<usize> {
            self.calls.iter().position(|&c| c == call)
        }
    }

    impl FrameBackend for MockBackend {
        type Error = &'static str;

        fn wait_for_slot(&mut self, slot: usize) -> Result<(), Self::Error> {
            self.calls.push(Call::Wait(slot));
            Ok(())
        }

        fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome, Self::Error> {
            self.calls.push(Call::Acquire(slot));
            if self.chain.is_none() {
                return Err("acquire without a live chain");
            }
            if let Some(outcome) = self.acquire_script.pop_front() {
                return Ok(outcome);
            }
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count;
            Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal: false,
            })
        }

        fn prepare_slot(&mut self, slot: usize) -> Result<(), Self::Error> {
            self.calls.push(Call::Prepare(slot));
            Ok(())
        }

        fn record_and_submit(&mut self, slot: usize, image_index: u32) -> Result<(), Self::Error> {
            self.calls.push(Call::Submit(slot, image_index));
            match self.submit_error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<ChainStatus, Self::Error> {
            self.calls.push(Call::Present(slot, image_index));
            Ok(self.present_script.pop_front().unwrap_or(ChainStatus::Optimal))
        }

        fn wait_idle(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::WaitIdle);
            Ok(())
        }

        fn destroy_chain(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::DestroyChain);
            self.chain = None;
            Ok(())
        }

        fn create_chain(&mut self) -> Result<Extent, Self::Error> {
            self.calls.push(Call::CreateChain);
            self.chain = Some(self.surface);
            Ok(self.surface)
        }

        fn surface_extent(&mut self) -> Result<Extent, Self::Error> {
            self.calls.push(Call::SurfaceExtent);
            Ok(self.surface)
        }
    }

    const EXTENT: Extent = Extent::new(800, 600);

    #[test]
    fn steady_state_cycles_slots_in_order() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(3, EXTENT);

        for _ in 0..3 {
            assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Presented));
        }

        // Each tick waits its slot before acquiring, prepares only after
        // the acquire succeeded, and submits before presenting.
        let expected: Vec<Call> = (0..3)
            .flat_map(|k| {
                let (slot, image) = (k, k as u32);
                vec![
                    Call::Wait(slot),
                    Call::Acquire(slot),
                    Call::Prepare(slot),
                    Call::Submit(slot, image),
                    Call::Present(slot, image),
                ]
            })
            .collect();
        assert_eq!(backend.calls, expected);
        assert_eq!(scheduler.frames_presented(), 3);
    }

    #[test]
    fn cursor_advances_modulo_slot_count() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        for k in 0..7 {
            assert_eq!(scheduler.frame_index(), k % 2);
            scheduler.tick(&mut backend).unwrap();
        }
        assert_eq!(scheduler.frame_index(), 7 % 2);
    }

    #[test]
    fn suboptimal_acquire_presents_then_recreates_before_next_acquire() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        backend.acquire_script.push_back(AcquireOutcome::Acquired {
            image_index: 0,
            suboptimal: true,
        });

        // The suboptimal frame still submits and presents normally.
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Presented));
        assert_eq!(backend.count(Call::Submit(0, 0)), 1);
        assert_eq!(backend.count(Call::Present(0, 0)), 1);
        assert_eq!(backend.count(Call::CreateChain), 0);

        // The next tick rebuilds the chain before it acquires.
        backend.calls.clear();
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Presented));
        let create = backend.position(Call::CreateChain).unwrap();
        let acquire = backend.position(Call::Acquire(1)).unwrap();
        assert!(create < acquire);
    }

    #[test]
    fn out_of_date_acquire_recreates_without_submitting() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);

        let slot_before = scheduler.frame_index();
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Recreated));

        // Device idle, teardown, and rebuild all happened; nothing was
        // recorded or presented.
        assert_eq!(backend.count(Call::WaitIdle), 1);
        assert_eq!(backend.count(Call::DestroyChain), 1);
        assert_eq!(backend.count(Call::CreateChain), 1);
        assert!(!backend.calls.iter().any(|c| matches!(c, Call::Prepare(_))));
        assert!(!backend.calls.iter().any(|c| matches!(c, Call::Submit(..))));
        assert!(!backend.calls.iter().any(|c| matches!(c, Call::Present(..))));

        // Cursor unchanged; the next tick resumes from the same slot.
        assert_eq!(scheduler.frame_index(), slot_before);
        backend.calls.clear();
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Presented));
        assert_eq!(backend.calls[0], Call::Wait(slot_before));
    }

    #[test]
    fn minimize_suspends_until_resize_reports_nonzero() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        scheduler.notify_resized(Extent::new(0, 0));
        assert!(scheduler.is_suspended());

        // No acquire (or any backend call) is attempted while suspended.
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Suspended));
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Suspended));
        assert!(backend.calls.is_empty());

        backend.surface = Extent::new(640, 480);
        scheduler.notify_resized(Extent::new(640, 480));
        assert!(!scheduler.is_suspended());

        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Presented));
        let create = backend.position(Call::CreateChain).unwrap();
        let acquire = backend.position(Call::Acquire(0)).unwrap();
        assert!(create < acquire);
        assert_eq!(scheduler.negotiated_extent(), Extent::new(640, 480));
    }

    #[test]
    fn zero_extent_during_recreation_suspends_with_chain_destroyed() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        backend.surface = Extent::new(0, 0);

        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Suspended));
        assert!(scheduler.is_suspended());
        assert_eq!(backend.count(Call::DestroyChain), 1);
        assert_eq!(backend.count(Call::CreateChain), 0);

        // Restoring the surface resumes and rebuilds exactly once.
        backend.surface = EXTENT;
        scheduler.notify_resized(EXTENT);
        backend.calls.clear();
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Presented));
        assert_eq!(backend.count(Call::CreateChain), 1);
    }

    #[test]
    fn present_out_of_date_recreates_after_submitting() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        backend.present_script.push_back(ChainStatus::OutOfDate);

        let slot_before = scheduler.frame_index();
        assert_eq!(scheduler.tick(&mut backend), Ok(Tick::Recreated));

        // The frame was fully submitted before the invalidation arrived.
        assert_eq!(backend.count(Call::Submit(0, 0)), 1);
        assert_eq!(backend.count(Call::CreateChain), 1);
        assert_eq!(scheduler.frame_index(), slot_before);
    }

    #[test]
    fn recreation_with_stable_extent_is_idempotent() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        scheduler.request_recreate();
        scheduler.tick(&mut backend).unwrap();
        let first = scheduler.negotiated_extent();

        scheduler.request_recreate();
        scheduler.tick(&mut backend).unwrap();
        let second = scheduler.negotiated_extent();

        assert_eq!(first, EXTENT);
        assert_eq!(second, EXTENT);
        assert_eq!(backend.count(Call::CreateChain), 2);
    }

    #[test]
    fn resize_to_current_extent_does_not_recreate() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        scheduler.notify_resized(EXTENT);
        scheduler.tick(&mut backend).unwrap();
        assert_eq!(backend.count(Call::WaitIdle), 0);
        assert_eq!(backend.count(Call::CreateChain), 0);
    }

    #[test]
    fn record_failure_is_fatal_and_skips_present() {
        let mut backend = MockBackend::new(EXTENT);
        let mut scheduler = FrameScheduler::new(2, EXTENT);

        backend.submit_error = Some("command recording failed");
        assert_eq!(
            scheduler.tick(&mut backend),
            Err("command recording failed")
        );
        assert!(!backend.calls.iter().any(|c| matches!(c, Call::Present(..))));
    }
}
