//! Invalidation decisions.

use crate::extent::Extent;
use crate::status::ChainStatus;

/// What the scheduler should do after observing the surface state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAction {
    /// Keep presenting with the current chain.
    Continue,
    /// Rebuild the chain before the next acquire.
    Recreate,
    /// Stop ticking entirely until the surface regains a nonzero extent.
    Suspend,
}

/// Map a surface observation to a scheduler action.
///
/// Suspension wins over recreation: a zero-dimension extent means the
/// window is minimized and no acquire may be attempted at all.
#[must_use]
pub fn decide(current: Extent, negotiated: Extent, status: ChainStatus) -> FrameAction {
    if current.is_zero() {
        return FrameAction::Suspend;
    }
    if status != ChainStatus::Optimal || current != negotiated {
        return FrameAction::Recreate;
    }
    FrameAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEGOTIATED: Extent = Extent::new(800, 600);

    #[test]
    fn matching_extent_and_optimal_continues() {
        assert_eq!(
            decide(NEGOTIATED, NEGOTIATED, ChainStatus::Optimal),
            FrameAction::Continue
        );
    }

    #[test]
    fn stale_status_recreates() {
        assert_eq!(
            decide(NEGOTIATED, NEGOTIATED, ChainStatus::OutOfDate),
            FrameAction::Recreate
        );
        assert_eq!(
            decide(NEGOTIATED, NEGOTIATED, ChainStatus::Suboptimal),
            FrameAction::Recreate
        );
    }

    #[test]
    fn changed_extent_recreates() {
        assert_eq!(
            decide(Extent::new(1024, 768), NEGOTIATED, ChainStatus::Optimal),
            FrameAction::Recreate
        );
    }

    #[test]
    fn zero_extent_suspends() {
        assert_eq!(
            decide(Extent::new(0, 0), NEGOTIATED, ChainStatus::Optimal),
            FrameAction::Suspend
        );
        // Suspension beats recreation even when the status is also stale.
        assert_eq!(
            decide(Extent::new(0, 600), NEGOTIATED, ChainStatus::OutOfDate),
            FrameAction::Suspend
        );
    }
}
