//! Acquire and present outcome vocabulary.

/// Compositor feedback from an acquire or present call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainStatus {
    /// The chain still matches the surface.
    Optimal,
    /// Usable this frame, but the chain should be rebuilt soon.
    Suboptimal,
    /// No longer usable; the chain must be rebuilt before the next frame.
    OutOfDate,
}

/// Result of asking the chain for its next presentable image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired and its acquire semaphore will be signaled.
    Acquired {
        /// Index of the acquired image within the chain.
        image_index: u32,
        /// The image is usable but the chain no longer matches the surface.
        suboptimal: bool,
    },
    /// The chain is stale; nothing was acquired.
    OutOfDate,
}
