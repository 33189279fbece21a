use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::frame::Frame;

/// Single-slot, latest-frame-wins hand-off between acquisition and control.
///
/// `put` replaces whatever frame is waiting, `take` moves the waiting frame
/// out. Neither side ever waits on the other beyond the slot swap itself, and
/// the slot never holds more than one frame.
#[derive(Debug, Default)]
pub struct FrameChannel {
    slot: Mutex<Option<Frame>>,
    puts: AtomicU64,
    dropped: AtomicU64,
}

impl FrameChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer side. Overwrites an unread frame.
    pub fn put(&self, frame: Frame) {
        let previous = self.lock().replace(frame);
        self.puts.fetch_add(1, Ordering::Relaxed);

        // Dropped outside the lock so the consumer never waits on a free.
        if let Some(stale) = previous {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(sequence = stale.sequence(), "overwrote unread frame");
        }
    }

    /// Consumer side. Returns the most recent frame, or `None` when nothing
    /// new has been put since the last take.
    pub fn take(&self) -> Option<Frame> {
        self.lock().take()
    }

    /// Total frames ever put.
    pub fn frames_put(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Frames that were overwritten before the consumer took them.
    pub fn frames_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        // A panic while holding the guard cannot leave a half-written frame:
        // the slot is only ever assigned whole values.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
