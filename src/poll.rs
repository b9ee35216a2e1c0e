//! Idle poll fallback
//!
//! For buffers that never deliver edit notifications. A fixed-period timer
//! compares a snapshot of the buffer tail against the last one that was
//! reconciled; a mismatch marks the buffer dirty until a tail gap fill
//! succeeds.

use std::time::{Duration, Instant};

use crate::buffer::Buffer;

/// Shortest accepted poll period
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Fixed-period timer driven by the host's idle loop
#[derive(Debug, Clone)]
pub struct IdleTimer {
    period: Duration,
    next_due: Option<Instant>,
}

impl IdleTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_POLL_PERIOD),
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Start the timer. Returns false (and changes nothing) if it is
    /// already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.next_due = Some(now + self.period);
        true
    }

    /// Stop the timer. Returns false if it was not running.
    pub fn cancel(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Schedule the next firing one period after `now`
    pub fn rearm(&mut self, now: Instant) {
        if self.is_running() {
            self.next_due = Some(now + self.period);
        }
    }
}

/// What the poller remembers about the buffer tail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailSnapshot {
    pub len_chars: usize,
    pub revision: u64,
}

impl TailSnapshot {
    pub fn of(buffer: &Buffer) -> Self {
        Self {
            len_chars: buffer.len_chars(),
            revision: buffer.revision(),
        }
    }
}

/// Timer plus dirty tracking for one buffer
#[derive(Debug, Clone)]
pub struct TailPoller {
    timer: IdleTimer,
    synced: TailSnapshot,
    dirty: bool,
}

impl TailPoller {
    /// Create a poller that treats the buffer's current state as synced
    pub fn new(period: Duration, buffer: &Buffer) -> Self {
        Self {
            timer: IdleTimer::new(period),
            synced: TailSnapshot::of(buffer),
            dirty: false,
        }
    }

    pub fn timer(&self) -> &IdleTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut IdleTimer {
        &mut self.timer
    }

    /// Compare the buffer against the last synced snapshot. Returns whether
    /// the buffer is dirty afterwards.
    pub fn observe(&mut self, buffer: &Buffer) -> bool {
        if TailSnapshot::of(buffer) != self.synced {
            self.dirty = true;
        }
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a successful tail reconciliation
    pub fn mark_synced(&mut self, buffer: &Buffer) {
        self.synced = TailSnapshot::of(buffer);
        self.dirty = false;
    }
}
