//! Collapse bursts of events into one callback per scheduler tick.
//!
//! A producer pushes values as fast as events arrive; the first push after
//! a tick asks the host to schedule one (an animation frame in a browser),
//! later pushes only overwrite the stored value. When the tick runs,
//! [`Coalescer::take`] hands out the most recent value exactly once.

/// Outcome of [`Coalescer::push`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// No tick was pending; the caller must schedule one.
    Requested,
    /// A tick is already pending and will see this value.
    Coalesced,
}

/// Latest-value rate limiter.
#[derive(Clone, Debug)]
pub struct Coalescer<T> {
    latest: Option<T>,
    pending: bool,
    pushed: u64,
    ticks: u64,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            latest: None,
            pending: false,
            pushed: 0,
            ticks: 0,
        }
    }
}

impl<T> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as the latest observation.
    pub fn push(&mut self, value: T) -> Schedule {
        self.latest = Some(value);
        self.pushed += 1;
        if self.pending {
            Schedule::Coalesced
        } else {
            self.pending = true;
            Schedule::Requested
        }
    }

    /// Consume the pending tick. Returns `None` if no tick was requested
    /// since the last call.
    pub fn take(&mut self) -> Option<T> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.ticks += 1;
        self.latest.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Values pushed so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Ticks that actually ran.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
