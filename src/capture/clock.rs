use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source a player derives its playback position from.
pub trait MediaClock: Send {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Real time since construction.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    /// Clock starting at zero now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaClock for WallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Externally driven clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock stopped at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `t`.
    pub fn set(&self, t: Duration) {
        self.nanos.store(duration_nanos(t), Ordering::SeqCst);
    }

    /// Move forward by `dt`.
    pub fn advance(&self, dt: Duration) {
        self.nanos.fetch_add(duration_nanos(dt), Ordering::SeqCst);
    }
}

impl MediaClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
