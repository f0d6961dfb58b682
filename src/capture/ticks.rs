//! Explicit frame scheduling.
//!
//! A [`TickSource`] is the host's "give me the next frame" primitive. [`run_ticks`] owns the loop
//! and only asks for the next tick after the callback for the current one has returned, so ticks
//! never overlap.

use std::time::{Duration, Instant};

use crate::capture::clock::{ManualClock, MediaClock as _};
use crate::foundation::core::Fps;

/// One scheduled callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// 0-based tick counter.
    pub index: u64,
    /// Time since the first tick, as seen by the source.
    pub elapsed: Duration,
}

/// What the tick callback wants next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickFlow {
    /// Request another tick.
    Continue,
    /// Leave the loop.
    Stop,
}

/// Host frame scheduler.
pub trait TickSource {
    /// Block until the next frame is due. `None` means the host stopped delivering frames.
    fn next_tick(&mut self) -> Option<Tick>;
}

/// Drive `on_tick` until it returns [`TickFlow::Stop`], fails, or the source dries up.
///
/// Returns the number of ticks handled.
pub fn run_ticks<E>(
    source: &mut dyn TickSource,
    mut on_tick: impl FnMut(Tick) -> Result<TickFlow, E>,
) -> Result<u64, E> {
    let mut handled = 0u64;
    while let Some(tick) = source.next_tick() {
        handled += 1;
        if on_tick(tick)? == TickFlow::Stop {
            break;
        }
    }
    Ok(handled)
}

/// Wall-clock ticks at a fixed rate.
///
/// Sleeps until each frame boundary; a late tick is delivered immediately and the schedule does
/// not drift.
#[derive(Debug)]
pub struct PacedTicks {
    frame: Duration,
    start: Option<Instant>,
    index: u64,
}

impl PacedTicks {
    /// Ticks at `fps`.
    pub fn new(fps: Fps) -> Self {
        Self {
            frame: Duration::from_secs_f64(fps.frame_duration_secs()),
            start: None,
            index: 0,
        }
    }
}

impl TickSource for PacedTicks {
    fn next_tick(&mut self) -> Option<Tick> {
        let start = *self.start.get_or_insert_with(Instant::now);
        let due = self.frame.saturating_mul(u32::try_from(self.index).unwrap_or(u32::MAX));
        let elapsed = start.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }
        let tick = Tick {
            index: self.index,
            elapsed: start.elapsed(),
        };
        self.index += 1;
        Some(tick)
    }
}

/// Deterministic ticks that move a [`ManualClock`] forward by one frame each and never sleep.
///
/// The first tick leaves the clock where it is; tick `k` sets it to `origin + k / fps`, computed
/// exactly rather than accumulated.
#[derive(Debug)]
pub struct SteppedTicks {
    clock: ManualClock,
    fps: Fps,
    origin: Option<Duration>,
    index: u64,
    limit: Option<u64>,
}

impl SteppedTicks {
    /// Step `clock` at `fps`.
    pub fn new(clock: ManualClock, fps: Fps) -> Self {
        Self {
            clock,
            fps,
            origin: None,
            index: 0,
            limit: None,
        }
    }

    /// Stop delivering after `limit` ticks.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn offset(&self, k: u64) -> Duration {
        let nanos = u128::from(k) * 1_000_000_000u128 * u128::from(self.fps.den);
        let den = u128::from(self.fps.num);
        Duration::from_nanos(((nanos + den / 2) / den) as u64)
    }
}

impl TickSource for SteppedTicks {
    fn next_tick(&mut self) -> Option<Tick> {
        if self.limit.is_some_and(|limit| self.index >= limit) {
            return None;
        }
        let origin = *self.origin.get_or_insert_with(|| self.clock.now());
        let elapsed = self.offset(self.index);
        self.clock.set(origin + elapsed);
        let tick = Tick {
            index: self.index,
            elapsed,
        };
        self.index += 1;
        Some(tick)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/ticks.rs"]
mod tests;
