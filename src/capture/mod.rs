//! Export capture: clocks, frame scheduling, the playback seam and the driver state machine.

pub mod canvas_capture;
/// Media clocks.
pub mod clock;
pub mod driver;
pub mod player;
pub mod ticks;
