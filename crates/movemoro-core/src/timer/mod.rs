mod clock;
mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    Extension, TimerEngine, TimerEvent, TimerSnapshot, TimerState, CHECK_INTERVAL_MS,
};
