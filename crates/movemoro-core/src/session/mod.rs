//! Work/break session cycle.

mod machine;
mod state;

pub use machine::{SessionMachine, EXTENSION_OFFER_DELAY_SECS, SNAPSHOT_MAX_AGE_MS};
pub use state::{is_long_break, Mode, SessionConfig, SessionSnapshot, SessionState};
