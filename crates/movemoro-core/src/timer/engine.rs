//! Drift-corrected countdown timer.
//!
//! The engine never decrements a counter per callback. It keeps an anchor
//! instant `anchor = now - elapsed` and derives the remaining whole seconds
//! from the clock on every check, so late or skipped checks (a suspended
//! process, a throttled host loop) cannot accumulate error.
//!
//! There is no internal thread. The owner calls `tick()` periodically
//! (every [`CHECK_INTERVAL_MS`] in the CLI loop) and forwards the returned
//! [`TimerEvent`]s.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            \
//!             -> Completed (terminal)
//! ```

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use crate::error::ValidationError;

/// Recommended granularity of the periodic check.
///
/// Independent of any display refresh rate: the check only decides when a
/// new whole second is observed, never how much time has passed.
pub const CHECK_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// What the owner of a timer has to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The whole-second remaining value changed.
    Tick { remaining_secs: u64 },
    /// Remaining reached zero. Emitted exactly once per timer.
    Completed,
}

/// Result of [`TimerEngine::extend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub before_secs: u64,
    pub after_secs: u64,
    pub bonus_secs: u64,
}

/// Persistable view of a timer, used to survive a restart of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub duration_secs: u64,
    pub remaining_secs: u64,
    pub running: bool,
    #[serde(default)]
    pub anchor_ms: Option<u64>,
    pub saved_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TimerEngine<C: Clock = SystemClock> {
    duration_secs: u64,
    remaining_secs: u64,
    state: TimerState,
    /// Instant the current run began, shifted back by the time already
    /// elapsed before it. Only set while running.
    anchor_ms: Option<u64>,
    clock: C,
}

impl<C: Clock> TimerEngine<C> {
    /// Create an idle timer with `remaining == duration`.
    ///
    /// # Errors
    /// Returns [`ValidationError::ZeroDuration`] for a zero duration.
    pub fn new(duration_secs: u64, clock: C) -> Result<Self, ValidationError> {
        NonZeroU64::new(duration_secs)
            .map(|d| Self::with_duration(d, clock))
            .ok_or(ValidationError::ZeroDuration)
    }

    pub fn with_duration(duration_secs: NonZeroU64, clock: C) -> Self {
        Self {
            duration_secs: duration_secs.get(),
            remaining_secs: duration_secs.get(),
            state: TimerState::Idle,
            anchor_ms: None,
            clock,
        }
    }

    /// Rebuild a timer from a snapshot.
    ///
    /// Returns `None` when the snapshot is `max_age_ms` old or older, or is not
    /// a valid timer. A snapshot taken while running keeps counting through
    /// the time the host was gone; the next `tick()` catches up.
    pub fn restore(snapshot: &TimerSnapshot, clock: C, max_age_ms: u64) -> Option<Self> {
        let now = clock.now_ms();
        if now.saturating_sub(snapshot.saved_at_ms) >= max_age_ms || snapshot.duration_secs == 0 {
            return None;
        }
        let remaining_secs = snapshot.remaining_secs.min(snapshot.duration_secs);
        let (state, anchor_ms) = match (snapshot.running, snapshot.anchor_ms) {
            (true, Some(anchor)) if remaining_secs > 0 => (TimerState::Running, Some(anchor)),
            _ if remaining_secs == 0 => (TimerState::Completed, None),
            _ if remaining_secs == snapshot.duration_secs => (TimerState::Idle, None),
            _ => (TimerState::Paused, None),
        };
        Some(Self {
            duration_secs: snapshot.duration_secs,
            remaining_secs,
            state,
            anchor_ms,
            clock,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_completed(&self) -> bool {
        self.state == TimerState::Completed
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Last computed remaining whole seconds.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.duration_secs - self.remaining_secs
    }

    /// True while nothing has been consumed yet.
    pub fn is_untouched(&self) -> bool {
        self.state == TimerState::Idle && self.remaining_secs == self.duration_secs
    }

    /// 0.0 .. 1.0 progress through the countdown.
    pub fn progress(&self) -> f64 {
        self.elapsed_secs() as f64 / self.duration_secs as f64
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            duration_secs: self.duration_secs,
            remaining_secs: self.remaining_secs,
            running: self.is_running(),
            anchor_ms: self.anchor_ms,
            saved_at_ms: self.clock.now_ms(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume. A no-op while running or once completed.
    ///
    /// The anchor is recomputed from the frozen remaining value, so time
    /// spent paused is never counted.
    pub fn start(&mut self) -> Vec<TimerEvent> {
        match self.state {
            TimerState::Running | TimerState::Completed => Vec::new(),
            TimerState::Idle | TimerState::Paused => {
                let elapsed_ms = self.elapsed_secs().saturating_mul(1000);
                self.anchor_ms = Some(self.clock.now_ms().saturating_sub(elapsed_ms));
                self.state = TimerState::Running;
                self.tick()
            }
        }
    }

    /// Freeze `remaining` at its last computed value.
    ///
    /// Returns false if the timer was not running.
    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Paused;
        self.anchor_ms = None;
        true
    }

    /// The periodic check.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        let Some(anchor) = self.anchor_ms.filter(|_| self.is_running()) else {
            return Vec::new();
        };

        let elapsed_secs = self.clock.now_ms().saturating_sub(anchor) / 1000;
        // A clock that stepped backwards must not hand time back.
        let remaining = self
            .duration_secs
            .saturating_sub(elapsed_secs)
            .min(self.remaining_secs);

        let mut events = Vec::with_capacity(2);
        if remaining != self.remaining_secs {
            self.remaining_secs = remaining;
            events.push(TimerEvent::Tick {
                remaining_secs: remaining,
            });
        }
        if remaining == 0 {
            self.state = TimerState::Completed;
            self.anchor_ms = None;
            events.push(TimerEvent::Completed);
        }
        events
    }

    /// Force completion without waiting for the clock (manual skip).
    pub fn complete_now(&mut self) -> Vec<TimerEvent> {
        if self.is_completed() {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if self.remaining_secs != 0 {
            self.remaining_secs = 0;
            events.push(TimerEvent::Tick { remaining_secs: 0 });
        }
        self.state = TimerState::Completed;
        self.anchor_ms = None;
        events.push(TimerEvent::Completed);
        events
    }

    /// Back to a full, idle countdown.
    pub fn reset(&mut self) -> Vec<TimerEvent> {
        self.state = TimerState::Idle;
        self.anchor_ms = None;
        self.remaining_secs = self.duration_secs;
        vec![TimerEvent::Tick {
            remaining_secs: self.remaining_secs,
        }]
    }

    /// Replace duration and remaining, keeping the running/paused status.
    ///
    /// # Errors
    /// Returns [`ValidationError::ZeroDuration`] for a zero duration; the
    /// timer is left untouched in that case.
    pub fn set_duration(&mut self, duration_secs: u64) -> Result<Vec<TimerEvent>, ValidationError> {
        if duration_secs == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        let was_running = self.pause();
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.state = TimerState::Idle;

        let mut events = vec![TimerEvent::Tick {
            remaining_secs: duration_secs,
        }];
        if was_running {
            events.extend(self.start());
        }
        Ok(events)
    }

    /// Grant bonus time in place and (re)start the countdown.
    ///
    /// Both `duration` and `remaining` grow by `bonus_secs`, so the time
    /// already elapsed and the anchor model stay intact. This is the only
    /// operation that mutates a live timer's duration instead of replacing
    /// the timer.
    pub fn extend(&mut self, bonus_secs: u64) -> (Extension, Vec<TimerEvent>) {
        self.pause();
        let before_secs = self.remaining_secs;
        self.duration_secs = self.duration_secs.saturating_add(bonus_secs);
        self.remaining_secs = before_secs.saturating_add(bonus_secs);
        if self.remaining_secs > 0 {
            self.state = TimerState::Paused;
        }

        let mut events = Vec::new();
        if bonus_secs > 0 {
            events.push(TimerEvent::Tick {
                remaining_secs: self.remaining_secs,
            });
        }
        events.extend(self.start());

        let extension = Extension {
            before_secs,
            after_secs: self.remaining_secs,
            bonus_secs,
        };
        (extension, events)
    }
}
