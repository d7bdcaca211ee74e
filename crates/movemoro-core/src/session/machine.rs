//! Session state machine.
//!
//! Owns the single live timer, the exercise selector and the
//! [`SessionState`]. Every intent returns the [`Event`]s it caused; the
//! presentation layer mirrors those and holds no state of its own.
//!
//! ```text
//! Work --complete--> (snack choice) --confirm--> Break | LongBreak
//!  ^                                                   |
//!  +---------------------- complete -------------------+
//! ```
//!
//! During a break the extension panel opens once the timer has run for
//! [`EXTENSION_OFFER_DELAY_SECS`]. Confirming an extension grows the live
//! break timer in place, or reopens the last break when the break already
//! elapsed and the machine is back in `Work`.

use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;

use super::state::{Mode, SessionConfig, SessionSnapshot, SessionState};
use crate::error::ConfigError;
use crate::events::Event;
use crate::exercise::{Exercise, ExerciseSelector, SnackPair, DEFAULT_EXTENSION_CHOICES};
use crate::notify::{Notification, Notifier};
use crate::storage::{Settings, Store};
use crate::timer::{Clock, SystemClock, TimerEngine, TimerEvent};

/// Seconds a break must have run before extensions are offered.
pub const EXTENSION_OFFER_DELAY_SECS: u64 = 2;

/// Snapshots this old or older are not restored.
pub const SNAPSHOT_MAX_AGE_MS: u64 = 5 * 60 * 1000;

pub struct SessionMachine<C: Clock = SystemClock, R: Rng = StdRng> {
    config: SessionConfig,
    state: SessionState,
    timer: TimerEngine<C>,
    selector: ExerciseSelector<R>,
    clock: C,
    notifier: Box<dyn Notifier>,
    store: Box<dyn Store>,
    /// Snack pair awaiting confirmation after a work interval.
    pending_choices: Option<SnackPair>,
    extension_candidates: Vec<Exercise>,
}

impl<C: Clock, R: Rng> SessionMachine<C, R> {
    /// Start in `Work` with an idle work timer.
    pub fn new(
        config: SessionConfig,
        selector: ExerciseSelector<R>,
        clock: C,
        notifier: impl Notifier + 'static,
        store: impl Store + 'static,
    ) -> Self {
        Self {
            timer: TimerEngine::with_duration(config.work, clock.clone()),
            config,
            state: SessionState::default(),
            selector,
            clock,
            notifier: Box::new(notifier),
            store: Box::new(store),
            pending_choices: None,
            extension_candidates: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn session_count(&self) -> u32 {
        self.state.session_count
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn timer(&self) -> &TimerEngine<C> {
        &self.timer
    }

    pub fn selector(&self) -> &ExerciseSelector<R> {
        &self.selector
    }

    /// Snack pair waiting for [`SessionMachine::confirm_exercise`].
    pub fn pending_choices(&self) -> Option<&SnackPair> {
        self.pending_choices.as_ref()
    }

    /// Extension exercises on the open panel; empty when it is closed.
    pub fn extension_candidates(&self) -> &[Exercise] {
        &self.extension_candidates
    }

    /// `(n, m)` for a "Session n of m" counter.
    pub fn session_in_cycle(&self) -> (u32, u32) {
        let m = self.config.sessions_before_long_break.max(1);
        (self.state.session_count % m + 1, m)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            timer: self.timer.snapshot(),
        }
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// The periodic check. Call every [`crate::timer::CHECK_INTERVAL_MS`].
    pub fn tick(&mut self) -> Vec<Event> {
        let timer_events = self.timer.tick();
        let mut events = self.absorb(timer_events);

        if self.state.mode.is_break()
            && !self.state.break_extension_offered
            && self.timer.is_running()
            && self.timer.elapsed_secs() >= EXTENSION_OFFER_DELAY_SECS
        {
            events.extend(self.offer_extension());
        }
        events
    }

    /// Pause a running timer, otherwise start or resume it.
    ///
    /// Starting a work timer closes a lingering extension panel.
    pub fn toggle_timer(&mut self) -> Vec<Event> {
        if self.timer.is_running() {
            self.timer.pause();
            tracing::debug!(mode = %self.state.mode, remaining = self.timer.remaining_secs(), "paused");
            return vec![Event::TimerPaused {
                mode: self.state.mode,
                remaining_secs: self.timer.remaining_secs(),
                at: self.now(),
            }];
        }
        if self.timer.is_completed() {
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.state.mode == Mode::Work {
            events.extend(self.close_extension_panel());
        }
        events.extend(self.start_timer());
        events
    }

    /// Force completion of the current interval.
    ///
    /// No-op while a snack choice is pending.
    pub fn skip(&mut self) -> Vec<Event> {
        if self.timer.is_completed() {
            return Vec::new();
        }
        let worked_secs = self.timer.elapsed_secs();
        let timer_events = self.timer.complete_now();
        let mut events: Vec<Event> = timer_events
            .into_iter()
            .filter_map(|event| match event {
                TimerEvent::Tick { remaining_secs } => Some(Event::Tick {
                    remaining_secs,
                    progress: 1.0,
                }),
                TimerEvent::Completed => None,
            })
            .collect();
        tracing::debug!(mode = %self.state.mode, worked_secs, "skipped");
        events.extend(self.on_timer_complete(worked_secs));
        events
    }

    /// Recreate the current mode's timer at full length.
    ///
    /// Mode and session count are untouched. A pending snack choice is
    /// dropped.
    pub fn reset(&mut self) -> Vec<Event> {
        if self.pending_choices.take().is_some() {
            self.selector.clear_current_pair();
        }
        let duration = self.config.duration_for(self.state.mode);
        self.replace_timer(duration);
        tracing::debug!(mode = %self.state.mode, "reset");
        vec![Event::TimerReset {
            mode: self.state.mode,
            duration_secs: duration.get(),
            at: self.now(),
        }]
    }

    /// Pick one of the pending snack exercises and start the break.
    pub fn confirm_exercise(&mut self, id: &str) -> Vec<Event> {
        let Some(exercise) = self.pending_choices.as_ref().and_then(|p| p.get(id)).cloned() else {
            tracing::debug!(id, "no pending snack exercise with this id");
            return Vec::new();
        };
        self.pending_choices = None;
        self.selector.clear_current_pair();

        let at = self.now();
        let mut events = vec![self.complete_exercise(&exercise, 0, at)];
        events.extend(self.enter_break());
        events
    }

    /// Replace the pending snack pair.
    pub fn regenerate(&mut self) -> Vec<Event> {
        if self.pending_choices.is_none() {
            return Vec::new();
        }
        let pair = self.selector.regenerate_snack_pair();
        self.pending_choices = Some(pair.clone());
        vec![Event::ExerciseChoices { pair }]
    }

    /// Open the extension panel. Once per break.
    pub fn offer_extension(&mut self) -> Vec<Event> {
        if !self.state.mode.is_break() || self.state.break_extension_offered {
            return Vec::new();
        }
        self.state.break_extension_offered = true;

        let candidates = self.selector.select_extension_candidates(DEFAULT_EXTENSION_CHOICES);
        if candidates.is_empty() {
            tracing::debug!("no extension exercises available");
            return Vec::new();
        }
        self.state.extension_panel_active = true;
        self.extension_candidates = candidates.clone();
        vec![Event::ExtensionCandidates {
            exercises: candidates,
        }]
    }

    /// Grant the chosen extension exercise's bonus break time.
    pub fn confirm_extension(&mut self, id: &str) -> Vec<Event> {
        if !self.state.extension_panel_active {
            return Vec::new();
        }
        let Some(exercise) = self.extension_candidates.iter().find(|e| e.id == id).cloned() else {
            tracing::debug!(id, "no extension candidate with this id");
            return Vec::new();
        };
        let bonus_secs = exercise.break_extension_secs;
        let mut events = Vec::new();

        let (before_secs, after_secs) = if self.state.mode.is_break() {
            let (extension, timer_events) = self.timer.extend(bonus_secs);
            events.extend(self.absorb(timer_events));
            (extension.before_secs, extension.after_secs)
        } else if let Some(duration) = NonZeroU64::new(bonus_secs) {
            // The break already elapsed; reopen it as a fresh, bonus-sized one.
            let mode = self.state.last_break_mode.unwrap_or(Mode::Break);
            events.extend(self.switch_mode(mode, duration));
            self.state.break_extension_offered = true;
            events.extend(self.start_timer());
            (0, bonus_secs)
        } else {
            (0, 0)
        };

        let at = self.now();
        tracing::info!(exercise = %exercise.id, before_secs, after_secs, "break extended");
        events.push(Event::ExtensionGranted {
            exercise_id: exercise.id.clone(),
            before_secs,
            after_secs,
            bonus_secs,
            at,
        });
        events.push(self.complete_exercise(&exercise, bonus_secs, at));
        events.extend(self.close_extension_panel());
        events
    }

    /// Dismiss the extension panel without granting anything.
    pub fn skip_extension(&mut self) -> Vec<Event> {
        self.close_extension_panel()
    }

    /// Adopt new settings.
    ///
    /// A timer nobody has started yet is resized to the new duration
    /// for its mode. Running, paused and completed timers are left alone.
    ///
    /// # Errors
    /// Returns the validation error; nothing is changed in that case.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<Vec<Event>, ConfigError> {
        settings.validate()?;
        self.config = SessionConfig::try_from(settings)?;
        self.selector.set_preferences(settings.exercise_preferences.clone());
        self.store.save_settings(settings);
        self.notifier.notify(Notification::GenericTick);

        let duration = self.config.duration_for(self.state.mode);
        if self.timer.is_untouched() && duration.get() != self.timer.duration_secs() {
            self.replace_timer(duration);
            return Ok(vec![Event::TimerReset {
                mode: self.state.mode,
                duration_secs: duration.get(),
                at: self.now(),
            }]);
        }
        Ok(Vec::new())
    }

    /// Pick up a previous run.
    ///
    /// The cycle counters always carry over. Mode and timer carry over only
    /// when the snapshot is at most `max_age_ms` old; a running timer then
    /// catches up on the time the host was away.
    pub fn restore(&mut self, snapshot: &SessionSnapshot, max_age_ms: u64) -> Vec<Event> {
        self.state.session_count = snapshot.state.session_count;
        self.state.last_break_mode = snapshot.state.last_break_mode;

        let Some(timer) = TimerEngine::restore(&snapshot.timer, self.clock.clone(), max_age_ms)
        else {
            tracing::debug!("session snapshot too old, starting fresh");
            return Vec::new();
        };

        self.timer.pause();
        self.timer = timer;
        self.state = SessionState {
            extension_panel_active: false,
            ..snapshot.state.clone()
        };
        self.pending_choices = None;
        self.extension_candidates.clear();
        tracing::debug!(mode = %self.state.mode, remaining = self.timer.remaining_secs(), "session restored");

        let mut events = vec![
            self.mode_changed(self.state.mode, self.timer.duration_secs()),
            Event::Tick {
                remaining_secs: self.timer.remaining_secs(),
                progress: self.timer.progress(),
            },
        ];
        if self.timer.is_completed() {
            if self.state.mode == Mode::Work {
                events.extend(self.present_choices());
            } else {
                let worked_secs = self.timer.duration_secs();
                events.extend(self.on_timer_complete(worked_secs));
            }
        } else {
            events.extend(self.tick());
        }
        events
    }

    // ── Transitions ──────────────────────────────────────────────────

    fn on_timer_complete(&mut self, worked_secs: u64) -> Vec<Event> {
        let at = self.now();
        let mode = self.state.mode;
        self.store.record_session(mode, worked_secs, at);

        if mode == Mode::Work {
            self.notifier.notify(Notification::WorkComplete);
            tracing::info!(worked_secs, "work interval completed");
            let mut events = vec![Event::WorkCompleted { worked_secs, at }];
            events.extend(self.close_extension_panel());
            events.extend(self.present_choices());
            return events;
        }

        self.notifier.notify(Notification::BreakComplete);
        self.state.session_count += 1;
        tracing::info!(%mode, session_count = self.state.session_count, "break completed");

        let mut events = vec![Event::BreakCompleted {
            mode,
            session_count: self.state.session_count,
            at,
        }];
        events.extend(self.switch_mode(Mode::Work, self.config.work));
        events
    }

    /// Offer a snack pair, or go straight to the break if there is none.
    fn present_choices(&mut self) -> Vec<Event> {
        let pair = self.selector.select_snack_pair();
        if pair.is_empty() {
            tracing::warn!("no exercises available, starting break without one");
            let mut events = vec![Event::ExerciseChoices { pair }];
            events.extend(self.enter_break());
            return events;
        }
        self.pending_choices = Some(pair.clone());
        vec![Event::ExerciseChoices { pair }]
    }

    fn enter_break(&mut self) -> Vec<Event> {
        let mode = if self
            .state
            .next_break_is_long(self.config.sessions_before_long_break)
        {
            Mode::LongBreak
        } else {
            Mode::Break
        };
        self.state.last_break_mode = Some(mode);
        self.state.break_extension_offered = false;

        let mut events = self.close_extension_panel();
        events.extend(self.switch_mode(mode, self.config.duration_for(mode)));
        events.extend(self.start_timer());
        events
    }

    /// Stop the old timer before creating the next one.
    fn switch_mode(&mut self, mode: Mode, duration: NonZeroU64) -> Vec<Event> {
        self.replace_timer(duration);
        self.state.mode = mode;
        tracing::debug!(%mode, duration_secs = duration.get(), "mode changed");
        vec![self.mode_changed(mode, duration.get())]
    }

    fn replace_timer(&mut self, duration: NonZeroU64) {
        self.timer.pause();
        self.timer = TimerEngine::with_duration(duration, self.clock.clone());
    }

    fn start_timer(&mut self) -> Vec<Event> {
        if self.timer.is_running() || self.timer.is_completed() {
            return Vec::new();
        }
        let timer_events = self.timer.start();
        let mut events = vec![Event::TimerStarted {
            mode: self.state.mode,
            remaining_secs: self.timer.remaining_secs(),
            at: self.now(),
        }];
        events.extend(self.absorb(timer_events));
        events
    }

    fn close_extension_panel(&mut self) -> Vec<Event> {
        if !self.state.extension_panel_active {
            return Vec::new();
        }
        self.state.extension_panel_active = false;
        self.extension_candidates.clear();
        vec![Event::ExtensionClosed]
    }

    fn complete_exercise(&mut self, exercise: &Exercise, bonus_secs: u64, at: DateTime<Utc>) -> Event {
        self.selector.record_completion(exercise, at);
        self.store.save_history(self.selector.history());
        self.store.record_exercise(exercise, bonus_secs, at);
        Event::ExerciseCompleted {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            category: exercise.category,
            at,
        }
    }

    /// Translate timer events, running the completion flow when needed.
    fn absorb(&mut self, timer_events: Vec<TimerEvent>) -> Vec<Event> {
        let mut events = Vec::new();
        for event in timer_events {
            match event {
                TimerEvent::Tick { remaining_secs } => events.push(Event::Tick {
                    remaining_secs,
                    progress: self.timer.progress(),
                }),
                TimerEvent::Completed => {
                    let worked_secs = self.timer.duration_secs();
                    events.extend(self.on_timer_complete(worked_secs));
                }
            }
        }
        events
    }

    fn mode_changed(&self, mode: Mode, duration_secs: u64) -> Event {
        Event::ModeChanged {
            mode,
            is_long_break: mode == Mode::LongBreak,
            duration_secs,
            at: self.now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        i64::try_from(self.clock.now_ms())
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{
        BuiltinCatalog, Catalog, CatalogSource, Category, CompletionHistory, SelectionPreferences,
    };
    use crate::storage::MemoryStore;
    use crate::timer::ManualClock;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.borrow_mut().push(notification);
        }
    }

    struct Harness {
        machine: SessionMachine<ManualClock, Pcg64>,
        clock: ManualClock,
        store: MemoryStore,
        notes: Rc<Recorder>,
    }

    fn harness_with(catalog: Catalog, config: SessionConfig) -> Harness {
        let clock = ManualClock::new(1_700_000_000_000);
        let store = MemoryStore::new();
        let notes = Rc::new(Recorder::default());
        let selector = ExerciseSelector::with_rng(
            catalog,
            CompletionHistory::new(),
            SelectionPreferences::default(),
            Pcg64::seed_from_u64(42),
        );
        let machine = SessionMachine::new(config, selector, clock.clone(), notes.clone(), store.clone());
        Harness {
            machine,
            clock,
            store,
            notes,
        }
    }

    fn harness() -> Harness {
        harness_with(
            BuiltinCatalog.load_catalog().unwrap(),
            SessionConfig::from_minutes(25, 5, 15, 4).unwrap(),
        )
    }

    fn office_choice(m: &SessionMachine<ManualClock, Pcg64>) -> String {
        m.pending_choices()
            .and_then(|p| p.office.as_ref())
            .map(|e| e.id.clone())
            .unwrap()
    }

    /// Skip work, confirm a snack, skip the break.
    fn complete_cycle(h: &mut Harness) {
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.machine.skip();
    }

    #[test]
    fn end_to_end_work_break_cycle() {
        let mut h = harness();
        let started = h.machine.toggle_timer();
        assert!(matches!(started[0], Event::TimerStarted { mode: Mode::Work, remaining_secs: 1500, .. }));

        let events = h.machine.skip();
        assert!(events.iter().any(|e| matches!(e, Event::WorkCompleted { .. })));
        let pair = h.machine.pending_choices().unwrap();
        assert_eq!(pair.office.as_ref().unwrap().category, Category::Snack);
        assert!(pair.home.is_some());
        assert_eq!(h.machine.mode(), Mode::Work);

        let id = office_choice(&h.machine);
        let events = h.machine.confirm_exercise(&id);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::ModeChanged { mode: Mode::Break, is_long_break: false, duration_secs: 300, .. }
        )));
        assert_eq!(h.machine.mode(), Mode::Break);
        assert_eq!(h.machine.timer().duration_secs(), 300);
        assert!(h.machine.timer().is_running());
        assert!(h.machine.pending_choices().is_none());

        h.clock.advance_secs(300);
        let events = h.machine.tick();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::BreakCompleted { session_count: 1, .. })));
        assert_eq!(h.machine.session_count(), 1);
        assert_eq!(h.machine.mode(), Mode::Work);
        assert!(!h.machine.timer().is_running());
        assert_eq!(h.machine.timer().remaining_secs(), 1500);

        assert_eq!(
            *h.notes.0.borrow(),
            vec![Notification::WorkComplete, Notification::BreakComplete]
        );
        let sessions = h.store.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].mode, Mode::Work);
        assert_eq!(sessions[1].duration_secs, 300);
        assert_eq!(h.store.exercises().len(), 1);
        assert_eq!(h.store.load_history().len(), 1);
    }

    #[test]
    fn long_break_after_three_completed_sessions() {
        let mut h = harness();
        for _ in 0..2 {
            complete_cycle(&mut h);
        }
        assert_eq!(h.machine.session_count(), 2);
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        assert_eq!(h.machine.mode(), Mode::Break);
        h.machine.skip();

        assert_eq!(h.machine.session_count(), 3);
        h.machine.skip();
        let id = office_choice(&h.machine);
        let events = h.machine.confirm_exercise(&id);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::ModeChanged { is_long_break: true, duration_secs: 900, .. })));
        assert_eq!(h.machine.mode(), Mode::LongBreak);
        assert_eq!(h.machine.state().last_break_mode, Some(Mode::LongBreak));
    }

    #[test]
    fn work_completion_does_not_count_a_session() {
        let mut h = harness();
        h.machine.skip();
        assert_eq!(h.machine.session_count(), 0);
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        assert_eq!(h.machine.session_count(), 0);
        h.machine.skip();
        assert_eq!(h.machine.session_count(), 1);
    }

    #[test]
    fn pending_choice_blocks_timer_intents() {
        let mut h = harness();
        h.machine.skip();
        assert!(h.machine.skip().is_empty());
        assert!(h.machine.toggle_timer().is_empty());
        assert!(h.machine.confirm_exercise("not-in-pair").is_empty());
        assert!(h.machine.pending_choices().is_some());
    }

    #[test]
    fn regenerate_replaces_pending_pair() {
        let mut h = harness();
        assert!(h.machine.regenerate().is_empty());
        h.machine.skip();
        let before = h.machine.pending_choices().cloned().unwrap();
        let events = h.machine.regenerate();
        assert_eq!(events.len(), 1);
        let after = h.machine.pending_choices().cloned().unwrap();
        assert_ne!(before.office, after.office);
        assert_ne!(before.home, after.home);
    }

    #[test]
    fn extension_offered_after_two_seconds_of_break() {
        let mut h = harness();
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);

        h.clock.advance_secs(1);
        assert!(!h
            .machine
            .tick()
            .iter()
            .any(|e| matches!(e, Event::ExtensionCandidates { .. })));
        h.clock.advance_secs(1);
        let events = h.machine.tick();
        let offered = events.iter().find_map(|e| match e {
            Event::ExtensionCandidates { exercises } => Some(exercises.len()),
            _ => None,
        });
        assert_eq!(offered, Some(DEFAULT_EXTENSION_CHOICES));
        assert!(h.machine.state().extension_panel_active);

        // Only once per break.
        h.machine.skip_extension();
        h.clock.advance_secs(5);
        assert!(h.machine.tick().iter().all(|e| matches!(e, Event::Tick { .. })));
        assert!(h.machine.offer_extension().is_empty());
    }

    #[test]
    fn extension_adds_exactly_the_bonus() {
        let mut h = harness();
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.clock.advance_secs(10);
        h.machine.tick();

        let candidate = h.machine.extension_candidates()[0].clone();
        let before = h.machine.timer().remaining_secs();
        assert_eq!(before, 290);

        let events = h.machine.confirm_extension(&candidate.id);
        let granted = events.iter().find_map(|e| match e {
            Event::ExtensionGranted {
                before_secs,
                after_secs,
                bonus_secs,
                ..
            } => Some((*before_secs, *after_secs, *bonus_secs)),
            _ => None,
        });
        let bonus = candidate.break_extension_secs;
        assert_eq!(granted, Some((before, before + bonus, bonus)));
        assert_eq!(h.machine.timer().remaining_secs(), before + bonus);
        assert!(h.machine.timer().is_running());
        assert!(!h.machine.state().extension_panel_active);
        assert!(events.iter().any(|e| matches!(e, Event::ExtensionClosed)));
        assert_eq!(h.store.exercises()[1].bonus_secs, bonus);

        // Elapsed progress survives the extension.
        h.clock.advance_secs(before + bonus);
        h.machine.tick();
        assert_eq!(h.machine.mode(), Mode::Work);
        assert_eq!(h.machine.session_count(), 1);
    }

    #[test]
    fn extension_after_break_elapsed_reopens_last_break() {
        let mut h = harness();
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.clock.advance_secs(3);
        h.machine.tick();
        assert!(h.machine.state().extension_panel_active);

        h.clock.advance_secs(300);
        h.machine.tick();
        assert_eq!(h.machine.mode(), Mode::Work);
        assert_eq!(h.machine.session_count(), 1);
        assert!(h.machine.state().extension_panel_active);

        let candidate = h.machine.extension_candidates()[0].clone();
        let bonus = candidate.break_extension_secs;
        let events = h.machine.confirm_extension(&candidate.id);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::ExtensionGranted { before_secs: 0, after_secs, .. } if *after_secs == bonus
        )));
        assert_eq!(h.machine.mode(), Mode::Break);
        assert_eq!(h.machine.timer().duration_secs(), bonus);
        assert!(h.machine.timer().is_running());

        // The reopened break is a completed break like any other.
        h.clock.advance_secs(bonus);
        let events = h.machine.tick();
        assert!(events.iter().any(|e| matches!(e, Event::BreakCompleted { session_count: 2, .. })));
        assert_eq!(h.machine.mode(), Mode::Work);
        assert_eq!(h.machine.session_count(), 2);
    }

    #[test]
    fn reset_of_reopened_break_restores_configured_length() {
        let mut h = harness();
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.clock.advance_secs(3);
        h.machine.tick();
        h.clock.advance_secs(300);
        h.machine.tick();
        let candidate = h.machine.extension_candidates()[0].clone();
        h.machine.confirm_extension(&candidate.id);
        assert_eq!(h.machine.timer().duration_secs(), candidate.break_extension_secs);

        let events = h.machine.reset();
        assert!(matches!(events[0], Event::TimerReset { mode: Mode::Break, duration_secs: 300, .. }));
        assert!(h.machine.timer().is_untouched());
        // Still the same break, so no second offer.
        assert!(h.machine.offer_extension().is_empty());

        h.machine.toggle_timer();
        h.clock.advance_secs(300);
        h.machine.tick();
        assert_eq!(h.machine.mode(), Mode::Work);
        assert_eq!(h.machine.session_count(), 2);
    }

    #[test]
    fn starting_work_closes_extension_panel() {
        let mut h = harness();
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.clock.advance_secs(2);
        h.machine.tick();
        h.machine.skip();
        assert!(h.machine.state().extension_panel_active);

        let events = h.machine.toggle_timer();
        assert_eq!(events[0], Event::ExtensionClosed);
        assert!(h.machine.extension_candidates().is_empty());
        assert!(h.machine.confirm_extension("ext-yoga-flow").is_empty());
    }

    #[test]
    fn pause_and_resume_excludes_paused_time() {
        let mut h = harness();
        h.machine.toggle_timer();
        h.clock.advance_secs(100);
        h.machine.tick();
        let events = h.machine.toggle_timer();
        assert!(matches!(events[0], Event::TimerPaused { remaining_secs: 1400, .. }));

        h.clock.advance_secs(3600);
        h.machine.toggle_timer();
        h.machine.tick();
        assert_eq!(h.machine.timer().remaining_secs(), 1400);
    }

    #[test]
    fn reset_keeps_mode_and_count() {
        let mut h = harness();
        complete_cycle(&mut h);
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.clock.advance_secs(60);
        h.machine.tick();

        let events = h.machine.reset();
        assert!(matches!(events[0], Event::TimerReset { mode: Mode::Break, duration_secs: 300, .. }));
        assert_eq!(h.machine.mode(), Mode::Break);
        assert_eq!(h.machine.session_count(), 1);
        assert!(h.machine.timer().is_untouched());
    }

    #[test]
    fn reset_drops_pending_choice() {
        let mut h = harness();
        h.machine.skip();
        h.machine.reset();
        assert!(h.machine.pending_choices().is_none());
        assert_eq!(h.machine.timer().remaining_secs(), 1500);
        assert!(h.machine.selector().current_pair().is_none());
    }

    #[test]
    fn empty_catalog_goes_straight_to_break() {
        let mut h = harness_with(Catalog::default(), SessionConfig::default());
        let events = h.machine.skip();
        assert!(events.iter().any(|e| matches!(e, Event::ExerciseChoices { pair } if pair.is_empty())));
        assert_eq!(h.machine.mode(), Mode::Break);
        assert!(h.machine.timer().is_running());

        h.clock.advance_secs(5);
        h.machine.tick();
        assert!(!h.machine.state().extension_panel_active);
        assert!(h.machine.state().break_extension_offered);
    }

    #[test]
    fn apply_settings_resizes_untouched_timer_only() {
        let mut h = harness();
        let settings = Settings {
            work_duration: 50,
            ..Default::default()
        };
        let events = h.machine.apply_settings(&settings).unwrap();
        assert!(matches!(events[0], Event::TimerReset { duration_secs: 3000, .. }));
        assert_eq!(h.machine.timer().duration_secs(), 3000);
        assert_eq!(h.store.load_settings().work_duration, 50);
        assert_eq!(*h.notes.0.borrow(), vec![Notification::GenericTick]);

        h.machine.toggle_timer();
        let settings = Settings {
            work_duration: 10,
            ..Default::default()
        };
        assert!(h.machine.apply_settings(&settings).unwrap().is_empty());
        assert_eq!(h.machine.timer().duration_secs(), 3000);
        assert_eq!(h.machine.config().work.get(), 600);

        let bad = Settings {
            sessions_before_long_break: 0,
            ..Default::default()
        };
        assert!(h.machine.apply_settings(&bad).is_err());
        assert_eq!(h.machine.config().work.get(), 600);
    }

    #[test]
    fn session_in_cycle_wraps() {
        let mut h = harness();
        assert_eq!(h.machine.session_in_cycle(), (1, 4));
        for _ in 0..4 {
            complete_cycle(&mut h);
        }
        assert_eq!(h.machine.session_in_cycle(), (1, 4));
        complete_cycle(&mut h);
        assert_eq!(h.machine.session_in_cycle(), (2, 4));
    }

    #[test]
    fn restore_resumes_running_break() {
        let mut h = harness();
        complete_cycle(&mut h);
        h.machine.skip();
        let id = office_choice(&h.machine);
        h.machine.confirm_exercise(&id);
        h.clock.advance_secs(10);
        h.machine.tick();
        let snapshot = h.machine.snapshot();

        let mut fresh = harness();
        fresh.clock.set_ms(h.clock.now_ms() + 60_000);
        let events = fresh.machine.restore(&snapshot, SNAPSHOT_MAX_AGE_MS);
        assert!(matches!(events[0], Event::ModeChanged { mode: Mode::Break, .. }));
        assert_eq!(fresh.machine.mode(), Mode::Break);
        assert_eq!(fresh.machine.session_count(), 1);
        assert_eq!(fresh.machine.timer().remaining_secs(), 230);
        assert!(fresh.machine.timer().is_running());
    }

    #[test]
    fn stale_restore_keeps_only_counters() {
        let mut h = harness();
        complete_cycle(&mut h);
        complete_cycle(&mut h);
        h.machine.toggle_timer();
        let snapshot = h.machine.snapshot();

        let mut fresh = harness();
        fresh.clock.set_ms(h.clock.now_ms() + SNAPSHOT_MAX_AGE_MS + 1);
        assert!(fresh.machine.restore(&snapshot, SNAPSHOT_MAX_AGE_MS).is_empty());
        assert_eq!(fresh.machine.session_count(), 2);
        assert_eq!(fresh.machine.mode(), Mode::Work);
        assert!(fresh.machine.timer().is_untouched());
    }

    #[test]
    fn restore_of_finished_work_presents_choices() {
        let mut h = harness();
        h.machine.skip();
        let snapshot = h.machine.snapshot();

        let mut fresh = harness();
        fresh.clock.set_ms(h.clock.now_ms());
        let events = fresh.machine.restore(&snapshot, SNAPSHOT_MAX_AGE_MS);
        assert!(events.iter().any(|e| matches!(e, Event::ExerciseChoices { .. })));
        assert!(fresh.machine.pending_choices().is_some());
        // The interval was already recorded by the previous run.
        assert!(fresh.store.sessions().is_empty());
    }
}
