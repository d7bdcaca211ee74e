//! Property tests for the drift-corrected timer.
//!
//! The clock is advanced in arbitrary, irregular steps to stand in for a
//! host that checks late, early or not at all for a while.

use movemoro_core::timer::{ManualClock, TimerEngine, TimerEvent, TimerState};
use proptest::prelude::*;

const START_MS: u64 = 1_700_000_000_000;

fn run_to_completion(duration: u64, steps: &[u64]) -> (Vec<TimerEvent>, TimerEngine<ManualClock>) {
    let clock = ManualClock::new(START_MS);
    let mut timer = TimerEngine::new(duration, clock.clone()).unwrap();
    let mut events = timer.start();
    let mut i = 0;
    while !timer.is_completed() {
        clock.advance_ms(steps[i % steps.len()]);
        events.extend(timer.tick());
        i += 1;
    }
    // Checks after completion must stay silent.
    clock.advance_ms(10_000);
    events.extend(timer.tick());
    (events, timer)
}

proptest! {
    #[test]
    fn completes_exactly_once(duration in 1u64..600, steps in prop::collection::vec(100u64..5_000, 1..20)) {
        let (events, timer) = run_to_completion(duration, &steps);
        let completions = events.iter().filter(|e| **e == TimerEvent::Completed).count();
        prop_assert_eq!(completions, 1);
        prop_assert_eq!(timer.remaining_secs(), 0);
        prop_assert_eq!(timer.state(), TimerState::Completed);
        prop_assert_eq!(events.last(), Some(&TimerEvent::Completed));
    }

    #[test]
    fn ticks_are_strictly_decreasing(duration in 1u64..600, steps in prop::collection::vec(50u64..3_000, 1..20)) {
        let (events, _) = run_to_completion(duration, &steps);
        let ticks: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Tick { remaining_secs } => Some(*remaining_secs),
                TimerEvent::Completed => None,
            })
            .collect();
        prop_assert!(ticks.windows(2).all(|w| w[0] > w[1]), "ticks {:?}", ticks);
        prop_assert_eq!(ticks.last().copied(), Some(0));
        prop_assert!(ticks.iter().all(|&t| t < duration));
    }

    #[test]
    fn remaining_matches_wall_clock(duration in 1u64..3_600, elapsed_ms in 0u64..4_000_000) {
        let clock = ManualClock::new(START_MS);
        let mut timer = TimerEngine::new(duration, clock.clone()).unwrap();
        timer.start();
        clock.advance_ms(elapsed_ms);
        timer.tick();
        prop_assert_eq!(timer.remaining_secs(), duration.saturating_sub(elapsed_ms / 1000));
        let progress = timer.progress();
        prop_assert!((0.0..=1.0).contains(&progress));
    }

    #[test]
    fn pause_excludes_paused_time(
        duration in 10u64..3_600,
        before_ms in 0u64..9_000,
        paused_ms in 0u64..10_000_000,
        after_ms in 0u64..1_000,
    ) {
        let clock = ManualClock::new(START_MS);
        let mut timer = TimerEngine::new(duration, clock.clone()).unwrap();
        timer.start();
        clock.advance_ms(before_ms);
        timer.tick();
        timer.pause();
        let frozen = timer.remaining_secs();

        clock.advance_ms(paused_ms);
        timer.tick();
        prop_assert_eq!(timer.remaining_secs(), frozen);

        timer.start();
        clock.advance_ms(after_ms);
        timer.tick();
        // Within one tick of the frozen value.
        prop_assert!(frozen - timer.remaining_secs() <= 1);
    }

    #[test]
    fn extend_adds_exactly_the_bonus(duration in 60u64..1_800, elapsed in 0u64..59, bonus in 0u64..600) {
        let clock = ManualClock::new(START_MS);
        let mut timer = TimerEngine::new(duration, clock.clone()).unwrap();
        timer.start();
        clock.advance_secs(elapsed);
        timer.tick();
        let before = timer.remaining_secs();

        let (extension, _) = timer.extend(bonus);
        prop_assert_eq!(extension.before_secs, before);
        prop_assert_eq!(extension.after_secs, before + bonus);
        prop_assert_eq!(timer.remaining_secs(), before + bonus);
        prop_assert!(timer.is_running());

        clock.advance_secs(1);
        timer.tick();
        prop_assert_eq!(timer.remaining_secs(), before + bonus - 1);
    }
}

#[test]
fn zero_duration_is_rejected() {
    assert!(TimerEngine::new(0, ManualClock::new(START_MS)).is_err());
}

#[test]
fn backwards_clock_never_adds_time() {
    let clock = ManualClock::new(START_MS);
    let mut timer = TimerEngine::new(60, clock.clone()).unwrap();
    timer.start();
    clock.advance_secs(30);
    timer.tick();
    clock.set_ms(START_MS - 60_000);
    assert!(timer.tick().is_empty());
    assert_eq!(timer.remaining_secs(), 30);
}
