use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use chrono::Local;
use clap::Args;
use movemoro_core::exercise::{Catalog, ExerciseSelector};
use movemoro_core::notify::{LogNotifier, Notification, Notifier};
use movemoro_core::session::{SessionConfig, SessionMachine, SNAPSHOT_MAX_AGE_MS};
use movemoro_core::storage::{FileStore, Store};
use movemoro_core::timer::CHECK_INTERVAL_MS;
use movemoro_core::{achievements, Event, Stats};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{catalog_source, format_secs};

const HELP: &str = "\
  t        start / pause
  s        skip to the end of the current interval
  r        reset the current interval
  1, 2     do the office / home exercise
  g        show a different pair
  e        offer extension exercises (break only)
  x<N>     do extension exercise N
  n        no extension
  status   show the current session
  h        this help
  q        save and quit";

#[derive(Args)]
pub struct RunArgs {
    /// Work interval in minutes, for this run only
    #[arg(long)]
    work: Option<u32>,
    /// Short break in minutes, for this run only
    #[arg(long = "break")]
    break_minutes: Option<u32>,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Toggle,
    Skip,
    Reset,
    Choose(usize),
    Regenerate,
    OfferExtension,
    Extend(usize),
    NoExtension,
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Option<Input> {
        let line = line.trim().to_lowercase();
        let input = match line.as_str() {
            "" => return None,
            "t" | "toggle" => Input::Toggle,
            "s" | "skip" => Input::Skip,
            "r" | "reset" => Input::Reset,
            "1" => Input::Choose(0),
            "2" => Input::Choose(1),
            "g" | "regenerate" => Input::Regenerate,
            "e" | "extend" => Input::OfferExtension,
            "n" | "no" => Input::NoExtension,
            "status" => Input::Status,
            "h" | "help" | "?" => Input::Help,
            "q" | "quit" | "exit" => Input::Quit,
            other => match other.strip_prefix('x').map(str::parse::<usize>) {
                Some(Ok(n)) if n > 0 => Input::Extend(n - 1),
                _ => Input::Unknown(other.to_string()),
            },
        };
        Some(input)
    }
}

/// Rings the terminal bell on stderr so JSON output stays clean.
struct BellNotifier {
    audio_enabled: bool,
    log: LogNotifier,
}

impl Notifier for BellNotifier {
    fn notify(&self, notification: Notification) {
        self.log.notify(notification);
        if self.audio_enabled && notification != Notification::GenericTick {
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all(b"\x07");
            let _ = stderr.flush();
        }
    }
}

struct Printer {
    json: bool,
}

impl Printer {
    fn events(&self, events: &[Event]) {
        for event in events {
            if self.json {
                match serde_json::to_string(event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                }
            } else {
                self.text(event);
            }
        }
    }

    fn text(&self, event: &Event) {
        match event {
            Event::Tick { remaining_secs, .. } => {
                print!("\r  {}  ", format_secs(*remaining_secs));
                let _ = std::io::stdout().flush();
            }
            Event::ModeChanged {
                mode,
                is_long_break,
                duration_secs,
                ..
            } => {
                let suffix = if *is_long_break { " (long)" } else { "" };
                println!("\n{}{suffix}: {}", mode.label(), format_secs(*duration_secs));
            }
            Event::TimerStarted { remaining_secs, .. } => {
                println!("\nstarted, {} left", format_secs(*remaining_secs));
            }
            Event::TimerPaused { remaining_secs, .. } => {
                println!("\npaused at {}", format_secs(*remaining_secs));
            }
            Event::TimerReset { duration_secs, .. } => {
                println!("\nreset to {}", format_secs(*duration_secs));
            }
            Event::WorkCompleted { worked_secs, .. } => {
                println!("\nwork done after {}", format_secs(*worked_secs));
            }
            Event::ExerciseChoices { pair } => {
                if pair.is_empty() {
                    println!("no exercises available, enjoy your break");
                    return;
                }
                println!("pick one to unlock your break (g for others):");
                for (key, exercise) in [("1", &pair.office), ("2", &pair.home)] {
                    if let Some(exercise) = exercise {
                        println!("  [{key}] {} ({}): {}", exercise.name, exercise.environment, exercise.instructions);
                    }
                }
            }
            Event::ExerciseCompleted { name, .. } => println!("done: {name}"),
            Event::ExtensionCandidates { exercises } => {
                println!("want a longer break? (n to skip)");
                for (i, exercise) in exercises.iter().enumerate() {
                    println!(
                        "  [x{}] {} (+{}): {}",
                        i + 1,
                        exercise.name,
                        format_secs(exercise.break_extension_secs),
                        exercise.instructions
                    );
                }
            }
            Event::ExtensionGranted {
                before_secs,
                after_secs,
                ..
            } => {
                println!("break extended {} -> {}", format_secs(*before_secs), format_secs(*after_secs));
            }
            Event::ExtensionClosed => {}
            Event::BreakCompleted { session_count, .. } => {
                println!("\nbreak over, {session_count} sessions done. t to start working");
            }
        }
    }

    fn note(&self, message: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "type": "note", "message": message }));
        } else {
            println!("\n{message}");
        }
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = Rc::new(FileStore::open()?);
    let mut settings = store.load_settings();
    let printer = Printer { json: args.json };

    if !settings.has_seen_welcome {
        if !args.json {
            println!("Welcome to Movemoro. Every break starts with a short exercise.");
            println!("{HELP}");
        }
        settings.has_seen_welcome = true;
        store.save_settings(&settings);
    }

    let mut effective = settings.clone();
    if let Some(work) = args.work {
        effective.work_duration = work;
    }
    if let Some(minutes) = args.break_minutes {
        effective.break_duration = minutes;
    }
    let config = SessionConfig::try_from(&effective)?;

    let catalog = Catalog::load_or_empty(catalog_source(&settings).as_ref());
    let selector = ExerciseSelector::new(catalog, store.load_history(), settings.exercise_preferences.clone());
    let notifier = BellNotifier {
        audio_enabled: settings.audio_enabled,
        log: LogNotifier,
    };
    let mut machine = SessionMachine::new(config, selector, movemoro_core::SystemClock, notifier, store.clone());

    if let Some(snapshot) = store.load_session() {
        let events = machine.restore(&snapshot, SNAPSHOT_MAX_AGE_MS);
        if events.is_empty() {
            // Too old to resume; only the counters were carried over.
            store.clear_session();
        }
        printer.events(&events);
    }
    print_status(&machine, &printer);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(event_loop(&mut machine, &printer))?;

    store.save_session(&machine.snapshot());
    let db = store.database();
    let stats = Stats::from_records(&db.sessions()?, &db.exercises()?, &Local::now());
    for achievement in achievements::unlock_new(db, &stats)? {
        printer.note(&format!("achievement unlocked: {} ({})", achievement.name(), achievement.description()));
    }
    Ok(())
}

async fn event_loop(
    machine: &mut SessionMachine,
    printer: &Printer,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval(Duration::from_millis(CHECK_INTERVAL_MS));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                printer.events(&machine.tick());
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed");
                    break;
                };
                let Some(input) = Input::parse(&line) else {
                    continue;
                };
                if input == Input::Quit {
                    break;
                }
                handle(machine, printer, input);
            }
        }
    }
    Ok(())
}

fn handle(machine: &mut SessionMachine, printer: &Printer, input: Input) {
    let events = match input {
        Input::Toggle => machine.toggle_timer(),
        Input::Skip => machine.skip(),
        Input::Reset => machine.reset(),
        Input::Choose(side) => {
            let id = machine.pending_choices().and_then(|pair| {
                let exercise = if side == 0 { &pair.office } else { &pair.home };
                exercise.as_ref().map(|e| e.id.clone())
            });
            match id {
                Some(id) => machine.confirm_exercise(&id),
                None => {
                    printer.note("nothing to choose right now");
                    return;
                }
            }
        }
        Input::Regenerate => machine.regenerate(),
        Input::OfferExtension => machine.offer_extension(),
        Input::Extend(index) => match machine.extension_candidates().get(index).map(|e| e.id.clone()) {
            Some(id) => machine.confirm_extension(&id),
            None => {
                printer.note("no such extension exercise");
                return;
            }
        },
        Input::NoExtension => machine.skip_extension(),
        Input::Status => {
            print_status(machine, printer);
            return;
        }
        Input::Help => {
            printer.note(HELP);
            return;
        }
        Input::Unknown(other) => {
            printer.note(&format!("unknown command '{other}', h for help"));
            return;
        }
        Input::Quit => return,
    };
    printer.events(&events);
}

fn print_status(machine: &SessionMachine, printer: &Printer) {
    let (session, of) = machine.session_in_cycle();
    let timer = machine.timer();
    let state = if timer.is_running() {
        "running"
    } else if timer.is_completed() {
        "done"
    } else {
        "paused"
    };
    if printer.json {
        println!(
            "{}",
            serde_json::json!({
                "type": "status",
                "mode": machine.mode(),
                "session": session,
                "sessions_before_long_break": of,
                "remaining_secs": timer.remaining_secs(),
                "state": state,
            })
        );
    } else {
        println!(
            "{} {session}/{of}: {} {state}",
            machine.mode().label(),
            format_secs(timer.remaining_secs())
        );
    }
}
