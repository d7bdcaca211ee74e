use clap::Subcommand;
use movemoro_core::exercise::{Category, Environment, Exercise, ExerciseSelector};
use movemoro_core::storage::{FileStore, Store};

use super::{catalog_source, format_secs, parse_enum};

#[derive(Subcommand)]
pub enum ExercisesAction {
    /// List catalog exercises
    List {
        /// Only this category (snack, extension)
        #[arg(long, value_parser = parse_enum::<Category>)]
        category: Option<Category>,
        /// Only this environment (office, home)
        #[arg(long, value_parser = parse_enum::<Environment>)]
        environment: Option<Environment>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one exercise
    Show {
        /// Exercise id
        id: String,
    },
    /// Pick a snack pair the way the timer would, without recording it
    Suggest {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ExercisesAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open()?;
    let settings = store.load_settings();
    let catalog = catalog_source(&settings).load_catalog()?;

    match action {
        ExercisesAction::List {
            category,
            environment,
            json,
        } => {
            let listed: Vec<&Exercise> = catalog
                .exercises()
                .iter()
                .filter(|e| category.map_or(true, |c| e.category == c))
                .filter(|e| environment.map_or(true, |env| e.environment == env))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                for exercise in listed {
                    println!(
                        "{:<24} {:<9} {:<6} {:<6} {}",
                        exercise.id,
                        exercise.category,
                        exercise.environment,
                        exercise.difficulty,
                        exercise.name
                    );
                }
            }
        }
        ExercisesAction::Show { id } => {
            let exercise = catalog.get(&id).ok_or_else(|| format!("unknown exercise: {id}"))?;
            print_exercise(exercise);
        }
        ExercisesAction::Suggest { json } => {
            let mut selector =
                ExerciseSelector::new(catalog, store.load_history(), settings.exercise_preferences);
            let pair = selector.select_snack_pair();
            if json {
                println!("{}", serde_json::to_string_pretty(&pair)?);
            } else if pair.is_empty() {
                println!("no exercises match the current preferences");
            } else {
                for exercise in pair.iter() {
                    print_exercise(exercise);
                    println!();
                }
            }
        }
    }
    Ok(())
}

fn print_exercise(exercise: &Exercise) {
    println!("{} ({})", exercise.name, exercise.id);
    println!(
        "  {} / {} / {}, about {}",
        exercise.category,
        exercise.environment,
        exercise.difficulty,
        format_secs(exercise.duration_secs)
    );
    if exercise.break_extension_secs > 0 {
        println!("  extends a break by {}", format_secs(exercise.break_extension_secs));
    }
    if exercise.needs_equipment() {
        let equipment: Vec<&str> = exercise.equipment.iter().map(String::as_str).collect();
        println!("  equipment: {}", equipment.join(", "));
    }
    println!("  {}", exercise.instructions);
}
