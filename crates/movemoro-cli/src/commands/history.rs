use chrono::{DateTime, Local, Utc};
use movemoro_core::storage::{Database, ExerciseRecord, SessionRecord};
use serde::Serialize;

use super::format_secs;

#[derive(Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum Entry {
    Session(SessionRecord),
    Exercise(ExerciseRecord),
}

impl Entry {
    fn completed_at(&self) -> DateTime<Utc> {
        match self {
            Entry::Session(s) => s.completed_at,
            Entry::Exercise(e) => e.completed_at,
        }
    }
}

pub fn run(limit: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut entries: Vec<Entry> = db
        .sessions()?
        .into_iter()
        .map(Entry::Session)
        .chain(db.exercises()?.into_iter().map(Entry::Exercise))
        .collect();
    // Newest first.
    entries.sort_by_key(|e| std::cmp::Reverse(e.completed_at()));
    entries.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("no history yet");
        return Ok(());
    }
    for entry in &entries {
        let at = entry.completed_at().with_timezone(&Local).format("%Y-%m-%d %H:%M");
        match entry {
            Entry::Session(s) => {
                println!("{at}  {:<10} {}", s.mode.to_string(), format_secs(s.duration_secs));
            }
            Entry::Exercise(e) if e.bonus_secs > 0 => {
                println!("{at}  {:<10} {} (+{})", e.kind.to_string(), e.name, format_secs(e.bonus_secs));
            }
            Entry::Exercise(e) => {
                println!("{at}  {:<10} {}", e.kind.to_string(), e.name);
            }
        }
    }
    Ok(())
}
