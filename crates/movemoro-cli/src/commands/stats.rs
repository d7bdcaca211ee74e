use chrono::Local;
use movemoro_core::storage::Database;
use movemoro_core::Stats;

use super::format_secs;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = Stats::from_records(&db.sessions()?, &db.exercises()?, &Local::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("today:      {} sessions, {} focused", stats.today_sessions, format_secs(stats.today_focus_secs));
    println!("all time:   {} sessions, {:.1} h focused", stats.total_sessions, stats.total_focus_hours());
    println!("best day:   {} sessions", stats.best_day_sessions);
    println!("breaks:     {}", format_secs(stats.total_break_secs));
    println!(
        "exercises:  {} done, {} different",
        stats.exercises_completed, stats.unique_exercises
    );
    println!(
        "extensions: {} granted, {} bonus",
        stats.extensions_granted,
        format_secs(stats.bonus_break_secs)
    );
    Ok(())
}
