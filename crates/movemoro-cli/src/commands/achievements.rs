use chrono::Local;
use movemoro_core::achievements;
use movemoro_core::storage::Database;
use movemoro_core::{Achievement, Stats};
use serde::Serialize;

#[derive(Serialize)]
struct AchievementView {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: achievements::AchievementCategory,
    unlocked: bool,
}

/// Unlocks anything newly earned, then lists every achievement.
pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = Stats::from_records(&db.sessions()?, &db.exercises()?, &Local::now());
    achievements::unlock_new(&db, &stats)?;
    let unlocked = achievements::load_unlocked(&db)?;

    let views: Vec<AchievementView> = Achievement::ALL
        .into_iter()
        .map(|a| AchievementView {
            id: a.id(),
            name: a.name(),
            description: a.description(),
            category: a.category(),
            unlocked: unlocked.contains(&a),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    println!("{}/{} unlocked", unlocked.len(), Achievement::ALL.len());
    for view in &views {
        let mark = if view.unlocked { "x" } else { " " };
        println!("[{mark}] {:<20} {}", view.name, view.description);
    }
    Ok(())
}
