use anyhow::{Context, Result};
use serde::Serialize;
use std::process;

use streak_core::LocalDate;
use streak_core::db::Database;
use streak_core::models::Habit;
use streak_core::tracker::HabitTracker;

pub(crate) type Tracker = HabitTracker<Database>;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<LocalDate> {
    let today = LocalDate::today();
    match date_str {
        None => Ok(today),
        Some(s) => match s.as_str() {
            "today" => Ok(today),
            "yesterday" => today.sub_days(1).context("Date out of range"),
            "tomorrow" => today.add_days(1).context("Date out of range"),
            _ => s.parse::<LocalDate>().with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Look up a habit, or report it missing and exit with status 2.
pub(crate) fn require_habit(tracker: &Tracker, habit_id: i64, json: bool) -> Result<Habit> {
    if let Some(habit) = tracker.habits().find(habit_id)? {
        return Ok(habit);
    }
    if json {
        println!("{}", json_error(&format!("Habit {habit_id} not found")));
    } else {
        eprintln!("Habit {habit_id} not found");
    }
    process::exit(2);
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn check_mark(done: bool) -> &'static str {
    if done { "✓" } else { " " }
}
