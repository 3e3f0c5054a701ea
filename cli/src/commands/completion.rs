use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use streak_core::models::{GoalType, HabitView};

use super::helpers::{Tracker, check_mark, parse_date, require_habit, truncate};

#[derive(Tabled)]
struct HabitRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "")]
    done: &'static str,
    #[tabled(rename = "Habit")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Streak")]
    streak: u32,
}

fn print_views(views: &[HabitView]) {
    let rows: Vec<HabitRow> = views
        .iter()
        .map(|v| HabitRow {
            id: v.id(),
            done: check_mark(v.is_completed_today),
            name: truncate(format!("{} {}", v.habit.display_icon(), v.name()).trim_start(), 32),
            category: truncate(&v.habit.category, 16),
            progress: v.progress_label(),
            streak: v.streak,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_list(
    tracker: &Tracker,
    date: Option<String>,
    all: bool,
    json: bool,
) -> Result<()> {
    if all {
        let habits = tracker.habits().list(true)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&habits)?);
            return Ok(());
        }
        for h in &habits {
            let status = if h.is_active { "" } else { " [archived]" };
            println!(
                "  [{}] {} {} ({}, {}){status}",
                h.id,
                h.display_icon(),
                h.name,
                h.goal_type,
                h.category
            );
        }
        return Ok(());
    }

    let board = tracker.load_board(parse_date(date)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    if board.habits.is_empty() {
        let date = board.date;
        eprintln!("No habits for {date}. Add one with `streak add <name>`");
        process::exit(2);
    }

    let date = board.date;
    let done = board.habits.iter().filter(|h| h.is_completed_today).count();
    let total = board.habits.len();
    println!("=== {date} ({done}/{total} done) ===\n");
    print_views(&board.habits);
    Ok(())
}

fn report(view: &HabitView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        let id = view.id();
        let name = view.name();
        let progress = view.progress_label();
        let streak = view.streak;
        let status = if view.is_completed_today {
            "complete"
        } else {
            "not complete"
        };
        println!("[{id}] {name}: {progress} ({status}, streak {streak})");
    }
    Ok(())
}

pub(crate) fn cmd_toggle(
    tracker: &Tracker,
    habit_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    require_habit(tracker, habit_id, json)?;
    let date = parse_date(date)?;
    tracker.try_habit_on(habit_id, date)?;
    let mut board = tracker.load_board(date);

    if board.get(habit_id).is_some() {
        if !tracker.toggle_on_board(&mut board, habit_id) {
            bail!("Failed to toggle habit {habit_id}");
        }
        if let Some(view) = board.get(habit_id) {
            return report(view, json);
        }
    } else {
        // Archived
        tracker.try_toggle_completion(habit_id, date)?;
    }
    report(&tracker.try_habit_view(habit_id, date)?, json)
}

pub(crate) fn cmd_inc(
    tracker: &Tracker,
    habit_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    require_habit(tracker, habit_id, json)?;
    let date = parse_date(date)?;
    let habit = tracker.try_habit_on(habit_id, date)?;
    if habit.goal_type != GoalType::Count {
        eprintln!("Note: habit {habit_id} is a {} habit; counting anyway", habit.goal_type);
    }
    tracker.ledger().try_increment_count(habit_id, date)?;
    report(&tracker.try_habit_view(habit_id, date)?, json)
}

pub(crate) fn cmd_dec(
    tracker: &Tracker,
    habit_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    require_habit(tracker, habit_id, json)?;
    let date = parse_date(date)?;
    let habit = tracker.try_habit_on(habit_id, date)?;
    if habit.goal_type != GoalType::Count {
        let goal = habit.goal_type;
        eprintln!("Note: habit {habit_id} is a {goal} habit; only its count is touched");
    }
    tracker.ledger().try_decrement_count(habit_id, date)?;
    report(&tracker.try_habit_view(habit_id, date)?, json)
}

pub(crate) fn cmd_time(
    tracker: &Tracker,
    habit_id: i64,
    minutes: u32,
    date: Option<String>,
    notes: Option<&str>,
    json: bool,
) -> Result<()> {
    require_habit(tracker, habit_id, json)?;
    let date = parse_date(date)?;
    let habit = tracker.try_habit_on(habit_id, date)?;
    if habit.goal_type != GoalType::Time {
        eprintln!("Note: habit {habit_id} is a {} habit; recording time anyway", habit.goal_type);
    }
    if minutes == 0 {
        tracker.ledger().try_unmark_completed(habit_id, date)?;
    } else {
        tracker.ledger().try_record_time(habit_id, minutes, date, notes)?;
    }
    report(&tracker.try_habit_view(habit_id, date)?, json)
}

pub(crate) fn cmd_log(tracker: &Tracker, habit_id: i64, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct CompletionRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Count")]
        count: String,
        #[tabled(rename = "Minutes")]
        minutes: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    require_habit(tracker, habit_id, json)?;
    let history = tracker.try_habit_history(habit_id, streak_core::LocalDate::today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    let name = &history.habit.name;
    let current = history.current_streak;
    let longest = history.longest_streak;
    let total = history.total_days;
    println!("=== {name} ===");
    println!("  Current streak: {current} | Longest: {longest} | Days logged: {total}\n");

    if history.completions.is_empty() {
        println!("  No completions yet");
        return Ok(());
    }

    let rows: Vec<CompletionRow> = history
        .completions
        .iter()
        .map(|c| CompletionRow {
            date: c.date.to_string(),
            count: c.count.map_or("-".into(), |n| n.to_string()),
            minutes: c.time_minutes.map_or("-".into(), |n| n.to_string()),
            notes: c.notes.as_deref().map(|n| truncate(n, 40)).unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
