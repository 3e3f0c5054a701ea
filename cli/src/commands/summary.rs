use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use streak_core::LocalDate;
use streak_core::stats::StatsReport;

use super::helpers::{Tracker, parse_date};

pub(crate) fn cmd_stats(tracker: &Tracker, date: Option<String>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct TrendRow {
        #[tabled(rename = "Habit")]
        name: String,
        #[tabled(rename = "Streak")]
        streak: u32,
        #[tabled(rename = "Rate")]
        rate: String,
        #[tabled(rename = "Trend")]
        trend: String,
    }

    let date = parse_date(date)?;
    let views = tracker.try_habits_for_date(date)?;
    let report = StatsReport::from_views(&views);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if views.is_empty() {
        eprintln!("No habits for {date}");
        process::exit(2);
    }

    let s = &report.summary;
    let (done, total, rate) = (s.completed_today, s.total_habits, s.completion_rate);
    println!("=== {date} ===\n");
    println!("  Completed: {done}/{total} ({rate}%)");
    let avg = s.average_streak;
    println!("  Average streak: {avg} days");
    if let Some(best) = &s.most_consistent_habit {
        println!("  Most consistent: {best}");
    }
    if !s.needs_attention.is_empty() {
        let names = s.needs_attention.join(", ");
        println!("  Needs attention: {names}");
    }

    println!("\n  By category:");
    for c in &report.categories {
        let (category, done, total) = (c.category, c.completed, c.total);
        println!("    {category:<10} {done}/{total}");
    }
    println!();

    let rows: Vec<TrendRow> = report
        .trends
        .iter()
        .map(|t| TrendRow {
            name: t.name.clone(),
            streak: t.streak,
            rate: format!("{}%", t.rate),
            trend: t.trend.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_history(tracker: &Tracker, days: u32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Done")]
        done: String,
        #[tabled(rename = "Bar")]
        bar: String,
    }

    let summaries = tracker.try_day_summaries(LocalDate::today(), days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.iter().all(|s| s.completed == 0) {
        eprintln!("No completions in the last {days} days");
        process::exit(2);
    }

    let rows: Vec<HistoryRow> = summaries
        .iter()
        .map(|s| HistoryRow {
            date: s.date.to_string(),
            done: format!("{}/{}", s.completed, s.total),
            bar: "█".repeat(s.completed) + &"░".repeat(s.total - s.completed),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
