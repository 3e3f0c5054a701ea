use anyhow::{Result, bail};
use clap::Args;

use streak_core::models::{GoalType, Habit, NewHabit, UpdateHabit};

use super::helpers::{Tracker, parse_date, require_habit};

/// Definition fields shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
pub(crate) struct HabitOptions {
    /// Display icon (e.g. "📚")
    #[arg(long)]
    pub icon: Option<String>,
    /// Custom emoji, shown instead of the icon
    #[arg(long)]
    pub emoji: Option<String>,
    /// Category label (default: General)
    #[arg(short, long)]
    pub category: Option<String>,
    /// Goal type: binary, count, time (inferred from --target/--minutes when omitted)
    #[arg(short, long)]
    pub goal: Option<GoalType>,
    /// Daily target for count goals
    #[arg(short, long)]
    pub target: Option<u32>,
    /// Daily target in minutes for time goals
    #[arg(short, long)]
    pub minutes: Option<u32>,
    /// Enable a daily reminder at HH:MM
    #[arg(long, value_name = "HH:MM")]
    pub reminder: Option<String>,
}

impl HabitOptions {
    fn inferred_goal(&self) -> GoalType {
        match (self.goal, self.target, self.minutes) {
            (Some(goal), _, _) => goal,
            (None, Some(_), _) => GoalType::Count,
            (None, None, Some(_)) => GoalType::Time,
            (None, None, None) => GoalType::Binary,
        }
    }

    fn is_empty(&self) -> bool {
        self.icon.is_none()
            && self.emoji.is_none()
            && self.category.is_none()
            && self.goal.is_none()
            && self.target.is_none()
            && self.minutes.is_none()
            && self.reminder.is_none()
    }
}

fn describe_goal(habit: &Habit) -> String {
    match habit.goal_type {
        GoalType::Binary => "daily".to_string(),
        GoalType::Count => format!("{}x daily", habit.target_count.unwrap_or(1)),
        GoalType::Time => format!("{} min daily", habit.target_time_minutes.unwrap_or(0)),
    }
}

pub(crate) fn cmd_add(
    tracker: &Tracker,
    name: &str,
    opts: HabitOptions,
    since: Option<String>,
    json: bool,
) -> Result<()> {
    let goal_type = opts.inferred_goal();
    let mut habit = NewHabit {
        name: name.to_string(),
        icon: opts.icon.unwrap_or_default(),
        category: opts.category,
        custom_emoji: opts.emoji,
        goal_type,
        target_count: opts.target,
        target_time_minutes: opts.minutes,
        reminder_enabled: opts.reminder.is_some(),
        reminder_time: opts.reminder,
        created_on: None,
    };
    if since.is_some() {
        habit.created_on = Some(parse_date(since)?);
    }

    let Some(created) = tracker.add_habit(&habit)? else {
        bail!("Failed to add habit '{name}'");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        let id = created.id;
        let icon = created.display_icon();
        let name = &created.name;
        let goal = describe_goal(&created);
        println!("Added habit {id}: {icon} {name} ({goal})");
        if let Some(time) = &created.reminder_time {
            println!("  Reminder at {time}");
        }
    }

    Ok(())
}

pub(crate) fn cmd_edit(
    tracker: &Tracker,
    habit_id: i64,
    name: Option<String>,
    opts: HabitOptions,
    no_reminder: bool,
    json: bool,
) -> Result<()> {
    if name.is_none() && opts.is_empty() && !no_reminder {
        bail!("Nothing to update. Provide at least one of --name, --icon, --goal, --target, ...");
    }
    require_habit(tracker, habit_id, json)?;

    let (reminder_enabled, reminder_time) = match (opts.reminder, no_reminder) {
        (Some(_), true) => bail!("--reminder and --no-reminder conflict"),
        (Some(time), false) => (Some(true), Some(Some(time))),
        (None, true) => (Some(false), Some(None)),
        (None, false) => (None, None),
    };
    let update = UpdateHabit {
        name,
        icon: opts.icon,
        category: opts.category,
        custom_emoji: opts.emoji.map(|e| Some(e).filter(|e| !e.is_empty())),
        goal_type: opts.goal,
        target_count: opts.target.map(Some),
        target_time_minutes: opts.minutes.map(Some),
        reminder_enabled,
        reminder_time,
    };

    if !tracker.update_habit(habit_id, &update)? {
        bail!("Failed to update habit {habit_id}");
    }
    let habit = tracker.habits().get(habit_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&habit)?);
    } else {
        let icon = habit.display_icon();
        let name = &habit.name;
        let goal = describe_goal(&habit);
        println!("Updated habit {habit_id}: {icon} {name} ({goal})");
    }

    Ok(())
}

pub(crate) fn cmd_archive(tracker: &Tracker, habit_id: i64, json: bool) -> Result<()> {
    let habit = require_habit(tracker, habit_id, json)?;
    if !tracker.delete_habit(habit_id) {
        bail!("Failed to archive habit {habit_id}");
    }

    if json {
        println!("{}", serde_json::json!({ "archived": habit_id }));
    } else {
        let name = &habit.name;
        println!("Archived habit {habit_id}: {name} (history kept)");
        println!("  Undo with `streak restore {habit_id}`");
    }
    Ok(())
}

pub(crate) fn cmd_restore(tracker: &Tracker, habit_id: i64, json: bool) -> Result<()> {
    let habit = require_habit(tracker, habit_id, json)?;
    if !tracker.reactivate_habit(habit_id) {
        bail!("Failed to restore habit {habit_id}");
    }

    if json {
        println!("{}", serde_json::json!({ "restored": habit_id }));
    } else {
        let name = &habit.name;
        println!("Restored habit {habit_id}: {name}");
    }
    Ok(())
}

pub(crate) fn cmd_remove(tracker: &Tracker, habit_id: i64, json: bool) -> Result<()> {
    let habit = require_habit(tracker, habit_id, json)?;
    let completions = tracker.ledger().try_get_all_for_habit(habit_id)?.len();
    if !tracker.purge_habit(habit_id) {
        bail!("Failed to delete habit {habit_id}");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": habit_id, "completions": completions }));
    } else {
        let name = &habit.name;
        println!("Deleted habit {habit_id}: {name} and {completions} completion(s)");
    }
    Ok(())
}
