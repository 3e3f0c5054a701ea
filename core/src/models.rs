use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::date::LocalDate;
use crate::error::{StorageError, ValidationError};
use crate::storage::Row;

pub const DEFAULT_CATEGORY: &str = "General";
pub const MAX_ICON_CHARS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    #[default]
    Binary,
    Count,
    Time,
}

impl GoalType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::Binary => "binary",
            GoalType::Count => "count",
            GoalType::Time => "time",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" => Ok(GoalType::Binary),
            "count" => Ok(GoalType::Count),
            "time" => Ok(GoalType::Time),
            _ => Err(ValidationError::UnknownGoalType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_emoji: Option<String>,
    pub goal_type: GoalType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time_minutes: Option<u32>,
    pub reminder_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Habit {
    pub(crate) const COLUMNS: &'static str = "id, name, icon, category, custom_emoji, goal_type, \
         target_count, target_time_minutes, reminder_enabled, reminder_time, is_active, \
         created_at, updated_at";

    pub(crate) fn from_row(row: &Row) -> Result<Self, StorageError> {
        let goal_type = row
            .text("goal_type")?
            .parse()
            .map_err(|_| StorageError::TypeMismatch {
                column: "goal_type".to_string(),
                expected: "binary, count, or time",
            })?;
        Ok(Habit {
            id: row.i64("id")?,
            name: row.text("name")?,
            icon: row.opt_text("icon")?.unwrap_or_default(),
            category: row
                .opt_text("category")?
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            custom_emoji: row.opt_text("custom_emoji")?,
            goal_type,
            target_count: row.opt_u32("target_count")?,
            target_time_minutes: row.opt_u32("target_time_minutes")?,
            reminder_enabled: row.bool("reminder_enabled")?,
            reminder_time: row.opt_text("reminder_time")?,
            is_active: row.bool("is_active")?,
            created_at: row.text("created_at")?,
            updated_at: row.text("updated_at")?,
        })
    }

    /// Local calendar day the habit came into existence.
    #[must_use]
    pub fn created_on(&self) -> Option<LocalDate> {
        LocalDate::from_timestamp(&self.created_at)
    }

    /// Whether the habit belongs in a view for `date`. Habits with an
    /// unreadable `created_at` are treated as having always existed.
    #[must_use]
    pub fn exists_on(&self, date: LocalDate) -> bool {
        self.created_on().is_none_or(|created| created <= date)
    }

    /// The glyph to display: the custom emoji when set, else the icon.
    #[must_use]
    pub fn display_icon(&self) -> &str {
        self.custom_emoji
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.icon)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewHabit {
    pub name: String,
    pub icon: String,
    pub category: Option<String>,
    pub custom_emoji: Option<String>,
    pub goal_type: GoalType,
    pub target_count: Option<u32>,
    pub target_time_minutes: Option<u32>,
    pub reminder_enabled: bool,
    pub reminder_time: Option<String>,
    /// Backdate creation; `None` means now.
    pub created_on: Option<LocalDate>,
}

impl NewHabit {
    #[must_use]
    pub fn binary(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn count(name: &str, target: u32) -> Self {
        Self {
            name: name.to_string(),
            goal_type: GoalType::Count,
            target_count: Some(target),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn time(name: &str, minutes: u32) -> Self {
        Self {
            name: name.to_string(),
            goal_type: GoalType::Time,
            target_time_minutes: Some(minutes),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn created_on(mut self, date: LocalDate) -> Self {
        self.created_on = Some(date);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_habit_fields(&HabitFields {
            name: &self.name,
            icon: &self.icon,
            custom_emoji: self.custom_emoji.as_deref(),
            goal_type: self.goal_type,
            target_count: self.target_count,
            target_time_minutes: self.target_time_minutes,
            reminder_enabled: self.reminder_enabled,
            reminder_time: self.reminder_time.as_deref(),
        })
    }
}

/// Partial update. `Option<Option<_>>` fields distinguish "leave alone" from
/// "clear".
#[derive(Debug, Clone, Default)]
pub struct UpdateHabit {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub custom_emoji: Option<Option<String>>,
    pub goal_type: Option<GoalType>,
    pub target_count: Option<Option<u32>>,
    pub target_time_minutes: Option<Option<u32>>,
    pub reminder_enabled: Option<bool>,
    pub reminder_time: Option<Option<String>>,
}

impl UpdateHabit {
    /// Apply onto an existing habit, normalising the goal-conditional targets.
    pub fn apply(&self, habit: &Habit) -> Result<Habit, ValidationError> {
        let mut updated = habit.clone();
        if let Some(name) = &self.name {
            updated.name.clone_from(name);
        }
        if let Some(icon) = &self.icon {
            updated.icon.clone_from(icon);
        }
        if let Some(category) = &self.category {
            updated.category.clone_from(category);
        }
        if let Some(emoji) = &self.custom_emoji {
            updated.custom_emoji.clone_from(emoji);
        }
        if let Some(goal_type) = self.goal_type {
            updated.goal_type = goal_type;
        }
        if let Some(target) = self.target_count {
            updated.target_count = target;
        }
        if let Some(minutes) = self.target_time_minutes {
            updated.target_time_minutes = minutes;
        }
        if let Some(enabled) = self.reminder_enabled {
            updated.reminder_enabled = enabled;
        }
        if let Some(time) = &self.reminder_time {
            updated.reminder_time.clone_from(time);
        }

        validate_habit_fields(&HabitFields {
            name: &updated.name,
            icon: &updated.icon,
            custom_emoji: updated.custom_emoji.as_deref(),
            goal_type: updated.goal_type,
            target_count: updated.target_count,
            target_time_minutes: updated.target_time_minutes,
            reminder_enabled: updated.reminder_enabled,
            reminder_time: updated.reminder_time.as_deref(),
        })?;

        updated.name = updated.name.trim().to_string();
        let (target_count, target_time) =
            normalize_targets(updated.goal_type, updated.target_count, updated.target_time_minutes);
        updated.target_count = target_count;
        updated.target_time_minutes = target_time;
        Ok(updated)
    }
}

struct HabitFields<'a> {
    name: &'a str,
    icon: &'a str,
    custom_emoji: Option<&'a str>,
    goal_type: GoalType,
    target_count: Option<u32>,
    target_time_minutes: Option<u32>,
    reminder_enabled: bool,
    reminder_time: Option<&'a str>,
}

fn validate_habit_fields(fields: &HabitFields<'_>) -> Result<(), ValidationError> {
    if fields.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let too_long = |s: &str| s.chars().count() > MAX_ICON_CHARS;
    if too_long(fields.icon) || fields.custom_emoji.is_some_and(too_long) {
        return Err(ValidationError::IconTooLong {
            max: MAX_ICON_CHARS,
        });
    }
    match fields.goal_type {
        GoalType::Binary => {}
        GoalType::Count => {
            if !fields.target_count.is_some_and(|t| t > 0) {
                return Err(ValidationError::MissingTargetCount);
            }
        }
        GoalType::Time => {
            if !fields.target_time_minutes.is_some_and(|t| t > 0) {
                return Err(ValidationError::MissingTargetTime);
            }
        }
    }
    if fields.reminder_enabled {
        let time = fields.reminder_time.unwrap_or_default();
        validate_reminder_time(time)?;
    }
    Ok(())
}

pub fn validate_reminder_time(time: &str) -> Result<(), ValidationError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidReminderTime(time.to_string()))
}

/// Targets only survive for the goal type they belong to.
#[must_use]
pub fn normalize_targets(
    goal_type: GoalType,
    target_count: Option<u32>,
    target_time_minutes: Option<u32>,
) -> (Option<u32>, Option<u32>) {
    match goal_type {
        GoalType::Binary => (None, None),
        GoalType::Count => (target_count, None),
        GoalType::Time => (None, target_time_minutes),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub id: i64,
    pub habit_id: i64,
    pub date: LocalDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completed_at: String,
}

impl Completion {
    pub(crate) const COLUMNS: &'static str =
        "id, habit_id, date, count, time_minutes, notes, completed_at";

    pub(crate) fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Completion {
            id: row.i64("id")?,
            habit_id: row.i64("habit_id")?,
            date: row.date("date")?,
            count: row.opt_u32("count")?,
            time_minutes: row.opt_u32("time_minutes")?,
            notes: row.opt_text("notes")?,
            completed_at: row.text("completed_at")?,
        })
    }
}

/// A habit joined with one day's completion state. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    pub is_completed_today: bool,
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_target_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_minutes: Option<u32>,
}

impl HabitView {
    #[must_use]
    pub fn id(&self) -> i64 {
        self.habit.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.habit.name
    }

    /// Short progress label, e.g. `5/8` or `20/30 min`.
    #[must_use]
    pub fn progress_label(&self) -> String {
        match self.habit.goal_type {
            GoalType::Binary => {
                let label = if self.is_completed_today { "done" } else { "-" };
                label.to_string()
            }
            GoalType::Count => format!(
                "{}/{}",
                self.current_count.unwrap_or(0),
                self.resolved_target_count.unwrap_or(1)
            ),
            GoalType::Time => format!(
                "{}/{} min",
                self.time_minutes.unwrap_or(0),
                self.habit.target_time_minutes.unwrap_or(0)
            ),
        }
    }
}

/// Completed/total habits for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: LocalDate,
    pub total: usize,
    pub completed: usize,
}

/// Everything the CLI shows for a single habit's history.
#[derive(Debug, Clone, Serialize)]
pub struct HabitHistory {
    pub habit: Habit,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_days: usize,
    pub completions: Vec<Completion>,
}
