use crate::date::{LocalDate, now_timestamp};
use crate::error::{CoreError, Result};
use crate::models::{DEFAULT_CATEGORY, Habit, NewHabit, UpdateHabit, normalize_targets};
use crate::storage::Storage;

/// Habit definitions: create, edit, soft delete, reactivate, purge.
///
/// Validation happens before any write. Deleting something that isn't there
/// is a successful no-op.
pub struct HabitRepository<S> {
    storage: S,
}

impl<S: Storage> HabitRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn insert(&self, habit: &NewHabit) -> Result<Habit> {
        habit.validate()?;

        let now = now_timestamp();
        let created_at = habit
            .created_on
            .map_or_else(|| now.clone(), LocalDate::start_of_day_timestamp);
        let (target_count, target_time) = normalize_targets(
            habit.goal_type,
            habit.target_count,
            habit.target_time_minutes,
        );
        let category = habit
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        let exec = self.storage.execute(
            "INSERT INTO habits (name, icon, category, custom_emoji, goal_type, target_count,
                target_time_minutes, reminder_enabled, reminder_time, is_active,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)",
            &[
                habit.name.trim().into(),
                habit.icon.as_str().into(),
                category.into(),
                habit.custom_emoji.clone().into(),
                habit.goal_type.as_str().into(),
                target_count.into(),
                target_time.into(),
                habit.reminder_enabled.into(),
                habit.reminder_time.clone().into(),
                created_at.into(),
                now.into(),
            ],
        )?;
        tracing::debug!(
            habit_id = exec.last_insert_id,
            goal_type = %habit.goal_type,
            "habit created"
        );
        self.get(exec.last_insert_id)
    }

    pub fn get(&self, id: i64) -> Result<Habit> {
        self.find(id)?.ok_or(CoreError::NotFound(id))
    }

    pub fn find(&self, id: i64) -> Result<Option<Habit>> {
        let sql = format!("SELECT {} FROM habits WHERE id = ?1", Habit::COLUMNS);
        let row = self.storage.query_one(&sql, &[id.into()])?;
        Ok(row.as_ref().map(Habit::from_row).transpose()?)
    }

    /// Habits in insertion (`id`) order, which stats tie-breaks follow.
    pub fn list(&self, include_inactive: bool) -> Result<Vec<Habit>> {
        let filter = if include_inactive {
            ""
        } else {
            "WHERE is_active = 1"
        };
        let sql = format!(
            "SELECT {} FROM habits {filter} ORDER BY id",
            Habit::COLUMNS
        );
        let rows = self.storage.query_all(&sql, &[])?;
        Ok(rows
            .iter()
            .map(Habit::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update(&self, id: i64, update: &UpdateHabit) -> Result<Habit> {
        let existing = self.get(id)?;
        let habit = update.apply(&existing)?;

        self.storage.execute(
            "UPDATE habits SET name = ?1, icon = ?2, category = ?3, custom_emoji = ?4,
                goal_type = ?5, target_count = ?6, target_time_minutes = ?7,
                reminder_enabled = ?8, reminder_time = ?9, updated_at = ?10
             WHERE id = ?11",
            &[
                habit.name.as_str().into(),
                habit.icon.as_str().into(),
                habit.category.as_str().into(),
                habit.custom_emoji.clone().into(),
                habit.goal_type.as_str().into(),
                habit.target_count.into(),
                habit.target_time_minutes.into(),
                habit.reminder_enabled.into(),
                habit.reminder_time.clone().into(),
                now_timestamp().into(),
                id.into(),
            ],
        )?;
        self.get(id)
    }

    /// Flip the soft-delete flag. Returns whether a row matched.
    pub fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let exec = self.storage.execute(
            "UPDATE habits SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            &[active.into(), now_timestamp().into(), id.into()],
        )?;
        Ok(exec.changes > 0)
    }

    /// Hard delete. Completions go with it via `ON DELETE CASCADE`.
    pub fn purge(&self, id: i64) -> Result<bool> {
        let exec = self
            .storage
            .execute("DELETE FROM habits WHERE id = ?1", &[id.into()])?;
        Ok(exec.changes > 0)
    }
}
