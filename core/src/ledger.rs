use crate::date::{LocalDate, now_timestamp};
use crate::error::{CoreError, Result};
use crate::models::Completion;
use crate::storage::Storage;

/// Per-(habit, date) completion rows: the single source of truth for whether a
/// habit registered progress on a day.
///
/// Every mutation comes in two flavours: `try_*` returns the error, the plain
/// name logs it and falls back to a sentinel (`None`, `false`, `0`, or an empty
/// list). Sentinel callers cannot tell "nothing to do" apart from a storage
/// failure.
pub struct CompletionLedger<S> {
    storage: S,
}

impl<S: Storage> CompletionLedger<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn completion_id(&self, habit_id: i64, date: LocalDate) -> Result<Option<i64>> {
        let row = self.storage.query_one(
            "SELECT id FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
            &[habit_id.into(), date.into()],
        )?;
        Ok(row.map(|r| r.i64("id")).transpose()?)
    }

    // --- Fallible operations ---

    /// Insert-or-ignore. Returns the id of the row for `(habit_id, date)`,
    /// whether it was just created or already there.
    pub fn try_mark_completed(&self, habit_id: i64, date: LocalDate) -> Result<i64> {
        let exec = self.storage.execute(
            "INSERT OR IGNORE INTO habit_completions (habit_id, date, completed_at)
             VALUES (?1, ?2, ?3)",
            &[habit_id.into(), date.into(), now_timestamp().into()],
        )?;
        if exec.changes > 0 {
            return Ok(exec.last_insert_id);
        }
        self.completion_id(habit_id, date)?
            .ok_or(CoreError::NotFound(habit_id))
    }

    pub fn try_unmark_completed(&self, habit_id: i64, date: LocalDate) -> Result<()> {
        self.storage.execute(
            "DELETE FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
            &[habit_id.into(), date.into()],
        )?;
        Ok(())
    }

    /// Returns the count after incrementing. A missing row starts at 1; a row
    /// without a count (binary mark) reads as 0.
    pub fn try_increment_count(&self, habit_id: i64, date: LocalDate) -> Result<u32> {
        self.storage.execute(
            "INSERT INTO habit_completions (habit_id, date, count, completed_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(habit_id, date) DO UPDATE SET
                count = COALESCE(habit_completions.count, 0) + 1,
                completed_at = excluded.completed_at",
            &[habit_id.into(), date.into(), now_timestamp().into()],
        )?;
        Ok(self.current_count(habit_id, date)?.unwrap_or(0))
    }

    /// Steps the count down by one. Reaching zero deletes the row outright, so a
    /// zero-count row never exists. A row without a count (a binary mark or
    /// recorded time) is left alone.
    pub fn try_decrement_count(&self, habit_id: i64, date: LocalDate) -> Result<u32> {
        let exec = self.storage.execute(
            "UPDATE habit_completions SET count = count - 1, completed_at = ?3
             WHERE habit_id = ?1 AND date = ?2 AND count > 1",
            &[habit_id.into(), date.into(), now_timestamp().into()],
        )?;
        if exec.changes > 0 {
            return Ok(self.current_count(habit_id, date)?.unwrap_or(0));
        }
        self.storage.execute(
            "DELETE FROM habit_completions
             WHERE habit_id = ?1 AND date = ?2 AND count IS NOT NULL AND count <= 1",
            &[habit_id.into(), date.into()],
        )?;
        Ok(0)
    }

    /// Upsert the minutes (and notes) for a day. Leaves `count` untouched.
    pub fn try_record_time(
        &self,
        habit_id: i64,
        minutes: u32,
        date: LocalDate,
        notes: Option<&str>,
    ) -> Result<i64> {
        self.storage.execute(
            "INSERT INTO habit_completions (habit_id, date, time_minutes, notes, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(habit_id, date) DO UPDATE SET
                time_minutes = excluded.time_minutes,
                notes = excluded.notes,
                completed_at = excluded.completed_at",
            &[
                habit_id.into(),
                date.into(),
                minutes.into(),
                notes.into(),
                now_timestamp().into(),
            ],
        )?;
        self.completion_id(habit_id, date)?
            .ok_or(CoreError::NotFound(habit_id))
    }

    pub fn try_get(&self, habit_id: i64, date: LocalDate) -> Result<Option<Completion>> {
        let sql = format!(
            "SELECT {} FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
            Completion::COLUMNS
        );
        let row = self
            .storage
            .query_one(&sql, &[habit_id.into(), date.into()])?;
        Ok(row.as_ref().map(Completion::from_row).transpose()?)
    }

    pub fn try_get_for_date(&self, date: LocalDate) -> Result<Vec<Completion>> {
        let sql = format!(
            "SELECT {} FROM habit_completions WHERE date = ?1 ORDER BY habit_id",
            Completion::COLUMNS
        );
        let rows = self.storage.query_all(&sql, &[date.into()])?;
        Ok(rows
            .iter()
            .map(Completion::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub fn try_get_all_for_habit(&self, habit_id: i64) -> Result<Vec<Completion>> {
        let sql = format!(
            "SELECT {} FROM habit_completions WHERE habit_id = ?1 ORDER BY date DESC",
            Completion::COLUMNS
        );
        let rows = self.storage.query_all(&sql, &[habit_id.into()])?;
        Ok(rows
            .iter()
            .map(Completion::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    fn current_count(&self, habit_id: i64, date: LocalDate) -> Result<Option<u32>> {
        let row = self.storage.query_one(
            "SELECT count FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
            &[habit_id.into(), date.into()],
        )?;
        match row {
            Some(r) => Ok(r.opt_u32("count")?),
            None => Ok(None),
        }
    }

    // --- Sentinel adapters ---

    /// `None` means the write failed, not "already completed".
    pub fn mark_completed(&self, habit_id: i64, date: LocalDate) -> Option<i64> {
        self.try_mark_completed(habit_id, date)
            .inspect_err(|e| {
                tracing::warn!(error = %e, habit_id, %date, "failed to mark completion");
            })
            .ok()
    }

    pub fn unmark_completed(&self, habit_id: i64, date: LocalDate) -> bool {
        self.try_unmark_completed(habit_id, date)
            .inspect_err(|e| {
                tracing::warn!(error = %e, habit_id, %date, "failed to unmark completion");
            })
            .is_ok()
    }

    pub fn increment_count(&self, habit_id: i64, date: LocalDate) -> u32 {
        self.try_increment_count(habit_id, date)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, habit_id, %date, "failed to increment count");
                0
            })
    }

    pub fn decrement_count(&self, habit_id: i64, date: LocalDate) -> u32 {
        self.try_decrement_count(habit_id, date)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, habit_id, %date, "failed to decrement count");
                0
            })
    }

    pub fn record_time(
        &self,
        habit_id: i64,
        minutes: u32,
        date: LocalDate,
        notes: Option<&str>,
    ) -> Option<i64> {
        self.try_record_time(habit_id, minutes, date, notes)
            .inspect_err(|e| {
                tracing::warn!(error = %e, habit_id, minutes, %date, "failed to record time");
            })
            .ok()
    }

    pub fn get_for_date(&self, date: LocalDate) -> Vec<Completion> {
        self.try_get_for_date(date).unwrap_or_else(|e| {
            tracing::warn!(error = %e, %date, "failed to load completions for date");
            Vec::new()
        })
    }

    pub fn get_all_for_habit(&self, habit_id: i64) -> Vec<Completion> {
        self.try_get_all_for_habit(habit_id).unwrap_or_else(|e| {
            tracing::warn!(error = %e, habit_id, "failed to load completions for habit");
            Vec::new()
        })
    }
}
