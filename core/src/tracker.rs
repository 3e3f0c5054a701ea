use std::collections::HashMap;
use std::path::Path;

use crate::date::LocalDate;
use crate::db::Database;
use crate::error::{CoreError, Result, ValidationError};
use crate::habits::HabitRepository;
use crate::ledger::CompletionLedger;
use crate::models::{
    Completion, DaySummary, GoalType, Habit, HabitHistory, HabitView, NewHabit, UpdateHabit,
};
use crate::storage::Storage;
use crate::streak;

/// Build the view of one habit for one day.
///
/// `completion` must be the habit's row for that day, if any.
#[must_use]
pub fn compose_view(habit: Habit, completion: Option<&Completion>, streak: u32) -> HabitView {
    let current_count = completion.and_then(|c| c.count).filter(|&n| n > 0);
    let time_minutes = completion.and_then(|c| c.time_minutes).filter(|&n| n > 0);
    let resolved_target_count = match habit.goal_type {
        GoalType::Count => Some(habit.target_count.unwrap_or(1)),
        _ => habit.target_count,
    };
    let is_completed_today = match habit.goal_type {
        GoalType::Binary => completion.is_some(),
        GoalType::Count => current_count.unwrap_or(0) >= resolved_target_count.unwrap_or(1),
        GoalType::Time => match habit.target_time_minutes {
            Some(target) => time_minutes.unwrap_or(0) >= target,
            None => false,
        },
    };
    HabitView {
        habit,
        is_completed_today,
        streak,
        current_count,
        resolved_target_count,
        time_minutes,
    }
}

/// The habit list a caller has loaded for one day.
///
/// Owned by the caller and passed in explicitly; the tracker only touches it
/// after a write has been confirmed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HabitBoard {
    pub date: LocalDate,
    pub habits: Vec<HabitView>,
}

impl HabitBoard {
    #[must_use]
    pub fn get(&self, habit_id: i64) -> Option<&HabitView> {
        self.habits.iter().find(|h| h.id() == habit_id)
    }

    fn replace(&mut self, view: HabitView) {
        if let Some(slot) = self.habits.iter_mut().find(|h| h.id() == view.id()) {
            *slot = view;
        }
    }
}

/// Joins habit definitions with a day's completions and streaks, and runs the
/// user-facing mutations.
pub struct HabitTracker<S> {
    storage: S,
}

impl HabitTracker<Database> {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }
}

impl<S: Storage> HabitTracker<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn ledger(&self) -> CompletionLedger<&S> {
        CompletionLedger::new(&self.storage)
    }

    #[must_use]
    pub fn habits(&self) -> HabitRepository<&S> {
        HabitRepository::new(&self.storage)
    }

    // --- Views ---

    fn view_with(
        &self,
        habit: Habit,
        completion: Option<&Completion>,
        date: LocalDate,
    ) -> Result<HabitView> {
        let streak = streak::try_current_streak(&self.ledger(), habit.id, date)?;
        Ok(compose_view(habit, completion, streak))
    }

    /// Active habits that existed on `date`, with that day's state.
    pub fn try_habits_for_date(&self, date: LocalDate) -> Result<Vec<HabitView>> {
        let habits = self.habits().list(false)?;
        let mut by_habit: HashMap<i64, Completion> = self
            .ledger()
            .try_get_for_date(date)?
            .into_iter()
            .map(|c| (c.habit_id, c))
            .collect();

        let mut views = Vec::new();
        for habit in habits.into_iter().filter(|h| h.exists_on(date)) {
            let completion = by_habit.remove(&habit.id);
            views.push(self.view_with(habit, completion.as_ref(), date)?);
        }
        Ok(views)
    }

    pub fn habits_for_date(&self, date: LocalDate) -> Vec<HabitView> {
        self.try_habits_for_date(date).unwrap_or_else(|e| {
            tracing::warn!(error = %e, %date, "failed to load habits for date");
            Vec::new()
        })
    }

    /// The habit, provided it already existed on `date`. Every date-scoped
    /// read and write goes through here.
    pub fn try_habit_on(&self, habit_id: i64, date: LocalDate) -> Result<Habit> {
        let habit = self.habits().get(habit_id)?;
        if !habit.exists_on(date) {
            return Err(CoreError::BeforeCreation { habit_id, date });
        }
        Ok(habit)
    }

    /// View of a single habit on `date`, regardless of whether it is active.
    /// Fails for dates before the habit was created.
    pub fn try_habit_view(&self, habit_id: i64, date: LocalDate) -> Result<HabitView> {
        let habit = self.try_habit_on(habit_id, date)?;
        let completion = self.ledger().try_get(habit_id, date)?;
        self.view_with(habit, completion.as_ref(), date)
    }

    pub fn load_board(&self, date: LocalDate) -> HabitBoard {
        HabitBoard {
            date,
            habits: self.habits_for_date(date),
        }
    }

    // --- Toggle ---

    /// The primary mutation. Binary habits flip; count habits step up by one
    /// until the target, then reset to nothing; time habits jump to the target
    /// or clear.
    pub fn try_toggle_completion(&self, habit_id: i64, date: LocalDate) -> Result<()> {
        let view = self.try_habit_view(habit_id, date)?;
        let ledger = self.ledger();
        match view.habit.goal_type {
            GoalType::Binary => {
                if view.is_completed_today {
                    ledger.try_unmark_completed(habit_id, date)?;
                } else {
                    ledger.try_mark_completed(habit_id, date)?;
                }
            }
            GoalType::Count => {
                let current = view.current_count.unwrap_or(0);
                let target = view.resolved_target_count.unwrap_or(1);
                if current >= target {
                    // Reset, not decrement
                    ledger.try_unmark_completed(habit_id, date)?;
                } else {
                    ledger.try_increment_count(habit_id, date)?;
                }
            }
            GoalType::Time => {
                if view.is_completed_today {
                    ledger.try_unmark_completed(habit_id, date)?;
                } else {
                    let target = view.habit.target_time_minutes.unwrap_or(0);
                    let notes = ledger.try_get(habit_id, date)?.and_then(|c| c.notes);
                    ledger.try_record_time(habit_id, target, date, notes.as_deref())?;
                }
            }
        }
        tracing::debug!(habit_id, %date, goal_type = %view.habit.goal_type, "toggled completion");
        Ok(())
    }

    pub fn toggle_completion(&self, habit_id: i64, date: LocalDate) -> bool {
        self.try_toggle_completion(habit_id, date)
            .inspect_err(|e| {
                tracing::warn!(error = %e, habit_id, %date, "failed to toggle completion");
            })
            .is_ok()
    }

    /// Toggle and, only once the write has landed, refresh that habit on the
    /// caller's board.
    pub fn toggle_on_board(&self, board: &mut HabitBoard, habit_id: i64) -> bool {
        if !self.toggle_completion(habit_id, board.date) {
            return false;
        }
        match self.try_habit_view(habit_id, board.date) {
            Ok(view) => board.replace(view),
            Err(e) => {
                tracing::warn!(error = %e, habit_id, "toggle succeeded but refresh failed");
            }
        }
        true
    }

    // --- Habit CRUD ---

    /// `Err` for validation failures (nothing written), `Ok(None)` when storage
    /// failed.
    pub fn add_habit(&self, habit: &NewHabit) -> Result<Option<Habit>, ValidationError> {
        match self.habits().insert(habit) {
            Ok(h) => Ok(Some(h)),
            Err(CoreError::Validation(e)) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "failed to add habit");
                Ok(None)
            }
        }
    }

    /// `Ok(false)` when the habit doesn't exist or storage failed.
    pub fn update_habit(
        &self,
        habit_id: i64,
        update: &UpdateHabit,
    ) -> Result<bool, ValidationError> {
        match self.habits().update(habit_id, update) {
            Ok(_) => Ok(true),
            Err(CoreError::Validation(e)) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, habit_id, "failed to update habit");
                Ok(false)
            }
        }
    }

    /// Soft delete. Completions are kept; a missing habit is a no-op success.
    pub fn delete_habit(&self, habit_id: i64) -> bool {
        self.habits()
            .set_active(habit_id, false)
            .inspect_err(|e| tracing::warn!(error = %e, habit_id, "failed to delete habit"))
            .is_ok()
    }

    pub fn reactivate_habit(&self, habit_id: i64) -> bool {
        self.habits()
            .set_active(habit_id, true)
            .inspect_err(|e| tracing::warn!(error = %e, habit_id, "failed to reactivate habit"))
            .is_ok()
    }

    /// Hard delete with cascade. A missing habit is a no-op success.
    pub fn purge_habit(&self, habit_id: i64) -> bool {
        self.habits()
            .purge(habit_id)
            .inspect_err(|e| tracing::warn!(error = %e, habit_id, "failed to purge habit"))
            .is_ok()
    }

    // --- History ---

    pub fn try_habit_history(&self, habit_id: i64, today: LocalDate) -> Result<HabitHistory> {
        let habit = self.habits().get(habit_id)?;
        let ledger = self.ledger();
        let completions = ledger.try_get_all_for_habit(habit_id)?;
        let current = streak::try_current_streak(&ledger, habit_id, today)?;
        Ok(HabitHistory {
            habit,
            current_streak: current,
            longest_streak: streak::longest_streak(&completions),
            total_days: completions.len(),
            completions,
        })
    }

    /// Completed/total for each of the `days` days ending at `end`, newest first.
    pub fn try_day_summaries(&self, end: LocalDate, days: u32) -> Result<Vec<DaySummary>> {
        let habits = self.habits().list(false)?;
        let ledger = self.ledger();
        let mut summaries = Vec::with_capacity(days as usize);
        for i in 0..i64::from(days) {
            let Some(date) = end.sub_days(i) else { break };
            let views: Vec<HabitView> = {
                let by_habit: HashMap<i64, Completion> = ledger
                    .try_get_for_date(date)?
                    .into_iter()
                    .map(|c| (c.habit_id, c))
                    .collect();
                habits
                    .iter()
                    .filter(|h| h.exists_on(date))
                    .map(|h| compose_view(h.clone(), by_habit.get(&h.id), 0))
                    .collect()
            };
            summaries.push(DaySummary {
                date,
                total: views.len(),
                completed: views.iter().filter(|v| v.is_completed_today).count(),
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStorage, date};

    fn tracker() -> HabitTracker<Database> {
        HabitTracker::open_in_memory().unwrap()
    }

    fn add(tracker: &HabitTracker<Database>, habit: NewHabit) -> Habit {
        tracker.add_habit(&habit).unwrap().unwrap()
    }

    fn view(tracker: &HabitTracker<Database>, id: i64, day: LocalDate) -> HabitView {
        tracker.try_habit_view(id, day).unwrap()
    }

    #[test]
    fn test_compose_view_binary() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch"));
        let completion = Completion {
            id: 1,
            habit_id: habit.id,
            date: date(2024, 1, 5),
            count: Some(3),
            time_minutes: None,
            notes: None,
            completed_at: String::new(),
        };

        let done = compose_view(habit.clone(), Some(&completion), 4);
        assert!(done.is_completed_today);
        assert_eq!(done.streak, 4);
        assert_eq!(done.current_count, Some(3));
        assert_eq!(done.resolved_target_count, None);

        let not_done = compose_view(habit, None, 0);
        assert!(!not_done.is_completed_today);
        assert_eq!(not_done.current_count, None);
    }

    #[test]
    fn test_compose_view_count_defaults_target_to_one() {
        let t = tracker();
        let mut habit = add(&t, NewHabit::count("Water", 8));
        habit.target_count = None;
        let v = compose_view(habit, None, 0);
        assert_eq!(v.resolved_target_count, Some(1));
        assert!(!v.is_completed_today);
    }

    #[test]
    fn test_compose_view_zero_count_is_absent() {
        let t = tracker();
        let habit = add(&t, NewHabit::count("Water", 8));
        let completion = Completion {
            id: 1,
            habit_id: habit.id,
            date: date(2024, 1, 5),
            count: Some(0),
            time_minutes: None,
            notes: None,
            completed_at: String::new(),
        };
        let v = compose_view(habit, Some(&completion), 1);
        assert_eq!(v.current_count, None);
        assert!(!v.is_completed_today);
    }

    #[test]
    fn test_habits_for_date_excludes_future_and_inactive() {
        let t = tracker();
        let early = add(&t, NewHabit::binary("Early").created_on(date(2024, 1, 1)));
        let late = add(&t, NewHabit::binary("Late").created_on(date(2024, 1, 10)));
        let gone = add(&t, NewHabit::binary("Gone").created_on(date(2024, 1, 1)));
        assert!(t.delete_habit(gone.id));

        let ids: Vec<i64> = t
            .habits_for_date(date(2024, 1, 5))
            .iter()
            .map(HabitView::id)
            .collect();
        assert_eq!(ids, vec![early.id]);

        let ids: Vec<i64> = t
            .habits_for_date(date(2024, 1, 10))
            .iter()
            .map(HabitView::id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn test_habits_for_date_never_precedes_creation() {
        let t = tracker();
        add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 5)));
        for day in 1..=10 {
            let d = date(2024, 1, day);
            for v in t.habits_for_date(d) {
                assert!(v.habit.created_on().unwrap() <= d);
            }
        }
    }

    #[test]
    fn test_no_view_or_write_before_creation() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 10)));
        let before = date(2024, 1, 5);

        let err = t.try_habit_view(habit.id, before).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BeforeCreation);
        assert!(!t.toggle_completion(habit.id, before));
        assert!(t.ledger().try_get(habit.id, before).unwrap().is_none());
        assert!(t.try_habit_on(habit.id, date(2024, 1, 10)).is_ok());
    }

    #[test]
    fn test_day_before_creation_never_extends_streak() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 10)));

        assert!(!t.toggle_completion(habit.id, date(2024, 1, 9)));
        assert!(t.toggle_completion(habit.id, date(2024, 1, 10)));
        let views = t.habits_for_date(date(2024, 1, 10));
        assert_eq!(views[0].streak, 1);
    }

    #[test]
    fn test_toggle_binary_is_involution() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 1)));
        let day = date(2024, 1, 5);
        let before = view(&t, habit.id, day).is_completed_today;

        assert!(t.toggle_completion(habit.id, day));
        assert_ne!(view(&t, habit.id, day).is_completed_today, before);
        assert!(t.toggle_completion(habit.id, day));
        assert_eq!(view(&t, habit.id, day).is_completed_today, before);
    }

    #[test]
    fn test_count_habit_scenario() {
        let t = tracker();
        let habit = add(&t, NewHabit::count("Water", 8).created_on(date(2024, 1, 1)));
        let today = LocalDate::today();
        let ledger = t.ledger();

        for _ in 0..5 {
            ledger.increment_count(habit.id, today);
        }
        let v = view(&t, habit.id, today);
        assert_eq!(v.current_count, Some(5));
        assert!(!v.is_completed_today);

        for _ in 0..3 {
            ledger.increment_count(habit.id, today);
        }
        let v = view(&t, habit.id, today);
        assert_eq!(v.current_count, Some(8));
        assert!(v.is_completed_today);

        assert!(t.toggle_completion(habit.id, today));
        let v = view(&t, habit.id, today);
        assert_eq!(v.current_count, None);
        assert!(!v.is_completed_today);
        assert!(ledger.try_get(habit.id, today).unwrap().is_none());
    }

    #[test]
    fn test_toggle_count_below_target_increments_by_one() {
        let t = tracker();
        let habit = add(&t, NewHabit::count("Water", 3).created_on(date(2024, 1, 1)));
        let day = date(2024, 1, 5);

        assert!(t.toggle_completion(habit.id, day));
        assert_eq!(view(&t, habit.id, day).current_count, Some(1));
        assert!(t.toggle_completion(habit.id, day));
        assert!(t.toggle_completion(habit.id, day));
        assert!(view(&t, habit.id, day).is_completed_today);
        // At target: resets rather than stepping down to target - 1
        assert!(t.toggle_completion(habit.id, day));
        assert_eq!(view(&t, habit.id, day).current_count, None);
    }

    #[test]
    fn test_toggle_time_habit() {
        let t = tracker();
        let habit = add(&t, NewHabit::time("Read", 30).created_on(date(2024, 1, 1)));
        let day = date(2024, 1, 5);

        t.ledger().record_time(habit.id, 10, day, Some("slow start")).unwrap();
        assert!(!view(&t, habit.id, day).is_completed_today);

        assert!(t.toggle_completion(habit.id, day));
        let v = view(&t, habit.id, day);
        assert!(v.is_completed_today);
        assert_eq!(v.time_minutes, Some(30));
        let row = t.ledger().try_get(habit.id, day).unwrap().unwrap();
        assert_eq!(row.notes.as_deref(), Some("slow start"));

        assert!(t.toggle_completion(habit.id, day));
        assert!(!view(&t, habit.id, day).is_completed_today);
    }

    #[test]
    fn test_time_completion_threshold() {
        let t = tracker();
        let habit = add(&t, NewHabit::time("Read", 30).created_on(date(2024, 1, 1)));
        let day = date(2024, 1, 5);
        t.ledger().record_time(habit.id, 29, day, None).unwrap();
        assert!(!view(&t, habit.id, day).is_completed_today);
        t.ledger().record_time(habit.id, 30, day, None).unwrap();
        assert!(view(&t, habit.id, day).is_completed_today);
    }

    #[test]
    fn test_toggle_unknown_habit_fails() {
        let t = tracker();
        assert!(!t.toggle_completion(99, date(2024, 1, 5)));
    }

    #[test]
    fn test_view_includes_streak() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 1)));
        for day in 5..=7 {
            t.ledger().mark_completed(habit.id, date(2024, 1, day)).unwrap();
        }
        let views = t.habits_for_date(date(2024, 1, 7));
        assert_eq!(views[0].streak, 3);
        assert!(views[0].is_completed_today);
        let views = t.habits_for_date(date(2024, 1, 4));
        assert_eq!(views[0].streak, 0);
        assert!(!views[0].is_completed_today);
    }

    #[test]
    fn test_toggle_on_board_updates_after_success() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 1)));
        let mut board = t.load_board(date(2024, 1, 5));
        assert!(!board.get(habit.id).unwrap().is_completed_today);

        assert!(t.toggle_on_board(&mut board, habit.id));
        let v = board.get(habit.id).unwrap();
        assert!(v.is_completed_today);
        assert_eq!(v.streak, 1);
    }

    #[test]
    fn test_toggle_on_board_untouched_on_failure() {
        let t = HabitTracker::new(FailingStorage);
        let habit = Habit {
            id: 1,
            name: "Stretch".to_string(),
            icon: String::new(),
            category: "General".to_string(),
            custom_emoji: None,
            goal_type: GoalType::Binary,
            target_count: None,
            target_time_minutes: None,
            reminder_enabled: false,
            reminder_time: None,
            is_active: true,
            created_at: "2024-01-01T00:00:00".to_string(),
            updated_at: "2024-01-01T00:00:00".to_string(),
        };
        let mut board = HabitBoard {
            date: date(2024, 1, 5),
            habits: vec![compose_view(habit, None, 0)],
        };
        let before = board.clone();

        assert!(!t.toggle_on_board(&mut board, 1));
        assert_eq!(board, before);
    }

    #[test]
    fn test_add_habit_validation_vs_storage() {
        let t = tracker();
        assert_eq!(
            t.add_habit(&NewHabit::binary(" ")),
            Err(ValidationError::EmptyName)
        );

        let broken = HabitTracker::new(FailingStorage);
        assert_eq!(broken.add_habit(&NewHabit::binary("Stretch")), Ok(None));
        assert_eq!(
            broken.add_habit(&NewHabit::count("Water", 0)),
            Err(ValidationError::MissingTargetCount)
        );
    }

    #[test]
    fn test_update_habit() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch"));
        let update = UpdateHabit {
            category: Some("Wellness".to_string()),
            ..UpdateHabit::default()
        };
        assert_eq!(t.update_habit(habit.id, &update), Ok(true));
        assert_eq!(t.habits().get(habit.id).unwrap().category, "Wellness");
        assert_eq!(t.update_habit(404, &update), Ok(false));
    }

    #[test]
    fn test_delete_missing_habit_is_success() {
        let t = tracker();
        assert!(t.delete_habit(404));
        assert!(t.purge_habit(404));
    }

    #[test]
    fn test_reactivated_habit_reappears() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 1)));
        t.ledger().mark_completed(habit.id, date(2024, 1, 5)).unwrap();
        assert!(t.delete_habit(habit.id));
        assert!(t.habits_for_date(date(2024, 1, 5)).is_empty());

        assert!(t.reactivate_habit(habit.id));
        let views = t.habits_for_date(date(2024, 1, 5));
        assert_eq!(views.len(), 1);
        assert!(views[0].is_completed_today);
    }

    #[test]
    fn test_storage_failure_sentinels() {
        let t = HabitTracker::new(FailingStorage);
        assert!(t.habits_for_date(date(2024, 1, 5)).is_empty());
        assert!(!t.toggle_completion(1, date(2024, 1, 5)));
        assert!(!t.delete_habit(1));
        assert!(!t.purge_habit(1));
        assert!(t.load_board(date(2024, 1, 5)).habits.is_empty());
    }

    #[test]
    fn test_habit_history() {
        let t = tracker();
        let habit = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 1)));
        for day in [1, 2, 3, 6, 7] {
            t.ledger().mark_completed(habit.id, date(2024, 1, day)).unwrap();
        }
        let history = t.try_habit_history(habit.id, date(2024, 1, 7)).unwrap();
        assert_eq!(history.current_streak, 2);
        assert_eq!(history.longest_streak, 3);
        assert_eq!(history.total_days, 5);
        assert_eq!(history.completions[0].date, date(2024, 1, 7));
    }

    #[test]
    fn test_day_summaries() {
        let t = tracker();
        let a = add(&t, NewHabit::binary("Stretch").created_on(date(2024, 1, 1)));
        add(&t, NewHabit::count("Water", 2).created_on(date(2024, 1, 6)));
        t.ledger().mark_completed(a.id, date(2024, 1, 7)).unwrap();
        t.ledger().mark_completed(a.id, date(2024, 1, 5)).unwrap();

        let summaries = t.try_day_summaries(date(2024, 1, 7), 3).unwrap();
        assert_eq!(
            summaries,
            vec![
                DaySummary {
                    date: date(2024, 1, 7),
                    total: 2,
                    completed: 1
                },
                DaySummary {
                    date: date(2024, 1, 6),
                    total: 2,
                    completed: 0
                },
                DaySummary {
                    date: date(2024, 1, 5),
                    total: 1,
                    completed: 1
                },
            ]
        );
    }
}
