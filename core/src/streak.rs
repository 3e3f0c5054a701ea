use crate::date::LocalDate;
use crate::error::Result;
use crate::ledger::CompletionLedger;
use crate::models::Completion;
use crate::storage::Storage;

/// Consecutive days, ending at `reference` inclusive, on which `habit_id` has a
/// completion row.
///
/// A day counts when a row exists, whether or not a count or time goal was
/// met that day. Walks back one day per query and stops at the first gap.
pub fn try_current_streak<S: Storage>(
    ledger: &CompletionLedger<S>,
    habit_id: i64,
    reference: LocalDate,
) -> Result<u32> {
    let mut streak = 0_u32;
    let mut i = 0_i64;
    while let Some(date) = reference.sub_days(i) {
        let completions = ledger.try_get_for_date(date)?;
        if !completions.iter().any(|c| c.habit_id == habit_id) {
            break;
        }
        streak += 1;
        i += 1;
    }
    Ok(streak)
}

/// Sentinel form of [`try_current_streak`]: 0 on storage failure.
pub fn current_streak<S: Storage>(
    ledger: &CompletionLedger<S>,
    habit_id: i64,
    reference: LocalDate,
) -> u32 {
    try_current_streak(ledger, habit_id, reference).unwrap_or_else(|e| {
        tracing::warn!(error = %e, habit_id, %reference, "failed to compute streak");
        0
    })
}

/// Longest run of consecutive dates anywhere in a habit's history.
///
/// Input order doesn't matter; duplicate dates are ignored.
#[must_use]
pub fn longest_streak(completions: &[Completion]) -> u32 {
    let mut dates: Vec<LocalDate> = completions.iter().map(|c| c.date).collect();
    dates.sort_unstable();
    dates.dedup();

    let mut best = 0_u32;
    let mut run = 0_u32;
    let mut prev: Option<LocalDate> = None;
    for date in dates {
        run = match prev {
            Some(p) if p.add_days(1) == Some(date) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }
    best
}
