//! Cross-habit summaries. Everything here is a pure function of a habit list
//! the caller has already loaded; nothing touches storage.

use std::fmt;

use serde::Serialize;

use crate::models::HabitView;

/// At most this many names are reported as needing attention.
pub const NEEDS_ATTENTION_LIMIT: usize = 3;

/// Streak length that maps to a 100% trend rate.
pub const TREND_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitStats {
    pub total_habits: usize,
    pub completed_today: usize,
    pub completion_rate: u32,
    pub average_streak: u32,
    pub most_consistent_habit: Option<String>,
    pub needs_attention: Vec<String>,
}

/// `round(100 * part / whole)`, 0 when `whole` is 0.
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn rounded_ratio(part: f64, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part / whole as f64).round() as u32
}

#[must_use]
pub fn completion_rate(habits: &[HabitView]) -> u32 {
    let completed = habits.iter().filter(|h| h.is_completed_today).count();
    #[allow(clippy::cast_precision_loss)]
    let scaled = (completed * 100) as f64;
    rounded_ratio(scaled, habits.len())
}

#[must_use]
pub fn average_streak(habits: &[HabitView]) -> u32 {
    let total: u64 = habits.iter().map(|h| u64::from(h.streak)).sum();
    #[allow(clippy::cast_precision_loss)]
    let total = total as f64;
    rounded_ratio(total, habits.len())
}

/// Name of the habit with the longest streak. The first one in list order wins
/// a tie.
#[must_use]
pub fn most_consistent_habit(habits: &[HabitView]) -> Option<&HabitView> {
    habits
        .iter()
        .fold(None, |best: Option<&HabitView>, h| match best {
            Some(b) if b.streak >= h.streak => Some(b),
            _ => Some(h),
        })
}

#[must_use]
pub fn needs_attention(habits: &[HabitView]) -> Vec<String> {
    habits
        .iter()
        .filter(|h| !h.is_completed_today)
        .take(NEEDS_ATTENTION_LIMIT)
        .map(|h| h.name().to_string())
        .collect()
}

#[must_use]
pub fn compute_stats(habits: &[HabitView]) -> HabitStats {
    HabitStats {
        total_habits: habits.len(),
        completed_today: habits.iter().filter(|h| h.is_completed_today).count(),
        completion_rate: completion_rate(habits),
        average_streak: average_streak(habits),
        most_consistent_habit: most_consistent_habit(habits).map(|h| h.name().to_string()),
        needs_attention: needs_attention(habits),
    }
}

// --- Trends ---

/// Streak as a percentage of [`TREND_WINDOW_DAYS`], capped at 100.
///
/// This is a proxy derived from the current streak alone, not a completion
/// percentage over real history.
#[must_use]
pub fn trend_rate(streak: u32) -> u32 {
    let rate = (f64::from(streak) * 100.0 / f64::from(TREND_WINDOW_DAYS)).round();
    #[allow(clippy::cast_sign_loss)]
    let rate = rate as u32;
    rate.min(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    #[must_use]
    pub fn from_rate(rate: u32) -> Self {
        match rate {
            70.. => Trend::Improving,
            30..=69 => Trend::Stable,
            _ => Trend::Declining,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitTrend {
    pub habit_id: i64,
    pub name: String,
    pub streak: u32,
    pub rate: u32,
    pub trend: Trend,
}

#[must_use]
pub fn habit_trends(habits: &[HabitView]) -> Vec<HabitTrend> {
    habits
        .iter()
        .map(|h| {
            let rate = trend_rate(h.streak);
            HabitTrend {
                habit_id: h.id(),
                name: h.name().to_string(),
                streak: h.streak,
                rate,
                trend: Trend::from_rate(rate),
            }
        })
        .collect()
}

// --- Categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Health,
    Exercise,
    Learning,
    Wellness,
    Other,
}

impl Category {
    /// Report order.
    pub const ALL: [Category; 5] = [
        Category::Health,
        Category::Exercise,
        Category::Learning,
        Category::Wellness,
        Category::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Health => "Health",
            Category::Exercise => "Exercise",
            Category::Learning => "Learning",
            Category::Wellness => "Wellness",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

struct Rule {
    category: Category,
    icons: &'static [&'static str],
    words: &'static [&'static str],
}

// First match wins.
const RULES: &[Rule] = &[
    Rule {
        category: Category::Health,
        icons: &["💧", "💊", "🥗", "🍎", "🥦", "😴", "🛌"],
        words: &["water", "drink", "vitamin", "sleep", "meal", "fruit", "veg", "diet"],
    },
    Rule {
        category: Category::Exercise,
        icons: &["🏃", "💪", "🏋", "🚴", "🏊", "⚽", "🚶"],
        words: &["run", "walk", "gym", "workout", "exercise", "push", "bike", "swim", "steps"],
    },
    Rule {
        category: Category::Learning,
        icons: &["📚", "📖", "🎓", "✍", "🧠", "💻"],
        words: &["read", "study", "learn", "book", "course", "language", "practice", "code"],
    },
    Rule {
        category: Category::Wellness,
        icons: &["🧘", "🙏", "🌿", "😊", "☀"],
        words: &["meditat", "journal", "gratitude", "breath", "relax", "yoga", "mindful"],
    },
];

/// Bucket a habit by keyword over its icon and name. Matching is
/// case-insensitive on the name; anything unmatched is [`Category::Other`].
#[must_use]
pub fn classify(icon: &str, name: &str) -> Category {
    let name = name.to_lowercase();
    RULES
        .iter()
        .find(|rule| {
            rule.icons.iter().any(|i| icon.contains(i))
                || rule.words.iter().any(|w| name.contains(w))
        })
        .map_or(Category::Other, |rule| rule.category)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub category: Category,
    pub total: usize,
    pub completed: usize,
}

/// Per-bucket totals in [`Category::ALL`] order. Empty buckets are left out.
#[must_use]
pub fn category_stats(habits: &[HabitView]) -> Vec<CategoryStat> {
    let mut stats: Vec<CategoryStat> = Category::ALL
        .iter()
        .map(|&category| CategoryStat {
            category,
            total: 0,
            completed: 0,
        })
        .collect();

    for h in habits {
        let category = classify(h.habit.display_icon(), h.name());
        if let Some(stat) = stats.iter_mut().find(|s| s.category == category) {
            stat.total += 1;
            if h.is_completed_today {
                stat.completed += 1;
            }
        }
    }

    stats.retain(|s| s.total > 0);
    stats
}

/// Everything the stats screen shows, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub summary: HabitStats,
    pub categories: Vec<CategoryStat>,
    pub trends: Vec<HabitTrend>,
}

impl StatsReport {
    #[must_use]
    pub fn from_views(habits: &[HabitView]) -> Self {
        Self {
            summary: compute_stats(habits),
            categories: category_stats(habits),
            trends: habit_trends(habits),
        }
    }
}
