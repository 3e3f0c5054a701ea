use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar day on the device's local clock, with no time component.
///
/// Every "today", streak walk, and completion row goes through this type, so
/// dates derived from UTC timestamps never get mixed with local ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalDate(NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date '{0}'. Use YYYY-MM-DD")]
pub struct ParseDateError(String);

impl LocalDate {
    #[must_use]
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    #[must_use]
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub fn as_naive(self) -> NaiveDate {
        self.0
    }

    /// Shift by a signed number of days. `None` only past chrono's range.
    #[must_use]
    pub fn add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add_signed(Duration::days(days)).map(Self)
    }

    #[must_use]
    pub fn sub_days(self, days: i64) -> Option<Self> {
        self.0.checked_sub_signed(Duration::days(days)).map(Self)
    }

    /// Whole days from `self` to `other` (negative when `other` is earlier).
    #[must_use]
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// The local calendar day a stored timestamp falls on.
    ///
    /// Accepts RFC 3339 (converted into the local zone), a naive
    /// `YYYY-MM-DDTHH:MM:SS` (already local), or a bare date.
    #[must_use]
    pub fn from_timestamp(ts: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return Some(Self(dt.with_timezone(&Local).date_naive()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S") {
            return Some(Self(naive.date()));
        }
        ts.parse().ok()
    }

    /// RFC 3339 timestamp for local midnight at the start of this day.
    #[must_use]
    pub fn start_of_day_timestamp(self) -> String {
        let midnight = self.0.and_time(NaiveTime::MIN);
        match Local.from_local_datetime(&midnight).earliest() {
            Some(dt) => dt.to_rfc3339(),
            // Midnight skipped by a DST jump: keep the naive local form.
            None => midnight.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for LocalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for LocalDate {
    type Err = ParseDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| ParseDateError(s.to_string()))
    }
}

impl TryFrom<String> for LocalDate {
    type Error = ParseDateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LocalDate> for String {
    fn from(date: LocalDate) -> Self {
        date.to_string()
    }
}

impl From<NaiveDate> for LocalDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Current local time as an RFC 3339 string, the format of every stored
/// `created_at` / `updated_at` / `completed_at`.
#[must_use]
pub fn now_timestamp() -> String {
    Local::now().to_rfc3339()
}
