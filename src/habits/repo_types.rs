use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::error::StoreError;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Whether the habit is one to build or one to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitKind {
    Good,
    Bad,
}

impl HabitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitKind::Good => "good",
            HabitKind::Bad => "bad",
        }
    }
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(HabitKind::Good),
            "bad" => Ok(HabitKind::Bad),
            other => Err(format!("goodOrBad must be \"good\" or \"bad\", got {other:?}")),
        }
    }
}

/// One performed instance of a habit. Held in UTC at microsecond precision,
/// which is what a `TIMESTAMPTZ` column keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry(
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "normalized_rfc3339"
    )]
    pub OffsetDateTime,
);

impl LogEntry {
    pub fn new(at: OffsetDateTime) -> Self {
        let at = at.to_offset(UtcOffset::UTC);
        let micros = at.nanosecond() / 1_000 * 1_000;
        Self(at.replace_nanosecond(micros).unwrap_or(at))
    }

    pub fn now() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }
}

fn normalized_rfc3339<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    time::serde::rfc3339::deserialize(deserializer).map(|at| LogEntry::new(at).0)
}

/// Habit as stored and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: Uuid,
    pub habit_title: String,
    pub good_or_bad: HabitKind,
    pub goal: f64,
    pub log_interval: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    pub log_entries: Vec<LogEntry>,
    pub user_ref: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated input for a new habit.
#[derive(Debug, Clone)]
pub struct NewHabit {
    pub habit_title: String,
    pub good_or_bad: HabitKind,
    pub goal: f64,
    pub log_interval: String,
    pub start_date: Date,
    pub log_entries: Vec<LogEntry>,
}

#[derive(Debug, FromRow)]
pub struct HabitRow {
    pub id: Uuid,
    pub user_ref: Uuid,
    pub habit_title: String,
    pub good_or_bad: String,
    pub goal: f64,
    pub log_interval: String,
    pub start_date: Date,
    pub log_entries: Vec<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<HabitRow> for Habit {
    type Error = StoreError;

    fn try_from(r: HabitRow) -> Result<Self, Self::Error> {
        let good_or_bad = r
            .good_or_bad
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("habit {}: {e}", r.id)))?;
        Ok(Self {
            id: r.id,
            habit_title: r.habit_title,
            good_or_bad,
            goal: r.goal,
            log_interval: r.log_interval,
            start_date: r.start_date,
            log_entries: r.log_entries.into_iter().map(LogEntry::new).collect(),
            user_ref: r.user_ref,
            created_at: r.created_at,
        })
    }
}
