use serde::Deserialize;

use crate::habits::repo_types::LogEntry;

/// Body of `POST /api/habits`. Fields stay optional so that missing ones are
/// reported by name instead of as a generic decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHabitRequest {
    pub habit_title: Option<String>,
    pub good_or_bad: Option<String>,
    pub goal: Option<serde_json::Value>,
    pub log_interval: Option<String>,
    pub start_date: Option<String>,
    #[serde(default, alias = "streak", alias = "loggedDate")]
    pub log_entries: Option<Vec<LogEntry>>,
}

/// Body of `POST /api/habits/:id/log-entries`; no entry means "now".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendLogEntryRequest {
    pub log_entry: Option<LogEntry>,
}

/// Body of `PUT /api/habits/:id/log-entries`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceLogEntriesRequest {
    #[serde(default, alias = "streak", alias = "loggedDate")]
    pub log_entries: Option<Vec<LogEntry>>,
}
