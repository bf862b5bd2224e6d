use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::habits::repo_types::{Habit, HabitRow, LogEntry, NewHabit};

/// Habit persistence. Every lookup is scoped to the owning user, so a
/// foreign id behaves exactly like a missing one.
#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn insert(&self, owner: Uuid, new: NewHabit) -> Result<Habit, StoreError>;
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Habit>, StoreError>;
    async fn find_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Habit>, StoreError>;
    /// Atomically pushes one entry; concurrent appends are all kept.
    async fn append_log_entry(
        &self,
        owner: Uuid,
        id: Uuid,
        entry: LogEntry,
    ) -> Result<Option<Habit>, StoreError>;
    async fn replace_log_entries(
        &self,
        owner: Uuid,
        id: Uuid,
        entries: Vec<LogEntry>,
    ) -> Result<Option<Habit>, StoreError>;
    /// `true` when a habit was deleted.
    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

const HABIT_COLUMNS: &str = "id, user_ref, habit_title, good_or_bad, goal, log_interval, \
                             start_date, log_entries, created_at";

#[derive(Clone)]
pub struct PgHabitStore {
    db: PgPool,
}

impl PgHabitStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn timestamps(entries: &[LogEntry]) -> Vec<OffsetDateTime> {
    entries.iter().map(|e| e.0).collect()
}

#[async_trait]
impl HabitStore for PgHabitStore {
    async fn insert(&self, owner: Uuid, new: NewHabit) -> Result<Habit, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO habits (id, user_ref, habit_title, good_or_bad, goal, log_interval,
                                start_date, log_entries)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {HABIT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, HabitRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner)
            .bind(&new.habit_title)
            .bind(new.good_or_bad.as_str())
            .bind(new.goal)
            .bind(&new.log_interval)
            .bind(new.start_date)
            .bind(timestamps(&new.log_entries))
            .fetch_one(&self.db)
            .await?;
        row.try_into()
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Habit>, StoreError> {
        let sql = format!(
            r#"
            SELECT {HABIT_COLUMNS}
            FROM habits
            WHERE user_ref = $1
            ORDER BY created_at ASC, id ASC
            "#
        );
        let rows = sqlx::query_as::<_, HabitRow>(&sql)
            .bind(owner)
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(Habit::try_from).collect()
    }

    async fn find_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Habit>, StoreError> {
        let sql = format!(
            r#"
            SELECT {HABIT_COLUMNS}
            FROM habits
            WHERE id = $1 AND user_ref = $2
            "#
        );
        let row = sqlx::query_as::<_, HabitRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?;
        row.map(Habit::try_from).transpose()
    }

    async fn append_log_entry(
        &self,
        owner: Uuid,
        id: Uuid,
        entry: LogEntry,
    ) -> Result<Option<Habit>, StoreError> {
        let sql = format!(
            r#"
            UPDATE habits
               SET log_entries = array_append(log_entries, $3)
             WHERE id = $1 AND user_ref = $2
            RETURNING {HABIT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, HabitRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(entry.0)
            .fetch_optional(&self.db)
            .await?;
        row.map(Habit::try_from).transpose()
    }

    async fn replace_log_entries(
        &self,
        owner: Uuid,
        id: Uuid,
        entries: Vec<LogEntry>,
    ) -> Result<Option<Habit>, StoreError> {
        let sql = format!(
            r#"
            UPDATE habits
               SET log_entries = $3
             WHERE id = $1 AND user_ref = $2
            RETURNING {HABIT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, HabitRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(timestamps(&entries))
            .fetch_optional(&self.db)
            .await?;
        row.map(Habit::try_from).transpose()
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM habits WHERE id = $1 AND user_ref = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
