use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::habits::repo::HabitStore;
use crate::habits::repo_types::{Habit, LogEntry, NewHabit};

/// In-process habit store. Insertion order doubles as creation order.
#[derive(Default)]
pub struct MemoryHabitStore {
    habits: RwLock<Vec<Habit>>,
}

impl MemoryHabitStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, owner: Uuid, id: Uuid, f: F) -> Option<Habit>
    where
        F: FnOnce(&mut Habit) + Send,
    {
        let mut habits = self.habits.write().await;
        let habit = habits
            .iter_mut()
            .find(|h| h.id == id && h.user_ref == owner)?;
        f(habit);
        Some(habit.clone())
    }
}

/// Matches what Postgres hands back for a `TIMESTAMPTZ[]`.
fn normalized(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries.into_iter().map(|e| LogEntry::new(e.0)).collect()
}

#[async_trait]
impl HabitStore for MemoryHabitStore {
    async fn insert(&self, owner: Uuid, new: NewHabit) -> Result<Habit, StoreError> {
        let habit = Habit {
            id: Uuid::new_v4(),
            habit_title: new.habit_title,
            good_or_bad: new.good_or_bad,
            goal: new.goal,
            log_interval: new.log_interval,
            start_date: new.start_date,
            log_entries: normalized(new.log_entries),
            user_ref: owner,
            created_at: OffsetDateTime::now_utc(),
        };
        self.habits.write().await.push(habit.clone());
        Ok(habit)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Habit>, StoreError> {
        let habits = self.habits.read().await;
        Ok(habits.iter().filter(|h| h.user_ref == owner).cloned().collect())
    }

    async fn find_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<Habit>, StoreError> {
        let habits = self.habits.read().await;
        Ok(habits
            .iter()
            .find(|h| h.id == id && h.user_ref == owner)
            .cloned())
    }

    async fn append_log_entry(
        &self,
        owner: Uuid,
        id: Uuid,
        entry: LogEntry,
    ) -> Result<Option<Habit>, StoreError> {
        Ok(self
            .update(owner, id, |h| h.log_entries.push(LogEntry::new(entry.0)))
            .await)
    }

    async fn replace_log_entries(
        &self,
        owner: Uuid,
        id: Uuid,
        entries: Vec<LogEntry>,
    ) -> Result<Option<Habit>, StoreError> {
        let entries = normalized(entries);
        Ok(self.update(owner, id, |h| h.log_entries = entries).await)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut habits = self.habits.write().await;
        let before = habits.len();
        habits.retain(|h| !(h.id == id && h.user_ref == owner));
        Ok(habits.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habits::repo_types::HabitKind;
    use std::sync::Arc;
    use time::macros::{date, datetime};

    fn new_habit(title: &str) -> NewHabit {
        NewHabit {
            habit_title: title.into(),
            good_or_bad: HabitKind::Good,
            goal: 2.0,
            log_interval: "per week".into(),
            start_date: date!(2024 - 01 - 01),
            log_entries: Vec::new(),
        }
    }

    #[tokio::test]
    async fn scopes_everything_by_owner() {
        let store = MemoryHabitStore::new();
        let (ann, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let habit = store.insert(ann, new_habit("run")).await.unwrap();
        store.insert(bob, new_habit("read")).await.unwrap();

        assert_eq!(store.list_by_owner(ann).await.unwrap().len(), 1);
        assert!(store.find_by_id(bob, habit.id).await.unwrap().is_none());
        let entry = LogEntry(OffsetDateTime::now_utc());
        assert!(store
            .append_log_entry(bob, habit.id, entry)
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete(bob, habit.id).await.unwrap());
        assert!(store.delete(ann, habit.id).await.unwrap());
        assert!(store.list_by_owner(ann).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let store = Arc::new(MemoryHabitStore::new());
        let owner = Uuid::new_v4();
        let habit = store.insert(owner, new_habit("run")).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .append_log_entry(owner, habit.id, LogEntry(OffsetDateTime::now_utc()))
                    .await
                    .unwrap()
            }));
        }
        for t in tasks {
            t.await.unwrap().expect("habit exists");
        }

        let habit = store.find_by_id(owner, habit.id).await.unwrap().unwrap();
        assert_eq!(habit.log_entries.len(), 16);
    }

    #[tokio::test]
    async fn entries_come_back_in_utc_microseconds() {
        let store = MemoryHabitStore::new();
        let owner = Uuid::new_v4();
        let habit = store.insert(owner, new_habit("run")).await.unwrap();

        let submitted = datetime!(2024-03-02 11:00:00.123456789 +02:00);
        let habit = store
            .replace_log_entries(owner, habit.id, vec![LogEntry(submitted)])
            .await
            .unwrap()
            .unwrap();
        let kept = habit.log_entries[0].0;
        assert_eq!(kept.offset(), time::UtcOffset::UTC);
        assert_eq!(kept, datetime!(2024-03-02 09:00:00.123456 UTC));
    }
}
