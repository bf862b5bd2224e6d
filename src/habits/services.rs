use serde_json::Value;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::ApiError,
    habits::{
        dto::CreateHabitRequest,
        repo::HabitStore,
        repo_types::{Habit, HabitKind, LogEntry, NewHabit},
    },
    users::services::required,
};

fn not_found() -> ApiError {
    ApiError::not_found("Habit not found")
}

/// Accepts JSON numbers and numeric strings; the result must be a finite
/// positive number.
fn parse_goal(value: Option<Value>) -> Result<f64, ApiError> {
    let goal = match value {
        None | Some(Value::Null) => return Err(ApiError::validation("Missing field: goal")),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match goal {
        Some(g) if g.is_finite() && g > 0.0 => Ok(g),
        _ => Err(ApiError::validation("goal must be a positive number")),
    }
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its date.
fn parse_start_date(value: Option<String>, today: Date) -> Result<Date, ApiError> {
    let Some(raw) = value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(today);
    };
    Date::parse(&raw, format_description!("[year]-[month]-[day]"))
        .or_else(|_| OffsetDateTime::parse(&raw, &Rfc3339).map(|dt| dt.date()))
        .map_err(|_| ApiError::validation("startDate must be an ISO-8601 date (YYYY-MM-DD)"))
}

pub fn validate_new_habit(req: CreateHabitRequest, today: Date) -> Result<NewHabit, ApiError> {
    let habit_title = required(req.habit_title, "habitTitle")?;
    let good_or_bad = required(req.good_or_bad, "goodOrBad")?
        .parse::<HabitKind>()
        .map_err(ApiError::Validation)?;
    let goal = parse_goal(req.goal)?;
    let log_interval = required(req.log_interval, "logInterval")?;
    let start_date = parse_start_date(req.start_date, today)?;

    Ok(NewHabit {
        habit_title,
        good_or_bad,
        goal,
        log_interval,
        start_date,
        log_entries: req.log_entries.unwrap_or_default(),
    })
}

pub async fn create(
    store: &dyn HabitStore,
    owner: Uuid,
    req: CreateHabitRequest,
) -> Result<Habit, ApiError> {
    let new = validate_new_habit(req, OffsetDateTime::now_utc().date())?;
    let habit = store.insert(owner, new).await?;
    info!(habit_id = %habit.id, user_id = %owner, "habit created");
    Ok(habit)
}

pub async fn list_by_owner(store: &dyn HabitStore, owner: Uuid) -> Result<Vec<Habit>, ApiError> {
    Ok(store.list_by_owner(owner).await?)
}

pub async fn get_by_id(store: &dyn HabitStore, owner: Uuid, id: Uuid) -> Result<Habit, ApiError> {
    store.find_by_id(owner, id).await?.ok_or_else(not_found)
}

pub async fn append_log_entry(
    store: &dyn HabitStore,
    owner: Uuid,
    id: Uuid,
    entry: Option<LogEntry>,
) -> Result<Habit, ApiError> {
    let entry = entry.unwrap_or_else(LogEntry::now);
    let habit = store
        .append_log_entry(owner, id, entry)
        .await?
        .ok_or_else(not_found)?;
    debug!(habit_id = %id, entries = habit.log_entries.len(), "log entry appended");
    Ok(habit)
}

pub async fn replace_log_entries(
    store: &dyn HabitStore,
    owner: Uuid,
    id: Uuid,
    entries: Vec<LogEntry>,
) -> Result<Habit, ApiError> {
    store
        .replace_log_entries(owner, id, entries)
        .await?
        .ok_or_else(not_found)
}

pub async fn remove(store: &dyn HabitStore, owner: Uuid, id: Uuid) -> Result<(), ApiError> {
    if !store.delete(owner, id).await? {
        return Err(not_found());
    }
    info!(habit_id = %id, user_id = %owner, "habit deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habits::memory::MemoryHabitStore;
    use serde_json::json;
    use time::macros::{date, datetime};

    fn request(body: Value) -> CreateHabitRequest {
        serde_json::from_value(body).expect("valid request json")
    }

    fn example() -> Value {
        json!({
            "habitTitle": "testHabit",
            "goodOrBad": "good",
            "goal": 2,
            "logInterval": "per week",
        })
    }

    #[test]
    fn validate_fills_defaults() {
        let today = date!(2026 - 10 - 17);
        let new = validate_new_habit(request(example()), today).unwrap();
        assert_eq!(new.habit_title, "testHabit");
        assert_eq!(new.good_or_bad, HabitKind::Good);
        assert_eq!(new.goal, 2.0);
        assert_eq!(new.start_date, today);
        assert!(new.log_entries.is_empty());
    }

    #[test]
    fn goal_accepts_numeric_strings() {
        let mut body = example();
        body["goal"] = json!("2");
        let new = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap();
        assert_eq!(new.goal, 2.0);
    }

    #[test]
    fn goal_accepts_fractions() {
        for (raw, want) in [(json!(1.5), 1.5), (json!("0.25"), 0.25)] {
            let mut body = example();
            body["goal"] = raw;
            let new = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap();
            assert_eq!(new.goal, want);
        }
    }

    #[test]
    fn goal_must_be_a_positive_number() {
        let rejected = [
            json!(0),
            json!(-3),
            json!("-0.5"),
            json!("NaN"),
            json!("inf"),
            json!("two"),
            json!(true),
        ];
        for bad in rejected {
            let mut body = example();
            body["goal"] = bad.clone();
            let err = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "goal {bad} accepted");
        }
    }

    #[test]
    fn missing_fields_are_named() {
        for field in ["habitTitle", "goodOrBad", "goal", "logInterval"] {
            let mut body = example();
            body.as_object_mut().unwrap().remove(field);
            let err = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap_err();
            assert_eq!(err.to_string(), format!("Missing field: {field}"));
        }
    }

    #[test]
    fn text_fields_are_kept_as_submitted() {
        let mut body = example();
        body["habitTitle"] = json!("  read  ");
        body["logInterval"] = json!(" per week ");
        let new = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap();
        assert_eq!(new.habit_title, "  read  ");
        assert_eq!(new.log_interval, " per week ");

        let mut body = example();
        body["habitTitle"] = json!("   ");
        let err = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap_err();
        assert_eq!(err.to_string(), "Missing field: habitTitle");
    }

    #[test]
    fn good_or_bad_is_restricted() {
        let mut body = example();
        body["goodOrBad"] = json!("neutral");
        assert!(validate_new_habit(request(body), date!(2026 - 10 - 17)).is_err());
    }

    #[test]
    fn start_date_formats() {
        let today = date!(2026 - 10 - 17);
        assert_eq!(
            parse_start_date(Some("2017-12-12".into()), today).unwrap(),
            date!(2017 - 12 - 12)
        );
        assert_eq!(
            parse_start_date(Some("2017-12-12T10:00:00Z".into()), today).unwrap(),
            date!(2017 - 12 - 12)
        );
        assert!(parse_start_date(Some("12-12-2017".into()), today).is_err());
        assert_eq!(parse_start_date(Some(" ".into()), today).unwrap(), today);
    }

    #[test]
    fn legacy_streak_field_is_accepted() {
        let mut body = example();
        body["streak"] = json!(["2017-12-13T08:30:00Z"]);
        let new = validate_new_habit(request(body), date!(2026 - 10 - 17)).unwrap();
        assert_eq!(new.log_entries, vec![LogEntry(datetime!(2017-12-13 08:30 UTC))]);
    }

    #[tokio::test]
    async fn append_twice_keeps_submission_order() {
        let store = MemoryHabitStore::new();
        let owner = Uuid::new_v4();
        let habit = create(&store, owner, request(example())).await.unwrap();

        let first = LogEntry(datetime!(2024-03-02 09:00 UTC));
        let second = LogEntry(datetime!(2024-03-01 09:00 UTC));
        append_log_entry(&store, owner, habit.id, Some(first)).await.unwrap();
        let habit = append_log_entry(&store, owner, habit.id, Some(second))
            .await
            .unwrap();
        assert_eq!(habit.log_entries, vec![first, second]);
    }

    #[tokio::test]
    async fn replace_overwrites_entries() {
        let store = MemoryHabitStore::new();
        let owner = Uuid::new_v4();
        let habit = create(&store, owner, request(example())).await.unwrap();
        append_log_entry(&store, owner, habit.id, None).await.unwrap();

        let only = LogEntry(datetime!(2024-01-01 00:00 UTC));
        let habit = replace_log_entries(&store, owner, habit.id, vec![only])
            .await
            .unwrap();
        assert_eq!(habit.log_entries, vec![only]);
    }

    #[tokio::test]
    async fn missing_habit_is_not_found() {
        let store = MemoryHabitStore::new();
        let owner = Uuid::new_v4();
        let id = Uuid::new_v4();
        assert!(matches!(get_by_id(&store, owner, id).await, Err(ApiError::NotFound(_))));
        assert!(matches!(
            append_log_entry(&store, owner, id, None).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            replace_log_entries(&store, owner, id, vec![]).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(remove(&store, owner, id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryHabitStore::new();
        let owner = Uuid::new_v4();
        let habit = create(&store, owner, request(example())).await.unwrap();
        remove(&store, owner, habit.id).await.unwrap();
        assert!(matches!(
            get_by_id(&store, owner, habit.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(list_by_owner(&store, owner).await.unwrap().is_empty());
    }
}
