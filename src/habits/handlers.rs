use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    habits::{
        dto::{AppendLogEntryRequest, CreateHabitRequest, ReplaceLogEntriesRequest},
        repo_types::Habit,
        services,
    },
    state::AppState,
};

pub fn habit_routes() -> Router<AppState> {
    Router::new()
        .route("/habits", post(create_habit).get(list_habits))
        .route("/habits/:id", get(get_habit).delete(delete_habit))
        .route(
            "/habits/:id/log-entries",
            post(append_log_entry).put(replace_log_entries),
        )
}

/// A path segment that is not a UUID cannot name an existing habit.
fn habit_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id).map_err(|e| {
        warn!(error = %e, "malformed habit id");
        ApiError::not_found("Habit not found")
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_habit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateHabitRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<Habit>), ApiError> {
    let Json(payload) = payload?;
    let habit = services::create(state.habits.as_ref(), user.id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/habits/{}", habit.id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(habit)))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_habits(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Habit>>, ApiError> {
    let habits = services::list_by_owner(state.habits.as_ref(), user.id).await?;
    Ok(Json(habits))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_habit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Habit>, ApiError> {
    let id = habit_id(path)?;
    let habit = services::get_by_id(state.habits.as_ref(), user.id, id).await?;
    Ok(Json(habit))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn append_log_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AppendLogEntryRequest>, JsonRejection>,
) -> Result<Json<Habit>, ApiError> {
    let id = habit_id(path)?;
    let Json(payload) = payload?;
    let habit =
        services::append_log_entry(state.habits.as_ref(), user.id, id, payload.log_entry).await?;
    Ok(Json(habit))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn replace_log_entries(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReplaceLogEntriesRequest>, JsonRejection>,
) -> Result<Json<Habit>, ApiError> {
    let id = habit_id(path)?;
    let Json(payload) = payload?;
    let entries = payload
        .log_entries
        .ok_or_else(|| ApiError::validation("Missing field: logEntries"))?;
    let habit = services::replace_log_entries(state.habits.as_ref(), user.id, id, entries).await?;
    Ok(Json(habit))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete_habit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = habit_id(path)?;
    services::remove(state.habits.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
