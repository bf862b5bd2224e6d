use tracing::{info, warn};

use crate::{
    auth::password::hash_password,
    error::ApiError,
    users::{
        dto::RegisterRequest,
        repo::UserStore,
        repo_types::{NewUser, User},
    },
};

/// Returns the value as submitted, or a validation error naming the field
/// when it is absent or blank.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("Missing field: {field}"))),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates the registration fields, hashes the password and stores the user.
pub async fn create(store: &dyn UserStore, req: RegisterRequest) -> Result<User, ApiError> {
    let username = required(req.username, "username")?.trim().to_string();
    // passwords are taken verbatim, whitespace included
    let password = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::validation("Missing field: password")),
    };

    if store.find_by_username(&username).await?.is_some() {
        warn!(%username, "username already taken");
        return Err(ApiError::validation("username already taken"));
    }

    let password_hash = hash_password(&password).map_err(ApiError::Persistence)?;
    let user = store
        .insert(NewUser {
            username,
            password_hash,
            first_name: optional(req.first_name),
            last_name: optional(req.last_name),
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn find_by_username(
    store: &dyn UserStore,
    username: &str,
) -> Result<Option<User>, ApiError> {
    Ok(store.find_by_username(username).await?)
}

/// Bulk delete used by test fixtures to reset state between cases.
pub async fn remove_all(store: &dyn UserStore) -> Result<u64, ApiError> {
    Ok(store.remove_all().await?)
}
