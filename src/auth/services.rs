use tracing::{error, warn};

use crate::{
    auth::{jwt::JwtKeys, password::verify_password},
    error::ApiError,
    users::{repo::UserStore, repo_types::User, services::find_by_username},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Checks a username/password pair. Unknown users and wrong passwords
/// produce the same error.
pub async fn authenticate(
    store: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<User, ApiError> {
    let Some(user) = find_by_username(store, username).await? else {
        warn!(%username, "login unknown username");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    let ok = verify_password(password, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "stored password hash unreadable");
        ApiError::Persistence(e)
    })?;
    if !ok {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }
    Ok(user)
}

pub fn issue_token(keys: &JwtKeys, user: &User) -> Result<String, ApiError> {
    keys.sign(&user.username).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Persistence(e)
    })
}

/// Resolves a bearer token to the user it was issued for.
pub async fn verify_token(
    keys: &JwtKeys,
    store: &dyn UserStore,
    token: &str,
) -> Result<User, ApiError> {
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    match find_by_username(store, &claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            warn!(username = %claims.sub, "token subject no longer exists");
            Err(ApiError::unauthorized("Invalid or expired token"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::users::{dto::RegisterRequest, memory::MemoryUserStore, services};

    async fn store_with_user() -> MemoryUserStore {
        let store = MemoryUserStore::new();
        services::create(
            &store,
            RegisterRequest {
                username: Some("exampleUser".into()),
                password: Some("examplePass".into()),
                ..Default::default()
            },
        )
        .await
        .expect("create user");
        store
    }

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            ttl_days: 7,
        })
    }

    #[tokio::test]
    async fn authenticate_accepts_good_credentials() {
        let store = store_with_user().await;
        let user = authenticate(&store, "exampleUser", "examplePass").await.unwrap();
        assert_eq!(user.username, "exampleUser");
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_user_and_bad_password_alike() {
        let store = store_with_user().await;
        let a = authenticate(&store, "nobody", "examplePass").await.unwrap_err();
        let b = authenticate(&store, "exampleUser", "nope").await.unwrap_err();
        assert!(matches!(a, ApiError::Unauthorized(_)));
        assert_eq!(a.to_string(), b.to_string());
    }

    #[tokio::test]
    async fn issued_token_verifies_back_to_user() {
        let store = store_with_user().await;
        let user = authenticate(&store, "exampleUser", "examplePass").await.unwrap();
        let token = issue_token(&keys(), &user).unwrap();
        let back = verify_token(&keys(), &store, &token).await.unwrap();
        assert_eq!(back.id, user.id);
    }

    #[tokio::test]
    async fn verify_token_rejects_removed_user() {
        let store = store_with_user().await;
        let user = authenticate(&store, "exampleUser", "examplePass").await.unwrap();
        let token = issue_token(&keys(), &user).unwrap();
        store.remove_all().await.unwrap();
        let err = verify_token(&keys(), &store, &token).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
