use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    config::{AppConfig, StoreBackend},
    db,
    habits::{memory::MemoryHabitStore, repo::HabitStore, repo::PgHabitStore},
    users::{memory::MemoryUserStore, repo::PgUserStore, repo::UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub habits: Arc<dyn HabitStore>,
    db: Option<PgPool>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        match (config.store, config.database_url.clone()) {
            (StoreBackend::Postgres, Some(url)) => {
                let db = db::connect(&url).await?;
                Ok(Self::from_pool(db, Arc::new(config)))
            }
            (StoreBackend::Postgres, None) => {
                anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres")
            }
            (StoreBackend::Memory, _) => {
                info!("using in-memory store; data is lost on exit");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            config,
            users: Arc::new(PgUserStore::new(db.clone())),
            habits: Arc::new(PgHabitStore::new(db.clone())),
            db: Some(db),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::new()),
            habits: Arc::new(MemoryHabitStore::new()),
            db: None,
        }
    }

    /// Closes the database pool, if any. Further store calls will fail.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
            info!("database pool closed");
        }
    }
}
