use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::{
    config::AppConfig,
    web::{
        auth,
        data::{PgSessionStore, PgUserRepository, SessionStore, UserRepository},
        storage,
    },
};

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Connects to Postgres, runs migrations and seeds the optional bootstrap user.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        storage::ensure_storage_root(&config.upload_folder).await?;

        let users = PgUserRepository::new(pool.clone());
        if let Some(seed) = &config.seed_user {
            let password_hash = auth::hash_password(&seed.password)
                .map_err(|err| anyhow!("failed to hash seed user password: {err}"))?;
            if users.ensure_user(&seed.username, &password_hash).await? {
                info!(username = %seed.username, "seeded user from SEED_USERNAME");
            }
        }

        Ok(Self::from_parts(
            config,
            Arc::new(users),
            Arc::new(PgSessionStore::new(pool)),
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            sessions,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn upload_folder(&self) -> &Path {
        &self.config.upload_folder
    }

    pub fn static_folder(&self) -> &Path {
        &self.config.static_folder
    }
}
