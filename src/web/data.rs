use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::User;

/// Read access to user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
}

/// Server-side session rows keyed by an opaque token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user_id: i64, expires_at: DateTime<Utc>) -> Result<Uuid>;

    /// Returns the owning user id for a session that has not expired.
    async fn user_id_for(&self, token: Uuid) -> Result<Option<i64>>;

    async fn revoke(&self, token: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the user unless the username is already taken. Returns whether a row was created.
    pub async fn ensure_user(&self, username: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .context("failed to insert seed user")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up user by username")
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT id, username, password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up user by id")
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, user_id: i64, expires_at: DateTime<Utc>) -> Result<Uuid> {
        let token = Uuid::new_v4();
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .context("failed to create session")?;
        Ok(token)
    }

    async fn user_id_for(&self, token: Uuid) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("failed to resolve session")
    }

    async fn revoke(&self, token: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("failed to remove session")?;
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use std::{
        collections::HashMap,
        sync::{Mutex, RwLock},
    };

    use super::*;
    use crate::web::auth::hash_password;

    #[derive(Default)]
    pub struct MemoryUserRepository {
        users: RwLock<Vec<User>>,
    }

    impl MemoryUserRepository {
        pub fn with_user(username: &str, password: &str) -> Self {
            let repo = Self::default();
            repo.insert(username, password);
            repo
        }

        pub fn insert(&self, username: &str, password: &str) -> User {
            let mut users = self.users.write().unwrap();
            let user = User {
                id: users.len() as i64 + 1,
                username: username.to_string(),
                password_hash: hash_password(password).unwrap(),
            };
            users.push(user.clone());
            user
        }
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
            let users = self.users.read().unwrap();
            Ok(users.iter().find(|user| user.username == username).cloned())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
            let users = self.users.read().unwrap();
            Ok(users.iter().find(|user| user.id == id).cloned())
        }
    }

    #[derive(Default)]
    pub struct MemorySessionStore {
        sessions: Mutex<HashMap<Uuid, (i64, DateTime<Utc>)>>,
    }

    impl MemorySessionStore {
        pub fn len(&self) -> usize {
            self.sessions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SessionStore for MemorySessionStore {
        async fn create(&self, user_id: i64, expires_at: DateTime<Utc>) -> Result<Uuid> {
            let token = Uuid::new_v4();
            self.sessions
                .lock()
                .unwrap()
                .insert(token, (user_id, expires_at));
            Ok(token)
        }

        async fn user_id_for(&self, token: Uuid) -> Result<Option<i64>> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions
                .get(&token)
                .filter(|(_, expires_at)| *expires_at > Utc::now())
                .map(|(user_id, _)| *user_id))
        }

        async fn revoke(&self, token: Uuid) -> Result<()> {
            self.sessions.lock().unwrap().remove(&token);
            Ok(())
        }
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let store = MemorySessionStore::default();
        let live = store
            .create(1, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        let stale = store
            .create(1, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.user_id_for(live).await.unwrap(), Some(1));
        assert_eq!(store.user_id_for(stale).await.unwrap(), None);
    }
}
