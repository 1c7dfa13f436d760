//! UserStore — local accounts and login sessions.
//!
//! Lookup-by-username plus argon2 password verification, with opaque
//! bearer-token sessions. Accounts are provisioned through the CLI
//! (`--create-user`) or the user-management API; nothing is hardcoded.

use crate::models::user::{Session, User};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("session is expired or unknown")]
    InvalidSession,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type UserStoreResult<T> = Result<T, UserStoreError>;

#[derive(Clone)]
pub struct UserStore {
    db: Arc<SqlitePool>,
    session_ttl: Duration,
}

impl UserStore {
    pub fn new(db: Arc<SqlitePool>, session_ttl: Duration) -> Self {
        Self { db, session_ttl }
    }

    pub async fn create_user(&self, username: &str, password: &str) -> UserStoreResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UserStoreError::EmptyUsername);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(UserStoreError::WeakPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| UserStoreError::Hash(err.to_string()))?
            .to_string();

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };

        match sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => {
                Err(UserStoreError::UsernameTaken(username.to_string()))
            }
            Err(err) => Err(UserStoreError::Sqlx(err)),
        }
    }

    pub async fn lookup_by_username(&self, username: &str) -> UserStoreResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => UserStoreError::UserNotFound(username.to_string()),
            other => UserStoreError::Sqlx(other),
        })
    }

    pub async fn list_users(&self) -> UserStoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users ORDER BY username ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(users)
    }

    pub async fn delete_user(&self, id: Uuid) -> UserStoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserStoreError::UserNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Verify credentials and open a session. Unknown usernames and wrong
    /// passwords collapse into the same `InvalidCredentials` error.
    pub async fn login(&self, username: &str, password: &str) -> UserStoreResult<Session> {
        let user = match self.lookup_by_username(username).await {
            Ok(user) => user,
            Err(UserStoreError::UserNotFound(_)) => {
                return Err(UserStoreError::InvalidCredentials);
            }
            Err(other) => return Err(other),
        };

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|err| UserStoreError::Hash(err.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(UserStoreError::InvalidCredentials);
        }

        self.open_session(user.id).await
    }

    async fn open_session(&self, user_id: Uuid) -> UserStoreResult<Session> {
        // Opportunistic cleanup keeps the table from accumulating dead rows.
        sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&*self.db)
            .await?;

        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4(),
            user_id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&*self.db)
        .await?;

        Ok(session)
    }

    /// Resolve a bearer token to its live session.
    pub async fn validate_session(&self, token: Uuid) -> UserStoreResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => UserStoreError::InvalidSession,
            other => UserStoreError::Sqlx(other),
        })?;

        if session.expires_at <= Utc::now() {
            return Err(UserStoreError::InvalidSession);
        }
        Ok(session)
    }

    pub async fn revoke_session(&self, token: Uuid) -> UserStoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&*self.db)
            .await?;
        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
