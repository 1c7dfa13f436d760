//! Local user accounts and their login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A local console user.
///
/// Passwords are stored as argon2 hashes; the hash never leaves the server.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Unique login name.
    pub username: String,

    /// Argon2 PHC-format password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// An active login session, addressed by its opaque bearer token.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Session {
    /// Bearer token handed to the client at login.
    pub token: Uuid,

    /// Owning user.
    pub user_id: Uuid,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// Hard expiry; the session is invalid past this instant.
    pub expires_at: DateTime<Utc>,
}
