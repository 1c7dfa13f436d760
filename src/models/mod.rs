//! Core data models for the S3 console.
//!
//! Bucket configs and users map to SQLite tables via `sqlx::FromRow`;
//! listing entries are ephemeral view data serialized as JSON via `serde`.

pub mod bucket;
pub mod listing;
pub mod user;
