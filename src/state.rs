//! Shared application state carried by the router.

use crate::services::{buckets::BucketStore, users::UserStore};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub buckets: BucketStore,
    pub users: UserStore,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, session_ttl: chrono::Duration) -> Self {
        Self {
            buckets: BucketStore::new(db.clone()),
            users: UserStore::new(db.clone(), session_ttl),
            db,
        }
    }
}
