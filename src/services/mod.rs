//! Service layer: the storage seam plus the aggregation, archival, and
//! persistence logic the handlers delegate to.

pub mod archive;
pub mod buckets;
pub mod listing;
pub mod store;
pub mod users;

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    /// Fresh in-memory SQLite pool with the schema applied. A single
    /// connection, since each sqlite `:memory:` connection is its own DB.
    pub(crate) async fn memory_pool() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory sqlite");
        crate::db::apply_migrations(&pool)
            .await
            .expect("apply migrations");
        Arc::new(pool)
    }
}
