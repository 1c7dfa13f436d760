//! SQLite pool setup and schema migration.

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Open the configured SQLite database, creating parent directories and the
/// database file as needed. In-memory URLs skip all filesystem preparation.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");

    if !db_path.contains(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                tracing::info!("created missing directory {:?}", parent);
            }
        }
        if !Path::new(db_path).exists() {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(db_path)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the embedded schema, statement by statement. Idempotent — every
/// statement is `IF NOT EXISTS`.
pub async fn apply_migrations(db: &SqlitePool) -> Result<()> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("running {} migration statements", statements.len());
    for stmt in statements {
        tracing::debug!("executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_url_leaves_no_file_behind() {
        let pool = connect("sqlite::memory:").await.unwrap();
        apply_migrations(&pool).await.unwrap();

        assert!(!Path::new("sqlite::memory:").exists());
        assert!(!Path::new(":memory:").exists());
    }
}
