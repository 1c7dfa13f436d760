//! BucketStore — persistence and validation for registered bucket configs.
//!
//! Durable SQLite rows keyed by client-facing UUID. `connection_status` is
//! only ever written through `set_status`, driven by the explicit
//! test-connection operation.

use crate::models::bucket::{BucketConfig, BucketConfigInput, ConnectionStatus};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

#[derive(Debug, Error)]
pub enum BucketStoreError {
    #[error("bucket config `{0}` not found")]
    NotFound(Uuid),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("region `{0}` is not a valid region identifier")]
    InvalidRegion(String),
    #[error("access key id and secret access key must be set together")]
    PartialCredentials,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type BucketStoreResult<T> = Result<T, BucketStoreError>;

/// CRUD over registered bucket configs, keyed by client-facing UUID.
#[derive(Clone)]
pub struct BucketStore {
    db: Arc<SqlitePool>,
}

impl BucketStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Validate the target S3 bucket name.
    ///
    /// Enforces S3-like naming rules:
    /// - 3–63 characters
    /// - lowercase letters, digits, dots, hyphens only
    /// - cannot start/end with dot or hyphen
    /// - cannot contain consecutive dots or dot-hyphen patterns
    /// - cannot look like an IPv4 address
    fn ensure_bucket_name_valid(name: &str) -> BucketStoreResult<()> {
        let invalid = |reason: &str| BucketStoreError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim() != name {
            return Err(invalid("cannot begin or end with whitespace"));
        }
        let len = name.len();
        if len < BUCKET_NAME_MIN_LEN || len > BUCKET_NAME_MAX_LEN {
            return Err(invalid("must be between 3 and 63 characters"));
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return Err(invalid(
                "allowed characters are lowercase letters, digits, dots, and hyphens",
            ));
        }
        if name.starts_with('.')
            || name.ends_with('.')
            || name.starts_with('-')
            || name.ends_with('-')
        {
            return Err(invalid("must start and end with a lowercase letter or digit"));
        }
        if name.contains("..") || name.contains("-.") || name.contains(".-") {
            return Err(invalid(
                "cannot contain consecutive dots or dot-hyphen combinations",
            ));
        }
        if is_ipv4_like(name) {
            return Err(invalid("must not be formatted like an IP address"));
        }
        Ok(())
    }

    /// Region identifiers are free-form (partitions and new regions appear
    /// over time) but must look like one: lowercase alphanumerics and
    /// hyphens.
    fn ensure_region_valid(region: &str) -> BucketStoreResult<()> {
        if region.is_empty()
            || !region
                .chars()
                .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
        {
            return Err(BucketStoreError::InvalidRegion(region.to_string()));
        }
        Ok(())
    }

    /// Normalize and validate form input. Empty credential strings are
    /// treated as absent; a lone key or lone secret is rejected.
    fn validate_input(input: &BucketConfigInput) -> BucketStoreResult<BucketConfigInput> {
        let mut input = input.clone();
        input.display_name = input.display_name.trim().to_string();
        if input.display_name.is_empty() {
            return Err(BucketStoreError::MissingField("display name"));
        }

        Self::ensure_bucket_name_valid(&input.bucket_name)?;
        Self::ensure_region_valid(&input.region)?;

        input.access_key_id = input.access_key_id.filter(|v| !v.trim().is_empty());
        input.secret_access_key = input.secret_access_key.filter(|v| !v.trim().is_empty());
        if input.access_key_id.is_some() != input.secret_access_key.is_some() {
            return Err(BucketStoreError::PartialCredentials);
        }

        Ok(input)
    }

    pub async fn list(&self) -> BucketStoreResult<Vec<BucketConfig>> {
        let configs = sqlx::query_as::<_, BucketConfig>(
            "SELECT id, display_name, bucket_name, region, access_key_id, secret_access_key,
                    connection_status, created_at
             FROM bucket_configs ORDER BY created_at ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(configs)
    }

    pub async fn get(&self, id: Uuid) -> BucketStoreResult<BucketConfig> {
        sqlx::query_as::<_, BucketConfig>(
            "SELECT id, display_name, bucket_name, region, access_key_id, secret_access_key,
                    connection_status, created_at
             FROM bucket_configs WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BucketStoreError::NotFound(id),
            other => BucketStoreError::Sqlx(other),
        })
    }

    pub async fn create(&self, input: &BucketConfigInput) -> BucketStoreResult<BucketConfig> {
        let input = Self::validate_input(input)?;

        let config = BucketConfig {
            id: Uuid::new_v4(),
            display_name: input.display_name,
            bucket_name: input.bucket_name,
            region: input.region,
            access_key_id: input.access_key_id,
            secret_access_key: input.secret_access_key,
            connection_status: ConnectionStatus::Untested,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO bucket_configs (id, display_name, bucket_name, region, access_key_id,
                                         secret_access_key, connection_status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(config.id)
        .bind(&config.display_name)
        .bind(&config.bucket_name)
        .bind(&config.region)
        .bind(&config.access_key_id)
        .bind(&config.secret_access_key)
        .bind(config.connection_status)
        .bind(config.created_at)
        .execute(&*self.db)
        .await?;

        Ok(config)
    }

    /// Replace an existing config. Editing resets `connection_status` to
    /// `Untested` — the new details have not been tested yet.
    pub async fn update(
        &self,
        id: Uuid,
        input: &BucketConfigInput,
    ) -> BucketStoreResult<BucketConfig> {
        let input = Self::validate_input(input)?;
        let existing = self.get(id).await?;

        let config = BucketConfig {
            id,
            display_name: input.display_name,
            bucket_name: input.bucket_name,
            region: input.region,
            access_key_id: input.access_key_id,
            secret_access_key: input.secret_access_key,
            connection_status: ConnectionStatus::Untested,
            created_at: existing.created_at,
        };

        sqlx::query(
            "UPDATE bucket_configs
             SET display_name = ?, bucket_name = ?, region = ?, access_key_id = ?,
                 secret_access_key = ?, connection_status = ?
             WHERE id = ?",
        )
        .bind(&config.display_name)
        .bind(&config.bucket_name)
        .bind(&config.region)
        .bind(&config.access_key_id)
        .bind(&config.secret_access_key)
        .bind(config.connection_status)
        .bind(id)
        .execute(&*self.db)
        .await?;

        Ok(config)
    }

    pub async fn delete(&self, id: Uuid) -> BucketStoreResult<()> {
        let result = sqlx::query("DELETE FROM bucket_configs WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BucketStoreError::NotFound(id));
        }
        Ok(())
    }

    /// Record the outcome of an explicit connection test.
    pub async fn set_status(&self, id: Uuid, status: ConnectionStatus) -> BucketStoreResult<()> {
        let result = sqlx::query("UPDATE bucket_configs SET connection_status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BucketStoreError::NotFound(id));
        }
        Ok(())
    }
}

/// Check if a string matches IPv4-like dotted decimal form.
/// Rejects names formatted like `1.2.3.4`.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|segment| {
        !segment.is_empty()
            && segment.len() <= 3
            && segment.chars().all(|c| c.is_ascii_digit())
            && segment.parse::<u8>().is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::memory_pool;

    fn input(bucket_name: &str) -> BucketConfigInput {
        BucketConfigInput {
            display_name: "Team assets".to_string(),
            bucket_name: bucket_name.to_string(),
            region: "eu-west-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
        }
    }

    #[tokio::test]
    async fn create_get_update_delete_roundtrip() {
        let store = BucketStore::new(memory_pool().await);

        let created = store.create(&input("team-assets")).await.unwrap();
        assert_eq!(created.connection_status, ConnectionStatus::Untested);

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched.bucket_name, "team-assets");

        store
            .set_status(created.id, ConnectionStatus::Connected)
            .await
            .unwrap();
        assert_eq!(
            store.get(created.id).await.unwrap().connection_status,
            ConnectionStatus::Connected
        );

        // An edit invalidates the previous test result.
        let updated = store.update(created.id, &input("other-bucket")).await.unwrap();
        assert_eq!(updated.connection_status, ConnectionStatus::Untested);

        store.delete(created.id).await.unwrap();
        assert!(matches!(
            store.get(created.id).await,
            Err(BucketStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn bucket_name_rules_are_enforced() {
        let store = BucketStore::new(memory_pool().await);

        for bad in ["ab", "UPPER", "has..dots", "-leading", "1.2.3.4"] {
            assert!(
                matches!(
                    store.create(&input(bad)).await,
                    Err(BucketStoreError::InvalidBucketName { .. })
                ),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn lone_credential_is_rejected_and_blank_pair_is_dropped() {
        let store = BucketStore::new(memory_pool().await);

        let mut partial = input("ok-bucket");
        partial.access_key_id = Some("AKIA123".to_string());
        assert!(matches!(
            store.create(&partial).await,
            Err(BucketStoreError::PartialCredentials)
        ));

        let mut blank = input("ok-bucket");
        blank.access_key_id = Some("".to_string());
        blank.secret_access_key = Some("  ".to_string());
        let created = store.create(&blank).await.unwrap();
        assert!(created.access_key_id.is_none());
        assert!(created.secret_access_key.is_none());
    }

    #[tokio::test]
    async fn region_must_look_like_a_region() {
        let store = BucketStore::new(memory_pool().await);
        let mut bad = input("ok-bucket");
        bad.region = "EU West".to_string();
        assert!(matches!(
            store.create(&bad).await,
            Err(BucketStoreError::InvalidRegion(_))
        ));
    }
}
