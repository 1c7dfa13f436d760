//! A registered bucket: user-supplied connection details for one S3 bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Result of the most recent explicit connection test for a bucket config.
///
/// Never inferred from regular browsing traffic; only the test-connection
/// operation moves this off `Untested`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Untested,
    Connected,
    Failed,
}

/// Connection details for one S3 bucket as registered by the user.
///
/// Credentials are optional as a pair; absence means the bucket is accessed
/// anonymously (public buckets, ambient access).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct BucketConfig {
    /// Unique identifier for this config (client-facing handle).
    pub id: Uuid,

    /// Human-readable alias shown in the bucket list.
    pub display_name: String,

    /// Actual S3 bucket name (must conform to S3 naming rules).
    pub bucket_name: String,

    /// AWS region the bucket lives in (e.g. "us-west-2").
    pub region: String,

    /// Optional access key id. Set together with `secret_access_key`.
    pub access_key_id: Option<String>,

    /// Optional secret. Never sent back to clients.
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,

    /// Outcome of the last explicit connection test.
    pub connection_status: ConnectionStatus,

    /// When this config was registered.
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or replacing a bucket config.
#[derive(Deserialize, Clone, Debug)]
pub struct BucketConfigInput {
    pub display_name: String,
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}
