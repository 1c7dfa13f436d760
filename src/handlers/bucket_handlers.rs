//! HTTP handlers for the bucket registry: CRUD plus the explicit
//! test-connection action, which is the only writer of `connection_status`.

use crate::{
    errors::AppError,
    models::bucket::{BucketConfig, BucketConfigInput, ConnectionStatus},
    services::store::{AwsS3Store, ListRequest, ObjectStore, StoreError},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

/// GET `/api/buckets`
pub async fn list_buckets(
    State(state): State<AppState>,
) -> Result<Json<Vec<BucketConfig>>, AppError> {
    Ok(Json(state.buckets.list().await?))
}

/// GET `/api/buckets/{id}`
pub async fn get_bucket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BucketConfig>, AppError> {
    Ok(Json(state.buckets.get(id).await?))
}

/// POST `/api/buckets`
pub async fn create_bucket(
    State(state): State<AppState>,
    Json(input): Json<BucketConfigInput>,
) -> Result<impl IntoResponse, AppError> {
    let config = state.buckets.create(&input).await?;
    Ok((StatusCode::CREATED, Json(config)))
}

/// PUT `/api/buckets/{id}`
pub async fn update_bucket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<BucketConfigInput>,
) -> Result<Json<BucketConfig>, AppError> {
    Ok(Json(state.buckets.update(id, &input).await?))
}

/// DELETE `/api/buckets/{id}`
pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.buckets.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct TestConnectionResponse {
    pub success: bool,
    pub message: String,
    pub status: ConnectionStatus,
}

/// POST `/api/buckets/{id}/test` — issue a one-key listing against the
/// bucket and record the outcome. Failures are reported with a 200 and a
/// human-readable message; only the probe result differs.
pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TestConnectionResponse>, AppError> {
    let config = state.buckets.get(id).await?;
    let store = AwsS3Store::connect(&config).await;

    let probe = store
        .list_objects(
            &config.bucket_name,
            ListRequest {
                prefix: String::new(),
                delimiter: None,
                continuation_token: None,
                max_keys: 1,
            },
        )
        .await;

    let (status, success, message) = match probe {
        Ok(_) => (
            ConnectionStatus::Connected,
            true,
            "Connection successful!".to_string(),
        ),
        Err(err) => (ConnectionStatus::Failed, false, test_failure_message(&config, &err)),
    };

    state.buckets.set_status(id, status).await?;
    Ok(Json(TestConnectionResponse {
        success,
        message,
        status,
    }))
}

fn test_failure_message(config: &BucketConfig, err: &StoreError) -> String {
    match err {
        StoreError::NotFound(_) => format!(
            "Bucket \"{}\" does not exist in region \"{}\".",
            config.bucket_name, config.region
        ),
        StoreError::Auth(_) => "Invalid AWS Access Key ID or Secret Access Key.".to_string(),
        StoreError::RegionMismatch(_) => {
            "The bucket is in a different region. Please verify the bucket's region.".to_string()
        }
        other => other.to_string(),
    }
}
