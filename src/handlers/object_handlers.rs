//! HTTP handlers for browsing and transferring objects in a registered
//! bucket. Thin glue: each handler resolves the bucket config, builds a
//! per-request store, and delegates to the listing/archive services.

use crate::{
    errors::AppError,
    models::listing::{ListingPage, SelectedItem},
    services::{
        archive,
        listing::{self, filter_page},
        store::{AwsS3Store, ObjectStore, UploadFile, upload_batch, validate_object_key},
    },
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const PRESIGN_DEFAULT_SECS: u64 = 900;
const PRESIGN_MAX_SECS: u64 = 604_800;

/// Query params for `GET /api/buckets/{id}/objects`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
    /// Continuation token from the previous page, if any.
    pub token: Option<String>,
    /// Optional in-page search query (case-insensitive substring).
    pub q: Option<String>,
}

/// GET `/api/buckets/{id}/objects` — one page of the directory view.
pub async fn list_objects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListingPage>, AppError> {
    let config = state.buckets.get(id).await?;
    let store = AwsS3Store::connect(&config).await;

    let mut page =
        listing::list_one_page(&store, &config.bucket_name, &query.prefix, query.token).await?;

    if let Some(needle) = query.q.as_deref().filter(|s| !s.is_empty()) {
        page.folders = filter_page(&page.folders, &query.prefix, needle);
        page.files = filter_page(&page.files, &query.prefix, needle);
    }

    Ok(Json(page))
}

/// Query params for `GET /api/buckets/{id}/objects/presign`.
#[derive(Debug, Deserialize)]
pub struct PresignQuery {
    pub key: String,
    /// Requested URL lifetime in seconds; clamped to S3's 7-day maximum.
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
pub struct PresignResponse {
    pub url: String,
    pub expires_at: String,
    pub key: String,
}

/// GET `/api/buckets/{id}/objects/presign` — time-limited download URL for
/// one object.
pub async fn presign_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PresignQuery>,
) -> Result<Json<PresignResponse>, AppError> {
    validate_object_key(&query.key)?;
    let config = state.buckets.get(id).await?;
    let store = AwsS3Store::connect(&config).await;

    let ttl = query
        .expires_in
        .unwrap_or(PRESIGN_DEFAULT_SECS)
        .clamp(1, PRESIGN_MAX_SECS);
    let url = store
        .presign_get(&config.bucket_name, &query.key, Duration::from_secs(ttl))
        .await?;

    Ok(Json(PresignResponse {
        url,
        expires_at: (Utc::now() + chrono::Duration::seconds(ttl as i64)).to_rfc3339(),
        key: query.key,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub prefix: String,
}

/// Outcome for one file of an upload batch.
#[derive(Serialize)]
pub struct UploadResult {
    pub file_name: String,
    pub key: String,
    pub success: bool,
    pub message: String,
}

/// POST `/api/buckets/{id}/objects` — multipart batch upload.
///
/// Files are processed sequentially and independently: a rejected or failed
/// file is reported in its slot and does not block the files after it. The
/// 100 MiB per-file limit is enforced before the backend call.
pub async fn upload_objects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadResult>>, AppError> {
    let config = state.buckets.get(id).await?;
    let store = AwsS3Store::connect(&config).await;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("reading multipart body: {}", err)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("reading upload body: {}", err)))?;

        files.push(UploadFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(AppError::bad_request("no files in upload request"));
    }

    let results = upload_batch(&store, &config.bucket_name, &query.prefix, files)
        .await
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(()) => UploadResult {
                file_name: outcome.file_name,
                key: outcome.key,
                success: true,
                message: "uploaded".to_string(),
            },
            Err(err) => UploadResult {
                file_name: outcome.file_name,
                key: outcome.key,
                success: false,
                message: err.to_string(),
            },
        })
        .collect();

    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub items: Vec<SelectedItem>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    /// `base64` to receive a JSON-wrapped payload instead of raw zip bytes.
    pub format: Option<String>,
}

/// POST `/api/buckets/{id}/archive` — zip-bundle the selected files and
/// folders. Responds with raw `application/zip` bytes, or a base64 JSON
/// envelope with `?format=base64`.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ArchiveQuery>,
    Json(request): Json<ArchiveRequest>,
) -> Result<Response, AppError> {
    let config = state.buckets.get(id).await?;
    let store = AwsS3Store::connect(&config).await;

    let outcome = archive::build_archive(&store, &config.bucket_name, &request.items).await?;
    let file_name = format!(
        "{}-{}.zip",
        config.bucket_name,
        Utc::now().format("%Y%m%d-%H%M%S")
    );

    if query.format.as_deref() == Some("base64") {
        let body = serde_json::json!({
            "file_name": file_name,
            "entry_count": outcome.entry_count,
            "archive_base64": general_purpose::STANDARD.encode(&outcome.bytes),
        });
        return Ok(Json(body).into_response());
    }

    let mut response = Response::new(Body::from(outcome.bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
