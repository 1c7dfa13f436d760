//! Defines routes for the console API.
//!
//! ## Structure
//! - **Public endpoints**
//!   - `GET  /healthz`, `GET /readyz` — probes
//!   - `POST /api/auth/login` — open a session
//!
//! - **Session-protected endpoints** (bearer token)
//!   - `GET/POST      /api/buckets` — registry list / create
//!   - `GET/PUT/DELETE /api/buckets/{id}` — single config
//!   - `POST          /api/buckets/{id}/test` — explicit connection test
//!   - `GET/POST      /api/buckets/{id}/objects` — listing / batch upload
//!   - `GET           /api/buckets/{id}/objects/presign` — download URL
//!   - `POST          /api/buckets/{id}/archive` — zip-bundle a selection
//!   - `GET/POST      /api/users`, `DELETE /api/users/{id}` — accounts
//!   - `POST          /api/auth/logout`

use crate::{
    handlers::{
        auth_handlers::{create_user, delete_user, list_users, login, logout},
        bucket_handlers::{
            create_bucket, delete_bucket, get_bucket, list_buckets, test_connection, update_bucket,
        },
        health_handlers::{healthz, readyz},
        object_handlers::{download_archive, list_objects, presign_download, upload_objects},
    },
    middleware::auth::require_session,
    services::store::MAX_UPLOAD_BYTES,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};

/// Headroom above the per-file ceiling so multipart framing does not trip
/// the transport limit before the descriptive per-file check runs.
const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES as usize + 8 * 1024 * 1024;

/// Build and return the full router. All `/api` routes except login sit
/// behind the session middleware; probes stay open.
pub fn routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/buckets", get(list_buckets).post(create_bucket))
        .route(
            "/api/buckets/{id}",
            get(get_bucket).put(update_bucket).delete(delete_bucket),
        )
        .route("/api/buckets/{id}/test", post(test_connection))
        .route(
            "/api/buckets/{id}/objects",
            get(list_objects).post(upload_objects),
        )
        .route("/api/buckets/{id}/objects/presign", get(presign_download))
        .route("/api/buckets/{id}/archive", post(download_archive))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", delete(delete_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/auth/login", post(login))
        .merge(protected)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
