//! Listing aggregation: produces the directory view for a bucket + prefix.
//!
//! One delimited page per navigation for interactive browsing, an exhaustive
//! token-driven walk for archive resolution, and a pure in-memory filter over
//! the current page. A failed fetch returns the typed error without touching
//! any previously displayed state; the caller treats it as "no change".

use crate::models::listing::{ListingPage, ObjectEntry, S3Item};
use crate::services::store::{ListRequest, ObjectStore, StoreResult};

/// Path delimiter used to emulate folders over flat object keys.
pub const DELIMITER: &str = "/";

const PAGE_MAX_KEYS: i32 = 1000;

/// Fetch one page of the directory view.
///
/// Folders are the backend's common prefixes; files are the returned objects
/// minus the self-referential entry whose key equals the prefix and minus
/// zero-byte directory markers.
pub async fn list_one_page(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    continuation_token: Option<String>,
) -> StoreResult<ListingPage> {
    let chunk = store
        .list_objects(
            bucket,
            ListRequest {
                prefix: prefix.to_string(),
                delimiter: Some(DELIMITER.to_string()),
                continuation_token,
                max_keys: PAGE_MAX_KEYS,
            },
        )
        .await?;

    let folders = chunk
        .common_prefixes
        .into_iter()
        .map(|path| S3Item::Folder { path })
        .collect();

    let files = chunk
        .objects
        .into_iter()
        .filter(|entry| entry.key != prefix && entry.size_bytes > 0)
        .map(|entry| S3Item::File { entry })
        .collect();

    Ok(ListingPage {
        folders,
        files,
        next_token: chunk.next_token,
    })
}

/// Walk every page under `prefix` with no delimiter, concatenating non-empty
/// objects at any depth. Used only when a folder's full contents are needed
/// (archive assembly), never for interactive browsing.
pub async fn list_all_objects(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> StoreResult<Vec<ObjectEntry>> {
    let mut entries = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let chunk = store
            .list_objects(
                bucket,
                ListRequest {
                    prefix: prefix.to_string(),
                    delimiter: None,
                    continuation_token: token.take(),
                    max_keys: PAGE_MAX_KEYS,
                },
            )
            .await?;

        entries.extend(
            chunk
                .objects
                .into_iter()
                .filter(|entry| entry.size_bytes > 0),
        );

        match chunk.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(entries)
}

/// Narrow the current page by a case-insensitive substring match over the
/// display name. Pure in-memory filtering; never re-queries the backend.
pub fn filter_page(items: &[S3Item], prefix: &str, query: &str) -> Vec<S3Item> {
    if query.is_empty() {
        return items.to_vec();
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.display_name(prefix).to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
