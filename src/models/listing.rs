//! Listing entries as presented to the browsing client.
//!
//! A `ListingPage` is ephemeral: it represents one fetch for a
//! `(bucket, prefix)` pair and is discarded on the next navigation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single object as reported by the backend listing.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ObjectEntry {
    /// Full object key within the bucket.
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Timestamp when the object was last modified, if reported.
    pub last_modified: Option<DateTime<Utc>>,

    /// Storage class (e.g. STANDARD, GLACIER).
    pub storage_class: String,
}

/// One row in the directory view: either a virtual folder (a common prefix)
/// or a leaf object. Identity is the path/key string.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum S3Item {
    /// A common-prefix aggregation. `path` always ends with the delimiter.
    Folder { path: String },
    /// A leaf object with nonzero size.
    File {
        #[serde(flatten)]
        entry: ObjectEntry,
    },
}

impl S3Item {
    /// The identifying path: folder prefix or object key.
    pub fn path(&self) -> &str {
        match self {
            S3Item::Folder { path } => path,
            S3Item::File { entry } => &entry.key,
        }
    }

    /// Name shown in the listing table: the path with the current prefix
    /// stripped, and for folders the trailing delimiter removed.
    pub fn display_name(&self, prefix: &str) -> String {
        let stripped = self.path().strip_prefix(prefix).unwrap_or(self.path());
        match self {
            S3Item::Folder { .. } => stripped.trim_end_matches('/').to_string(),
            S3Item::File { .. } => stripped.to_string(),
        }
    }
}

/// One page of the directory view for a `(bucket, prefix)` pair.
#[derive(Serialize, Clone, Debug)]
pub struct ListingPage {
    /// Virtual folders derived from backend common prefixes.
    pub folders: Vec<S3Item>,

    /// Leaf objects, excluding the self-referential prefix key and
    /// zero-byte directory markers.
    pub files: Vec<S3Item>,

    /// Opaque cursor for the next page, when the backend reports one.
    pub next_token: Option<String>,
}

/// Kind discriminator for selected items in an archive request.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

/// One element of an archive selection: a key or a folder path.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SelectedItem {
    pub path: String,
    pub kind: ItemKind,
}
