//! Archive assembly: packs an arbitrary file/folder selection into one
//! in-memory zip.
//!
//! Folder selections are resolved through the exhaustive listing walk, each
//! object is fetched sequentially, and entry paths are rewritten relative to
//! the common base path of the requested items. Any resolution or fetch
//! failure aborts the whole job (no partial archive is ever produced), but
//! the error names the folder or key that failed.

use crate::models::listing::{ItemKind, SelectedItem};
use crate::services::listing::{DELIMITER, list_all_objects};
use crate::services::store::{ObjectStore, StoreError};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::debug;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("nothing selected to archive")]
    EmptySelection,
    #[error("resolving folder `{path}`: {source}")]
    FolderResolve { path: String, source: StoreError },
    #[error("fetching object `{key}`: {source}")]
    ObjectFetch { key: String, source: StoreError },
    #[error("writing archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("writing archive: {0}")]
    Io(#[from] std::io::Error),
}

/// A completed archive build: the zip bytes and how many members went in.
#[derive(Debug)]
pub struct ArchiveOutcome {
    pub bytes: Vec<u8>,
    pub entry_count: usize,
}

/// Longest shared leading substring of `paths`, truncated back to the last
/// delimiter boundary. Used only for rewriting entry paths, never for
/// deciding what goes into the archive.
pub fn common_base_path<'a, I>(paths: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = paths.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let mut shared = first.len();
    for path in iter {
        let common = first
            .bytes()
            .take(shared)
            .zip(path.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        shared = common;
        if shared == 0 {
            return String::new();
        }
    }

    // Truncate on the delimiter so the base never splits a path segment
    // (or a multibyte character — '/' is ASCII, so the boundary is safe).
    match first.as_bytes()[..shared].iter().rposition(|&b| b == b'/') {
        Some(pos) => first[..=pos].to_string(),
        None => String::new(),
    }
}

/// Build a zip archive for the selected items.
///
/// Entries are written in the iteration order of `items`, then listing order
/// within each folder; keys selected more than once (a folder plus a file
/// inside it) are packed exactly once.
pub async fn build_archive(
    store: &dyn ObjectStore,
    bucket: &str,
    items: &[SelectedItem],
) -> Result<ArchiveOutcome, ArchiveError> {
    if items.is_empty() {
        return Err(ArchiveError::EmptySelection);
    }

    // Folder paths must end with the delimiter; a bare "docs" prefix would
    // also match sibling keys like "docs2/...".
    let items: Vec<SelectedItem> = items
        .iter()
        .cloned()
        .map(|mut item| {
            if item.kind == ItemKind::Folder && !item.path.ends_with(DELIMITER) {
                item.path.push_str(DELIMITER);
            }
            item
        })
        .collect();

    let base = common_base_path(items.iter().map(|item| item.path.as_str()));

    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    for item in &items {
        match item.kind {
            ItemKind::File => {
                if seen.insert(item.path.clone()) {
                    keys.push(item.path.clone());
                }
            }
            ItemKind::Folder => {
                let entries = list_all_objects(store, bucket, &item.path)
                    .await
                    .map_err(|source| ArchiveError::FolderResolve {
                        path: item.path.clone(),
                        source,
                    })?;
                for entry in entries {
                    if seen.insert(entry.key.clone()) {
                        keys.push(entry.key);
                    }
                }
            }
        }
    }

    debug!(
        bucket,
        base,
        count = keys.len(),
        "assembling archive from resolved selection"
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entry_count = 0;
    for key in &keys {
        let body = store
            .get_object(bucket, key)
            .await
            .map_err(|source| ArchiveError::ObjectFetch {
                key: key.clone(),
                source,
            })?;

        let relative = key.strip_prefix(&base).unwrap_or(key);
        writer.start_file(relative, options)?;
        writer.write_all(&body)?;
        entry_count += 1;
    }

    let cursor = writer.finish()?;
    Ok(ArchiveOutcome {
        bytes: cursor.into_inner(),
        entry_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::testing::FakeStore;
    use std::collections::BTreeMap;
    use std::io::Read;

    fn file(path: &str) -> SelectedItem {
        SelectedItem {
            path: path.to_string(),
            kind: ItemKind::File,
        }
    }

    fn folder(path: &str) -> SelectedItem {
        SelectedItem {
            path: path.to_string(),
            kind: ItemKind::Folder,
        }
    }

    /// Member name -> contents, ignoring archive ordering.
    fn members(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut out = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            out.insert(entry.name().to_string(), contents);
        }
        out
    }

    #[test]
    fn common_base_path_truncates_to_delimiter_boundary() {
        assert_eq!(common_base_path(["a/b/c.txt", "a/b/d/e.txt"]), "a/b/");
        assert_eq!(common_base_path(["only.txt"]), "");
        assert_eq!(common_base_path(["a/b/c.txt"]), "a/b/");
        // Shared substring "a/ab" must fall back to the "a/" boundary.
        assert_eq!(common_base_path(["a/abc.txt", "a/abd.txt"]), "a/");
        assert_eq!(common_base_path(["x/1.txt", "y/2.txt"]), "");
        assert_eq!(common_base_path::<[&str; 0]>([]), "");
    }

    #[tokio::test]
    async fn files_only_archive_has_one_entry_per_input() {
        let store = FakeStore::new(&[
            ("a/b/c.txt", b"see"),
            ("a/b/d/e.txt", b"eee"),
            ("a/b/unrelated.txt", b"no"),
        ]);

        let outcome = build_archive(&store, "demo", &[file("a/b/c.txt"), file("a/b/d/e.txt")])
            .await
            .unwrap();

        assert_eq!(outcome.entry_count, 2);
        let members = members(&outcome.bytes);
        assert_eq!(members.len(), 2);
        assert_eq!(members["c.txt"], b"see");
        assert_eq!(members["d/e.txt"], b"eee");
    }

    #[tokio::test]
    async fn folder_archive_includes_nested_nonzero_objects_only() {
        let store = FakeStore::new(&[
            ("photos/", b""),
            ("photos/2024/a.jpg", b"aa"),
            ("photos/2024/deep/b.jpg", b"bb"),
            ("photos/marker/", b""),
            ("other/c.jpg", b"cc"),
        ])
        .with_page_size(2);

        let outcome = build_archive(&store, "demo", &[folder("photos/")])
            .await
            .unwrap();

        let members = members(&outcome.bytes);
        let names: Vec<&str> = members.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["2024/a.jpg", "2024/deep/b.jpg"]);
    }

    #[tokio::test]
    async fn overlapping_selection_packs_each_key_once() {
        let store = FakeStore::new(&[("docs/a.txt", b"a"), ("docs/sub/b.txt", b"b")]);

        let outcome = build_archive(&store, "demo", &[
            folder("docs/"),
            file("docs/a.txt"),
        ])
        .await
        .unwrap();

        assert_eq!(outcome.entry_count, 2);
        let members = members(&outcome.bytes);
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn mixed_selection_rewrites_against_the_item_base() {
        let store = FakeStore::new(&[
            ("proj/src/main.rs", b"fn"),
            ("proj/readme.md", b"hi"),
        ]);

        let outcome = build_archive(&store, "demo", &[
            folder("proj/src/"),
            file("proj/readme.md"),
        ])
        .await
        .unwrap();

        let members = members(&outcome.bytes);
        assert_eq!(members["src/main.rs"], b"fn");
        assert_eq!(members["readme.md"], b"hi");
    }

    #[tokio::test]
    async fn bare_folder_path_does_not_capture_sibling_prefixes() {
        let store = FakeStore::new(&[
            ("docs/a.txt", b"a"),
            ("docs2/b.txt", b"b"),
        ]);

        let outcome = build_archive(&store, "demo", &[folder("docs")])
            .await
            .unwrap();

        let members = members(&outcome.bytes);
        let names: Vec<&str> = members.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_and_names_the_key() {
        let mut store = FakeStore::new(&[("a/x.txt", b"x"), ("a/y.txt", b"y")]);
        store.fail_get = Some("a/y.txt".to_string());

        let err = build_archive(&store, "demo", &[folder("a/")])
            .await
            .unwrap_err();

        match err {
            ArchiveError::ObjectFetch { key, .. } => assert_eq!(key, "a/y.txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let store = FakeStore::new(&[]);
        assert!(matches!(
            build_archive(&store, "demo", &[]).await,
            Err(ArchiveError::EmptySelection)
        ));
    }

    #[tokio::test]
    async fn rebuilding_yields_the_same_member_set() {
        let store = FakeStore::new(&[
            ("d/1.bin", b"one"),
            ("d/2.bin", b"two"),
            ("d/n/3.bin", b"three"),
        ]);
        let selection = [folder("d/")];

        let first = build_archive(&store, "demo", &selection).await.unwrap();
        let second = build_archive(&store, "demo", &selection).await.unwrap();

        assert_eq!(members(&first.bytes), members(&second.bytes));
    }
}
