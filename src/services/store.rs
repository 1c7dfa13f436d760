//! Backend capability surface consumed by the listing and archive services.
//!
//! `ObjectStore` abstracts the four storage operations the console needs:
//! prefix-delimited listing, whole-object reads, uploads, and presigned
//! download URLs. The production implementation wraps `aws-sdk-s3`; tests use
//! an in-memory fake. Every SDK failure is classified into a `StoreError`
//! at the call site; raw SDK errors never cross this boundary.

use crate::models::bucket::BucketConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::{ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::models::listing::ObjectEntry;

pub const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Per-file upload ceiling, enforced before any backend call is issued.
pub const MAX_UPLOAD_BYTES: i64 = 100 * 1024 * 1024;

/// Typed failure surface for all backend calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("region mismatch: {0}")]
    RegionMismatch(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Unknown(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Parameters for one listing call.
#[derive(Clone, Debug, Default)]
pub struct ListRequest {
    pub prefix: String,
    /// `Some("/")` for the delimited directory view; `None` to expand keys
    /// at any depth (archive resolution).
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: i32,
}

/// Raw result of one listing call, before view-level filtering.
#[derive(Clone, Debug, Default)]
pub struct ListChunk {
    pub common_prefixes: Vec<String>,
    pub objects: Vec<ObjectEntry>,
    pub next_token: Option<String>,
}

/// The storage backend operations the console is built on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self, bucket: &str, req: ListRequest) -> StoreResult<ListChunk>;

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StoreResult<()>;

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<String>;
}

/// Reject keys that could escape the bucket namespace or corrupt listings.
///
/// Rejects empty or oversized keys, absolute paths, `..` segments, and
/// control bytes. Mirrors S3's own limits rather than its full grammar.
pub fn validate_object_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::Validation("object key must not be empty".into()));
    }
    if key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StoreError::Validation(format!(
            "object key exceeds {} bytes",
            MAX_OBJECT_KEY_LEN
        )));
    }
    if key.starts_with('/') || key.contains("..") {
        return Err(StoreError::Validation(format!(
            "object key `{}` is not a valid bucket-relative path",
            key
        )));
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(StoreError::Validation(
            "object key contains control characters".into(),
        ));
    }
    Ok(())
}

/// Enforce the per-file upload ceiling before touching the network.
pub fn validate_upload_size(file_name: &str, size_bytes: i64) -> StoreResult<()> {
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(StoreError::Validation(format!(
            "file \"{}\" is {} bytes, which exceeds the 100 MiB upload limit",
            file_name, size_bytes
        )));
    }
    Ok(())
}

/// One file of an upload batch, as received from the client.
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Per-file outcome of an upload batch. `key` is the destination key the
/// file was (or would have been) written to.
pub struct UploadOutcome {
    pub file_name: String,
    pub key: String,
    pub result: StoreResult<()>,
}

/// Upload a batch of files under `prefix`, sequentially and independently.
///
/// Each file is size- and key-validated before its backend call; a rejected
/// or failed file is reported in its slot and never blocks the files after
/// it.
pub async fn upload_batch(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    files: Vec<UploadFile>,
) -> Vec<UploadOutcome> {
    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        let key = format!("{}{}", prefix, file.file_name);
        let result = match validate_upload_size(&file.file_name, file.data.len() as i64)
            .and_then(|_| validate_object_key(&key))
        {
            Ok(()) => {
                store
                    .put_object(bucket, &key, file.data, &file.content_type)
                    .await
            }
            Err(err) => Err(err),
        };
        outcomes.push(UploadOutcome {
            file_name: file.file_name,
            key,
            result,
        });
    }
    outcomes
}

/// `ObjectStore` implementation over the AWS SDK.
///
/// One instance per bucket config: the client carries that config's region
/// and (optional) static credentials. Construction is cheap enough to do per
/// request, matching the one-action-at-a-time usage pattern.
pub struct AwsS3Store {
    client: Client,
}

impl AwsS3Store {
    /// Build a client for the given bucket config. Configs without
    /// credentials get an unsigned client for public/ambient access.
    pub async fn connect(config: &BucketConfig) -> Self {
        let region = Region::new(config.region.clone());
        let client = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let credentials = Credentials::new(
                    access_key_id.clone(),
                    secret_access_key.clone(),
                    None,
                    None,
                    "s3-console",
                );
                let conf = aws_sdk_s3::config::Builder::new()
                    .behavior_version_latest()
                    .region(region)
                    .credentials_provider(credentials)
                    .build();
                Client::from_conf(conf)
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .no_credentials()
                    .load()
                    .await;
                Client::new(&shared)
            }
        };
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for AwsS3Store {
    async fn list_objects(&self, bucket: &str, req: ListRequest) -> StoreResult<ListChunk> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(&req.prefix)
            .max_keys(req.max_keys.clamp(1, 1000));
        if let Some(delimiter) = &req.delimiter {
            request = request.delimiter(delimiter);
        }
        if let Some(token) = &req.continuation_token {
            request = request.continuation_token(token);
        }

        let output = request.send().await.map_err(classify_sdk_error)?;

        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(str::to_string))
            .collect();

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?.to_string();
                Some(ObjectEntry {
                    key,
                    size_bytes: obj.size().unwrap_or(0),
                    last_modified: obj.last_modified().and_then(smithy_datetime_to_utc),
                    storage_class: obj
                        .storage_class()
                        .map(|sc| sc.as_str().to_string())
                        .unwrap_or_else(|| "STANDARD".to_string()),
                })
            })
            .collect();

        let next_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListChunk {
            common_prefixes,
            objects,
            next_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::Network(format!("reading object body: {}", err)))?;
        Ok(data.into_bytes())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        validate_object_key(key)?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StoreError::Validation(format!("invalid presign expiry: {}", err)))?;
        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(classify_sdk_error)?;
        Ok(presigned.uri().to_string())
    }
}

fn smithy_datetime_to_utc(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(dt.to_millis().ok()?)
}

/// Map an SDK failure onto the `StoreError` taxonomy.
///
/// Classification follows the error code on service errors; transport-level
/// failures become `Network` with a remediation hint since a blocked or
/// unreachable endpoint is the most common cause for this tool.
fn classify_sdk_error<E>(err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(ctx) => {
            let code = ctx.err().code().unwrap_or_default().to_string();
            let message = ctx
                .err()
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("storage request failed ({})", code));
            let status = ctx.raw().status().as_u16();
            classify_service_error(&code, status, message)
        }
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => StoreError::Network(
            "could not reach the storage endpoint; check network connectivity and, for \
             browser-originated requests, the bucket CORS configuration"
                .to_string(),
        ),
        other => StoreError::Unknown(other.to_string()),
    }
}

/// Map an S3 error code (with its HTTP status as fallback) onto the taxonomy.
fn classify_service_error(code: &str, status: u16, message: String) -> StoreError {
    const REGION_HINT: &str =
        "the bucket lives in a different region; verify the configured region";

    match code {
        "NoSuchBucket" | "NoSuchKey" | "NotFound" => StoreError::NotFound(message),
        "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccessDenied" | "ExpiredToken"
        | "InvalidToken" => StoreError::Auth(message),
        "PermanentRedirect" | "AuthorizationHeaderMalformed" => {
            StoreError::RegionMismatch(REGION_HINT.to_string())
        }
        _ if status == 301 => StoreError::RegionMismatch(REGION_HINT.to_string()),
        _ if status == 403 => StoreError::Auth(message),
        _ if status == 404 => StoreError::NotFound(message),
        _ => StoreError::Unknown(message),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory `ObjectStore` used by the aggregator and assembler tests.

    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Fake backend over a sorted key -> bytes map. Emulates ListObjectsV2
    /// semantics: lexicographic order, prefix filtering, delimiter grouping,
    /// and key-cursor pagination.
    pub struct FakeStore {
        pub objects: BTreeMap<String, Bytes>,
        pub page_size: usize,
        /// Key whose fetch should fail, to exercise abort paths.
        pub fail_get: Option<String>,
        /// Key whose upload should fail, to exercise per-file independence.
        pub fail_put: Option<String>,
        /// Forced listing failure, to exercise the no-partial-update rule.
        pub fail_list: Option<StoreError>,
        pub uploads: Mutex<Vec<(String, Bytes)>>,
    }

    impl FakeStore {
        pub fn new(objects: &[(&str, &[u8])]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(k, v)| (k.to_string(), Bytes::copy_from_slice(v)))
                    .collect(),
                page_size: 1000,
                fail_get: None,
                fail_put: None,
                fail_list: None,
                uploads: Mutex::new(Vec::new()),
            }
        }

        pub fn with_page_size(mut self, page_size: usize) -> Self {
            self.page_size = page_size;
            self
        }
    }

    /// Group a key under its common prefix relative to the request, if the
    /// delimiter occurs past the requested prefix.
    fn group_key(key: &str, requested_prefix: &str, delimiter: &str) -> Option<String> {
        let rest = key.strip_prefix(requested_prefix)?;
        let pos = rest.find(delimiter)?;
        Some(format!(
            "{}{}",
            requested_prefix,
            &rest[..pos + delimiter.len()]
        ))
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn list_objects(&self, _bucket: &str, req: ListRequest) -> StoreResult<ListChunk> {
            if let Some(err) = &self.fail_list {
                return Err(err.clone());
            }

            let mut matching: Vec<&String> = self
                .objects
                .keys()
                .filter(|k| k.starts_with(&req.prefix))
                .collect();
            matching.sort();

            if let Some(token) = &req.continuation_token {
                matching.retain(|k| k.as_str() > token.as_str());
            }

            let page: Vec<&String> = matching.iter().take(self.page_size).cloned().collect();
            let next_token = if matching.len() > self.page_size {
                page.last().map(|k| k.to_string())
            } else {
                None
            };

            let mut common_prefixes = Vec::new();
            let mut objects = Vec::new();
            for key in page {
                if let Some(delimiter) = &req.delimiter {
                    if let Some(grouped) = group_key(key, &req.prefix, delimiter) {
                        if !common_prefixes.contains(&grouped) {
                            common_prefixes.push(grouped);
                        }
                        continue;
                    }
                }
                objects.push(ObjectEntry {
                    key: key.clone(),
                    size_bytes: self.objects[key].len() as i64,
                    last_modified: None,
                    storage_class: "STANDARD".to_string(),
                });
            }

            Ok(ListChunk {
                common_prefixes,
                objects,
                next_token,
            })
        }

        async fn get_object(&self, _bucket: &str, key: &str) -> StoreResult<Bytes> {
            if self.fail_get.as_deref() == Some(key) {
                return Err(StoreError::Unknown(format!("injected failure for `{}`", key)));
            }
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("no such key `{}`", key)))
        }

        async fn put_object(
            &self,
            _bucket: &str,
            key: &str,
            body: Bytes,
            _content_type: &str,
        ) -> StoreResult<()> {
            validate_object_key(key)?;
            if self.fail_put.as_deref() == Some(key) {
                return Err(StoreError::Network(format!("injected failure for `{}`", key)));
            }
            self.uploads
                .lock()
                .expect("uploads lock")
                .push((key.to_string(), body));
            Ok(())
        }

        async fn presign_get(
            &self,
            bucket: &str,
            key: &str,
            expires_in: Duration,
        ) -> StoreResult<String> {
            Ok(format!(
                "https://{}.example/{}?expires={}",
                bucket,
                key,
                expires_in.as_secs()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation_rejects_traversal_and_absolute_paths() {
        assert!(validate_object_key("docs/readme.txt").is_ok());
        assert!(matches!(
            validate_object_key("/etc/passwd"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            validate_object_key("a/../b"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            validate_object_key(""),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn upload_size_limit_names_the_file() {
        let size = 105 * 1024 * 1024;
        let err = validate_upload_size("video.mp4", size).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("video.mp4"));
        assert!(message.contains("100 MiB"));
        assert!(message.contains(&size.to_string()));
    }

    #[test]
    fn upload_at_the_limit_is_accepted() {
        assert!(validate_upload_size("exact.bin", MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_upload_size("over.bin", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn service_error_codes_map_onto_the_taxonomy() {
        let classify = |code, status| classify_service_error(code, status, "m".to_string());

        assert!(matches!(classify("NoSuchBucket", 404), StoreError::NotFound(_)));
        assert!(matches!(classify("NoSuchKey", 404), StoreError::NotFound(_)));
        assert!(matches!(
            classify("InvalidAccessKeyId", 403),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            classify("SignatureDoesNotMatch", 403),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            classify("PermanentRedirect", 301),
            StoreError::RegionMismatch(_)
        ));
        assert!(matches!(
            classify("AuthorizationHeaderMalformed", 400),
            StoreError::RegionMismatch(_)
        ));

        // Unrecognized codes fall back to the HTTP status.
        assert!(matches!(classify("", 301), StoreError::RegionMismatch(_)));
        assert!(matches!(classify("", 403), StoreError::Auth(_)));
        assert!(matches!(classify("", 404), StoreError::NotFound(_)));
        assert!(matches!(classify("SlowDown", 503), StoreError::Unknown(_)));
    }

    #[test]
    fn transport_failures_map_to_network_with_a_remediation_hint() {
        let err: SdkError<aws_sdk_s3::operation::get_object::GetObjectError> =
            SdkError::timeout_error("deadline elapsed");

        match classify_sdk_error(err) {
            StoreError::Network(message) => assert!(message.contains("CORS")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_file_does_not_block_the_rest_of_the_batch() {
        let store = testing::FakeStore::new(&[]);
        let files = vec![
            UploadFile {
                file_name: "../escape.txt".to_string(),
                content_type: "text/plain".to_string(),
                data: Bytes::from_static(b"nope"),
            },
            UploadFile {
                file_name: "ok.txt".to_string(),
                content_type: "text/plain".to_string(),
                data: Bytes::from_static(b"hello"),
            },
        ];

        let outcomes = upload_batch(&store, "demo", "incoming/", files).await;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(StoreError::Validation(_))
        ));
        assert!(outcomes[1].result.is_ok());
        assert_eq!(outcomes[1].key, "incoming/ok.txt");

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "incoming/ok.txt");
    }

    #[tokio::test]
    async fn backend_failure_is_reported_in_its_slot_only() {
        let mut store = testing::FakeStore::new(&[]);
        store.fail_put = Some("a.txt".to_string());
        let files = vec![
            UploadFile {
                file_name: "a.txt".to_string(),
                content_type: "text/plain".to_string(),
                data: Bytes::from_static(b"a"),
            },
            UploadFile {
                file_name: "b.txt".to_string(),
                content_type: "text/plain".to_string(),
                data: Bytes::from_static(b"b"),
            },
        ];

        let outcomes = upload_batch(&store, "demo", "", files).await;

        assert!(matches!(outcomes[0].result, Err(StoreError::Network(_))));
        assert!(outcomes[1].result.is_ok());
    }
}
