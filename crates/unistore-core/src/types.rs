use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncSeek};

use crate::error::StorageError;

/// Readable, seekable upload body.
pub trait ObjectBody: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

impl<T> ObjectBody for T where T: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

/// Object data returned by `get`. Dropping it releases the underlying connection.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Predefined access policy applied to a newly written object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    /// Owner gets full control, nobody else has access.
    Private,
    /// Owner gets full control, all other principals may read.
    PublicRead,
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acl::Private => write!(f, "private"),
            Acl::PublicRead => write!(f, "public-read"),
        }
    }
}

impl std::str::FromStr for Acl {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            _ => Err(StorageError::Config(format!("unknown ACL: {s}"))),
        }
    }
}

/// A stored object, or a directory placeholder synthesized from a
/// delimiter listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub bucket: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cache_control: String,
    /// Components accumulated by compose operations (GCS only).
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub component_count: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_disposition: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_encoding: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
    /// Content generation, used for object versioning.
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub generation: i64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class: String,
    /// Last metadata update, RFC 3339.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated: String,
    #[serde(default)]
    pub directory: bool,
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

impl Object {
    /// Common-prefix entry. Carries no content metadata.
    pub fn directory(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: prefix.into(),
            directory: true,
            ..Default::default()
        }
    }
}

/// Metadata returned by a point read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    pub accept_ranges: String,
    pub cache_control: String,
    pub content_disposition: String,
    pub content_encoding: String,
    pub content_language: String,
    pub content_length: u64,
    /// Portion of the object returned.
    pub content_range: String,
    pub content_type: String,
    pub etag: String,
    /// When the object stops being cacheable.
    pub expires: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
    pub storage_class: String,
}

/// Format a timestamp the way `Object::updated` carries it.
pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyRequest {
    pub source_bucket: String,
    pub source_key: String,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyResponse {
    pub etag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadRequest {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResponse {
    pub headers: Headers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRequest {
    pub bucket: String,
    pub key: String,
}

pub struct GetResponse {
    pub headers: Headers,
    pub body: ObjectReader,
}

impl fmt::Debug for GetResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetResponse")
            .field("headers", &self.headers)
            .field("body", &"[stream]")
            .finish()
    }
}

#[derive(Default)]
pub struct PutRequest {
    pub bucket: String,
    pub key: String,
    pub body: Option<Box<dyn ObjectBody>>,
    pub acl: Option<Acl>,
    pub cache_control: String,
    /// Sniffed from the body when empty.
    pub content_type: String,
    pub content_encoding: String,
    pub content_language: String,
    pub content_disposition: String,
    pub metadata: HashMap<String, String>,
}

impl PutRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        body: impl ObjectBody + 'static,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            body: Some(Box::new(body)),
            ..Default::default()
        }
    }
}

impl fmt::Debug for PutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutRequest")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("body", &self.body.as_ref().map(|_| "[stream]"))
            .field("acl", &self.acl)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutResponse {
    pub etag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequest {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteResponse {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteMultiRequest {
    pub bucket: String,
    pub keys: Vec<String>,
    /// Only report failures.
    pub quiet: bool,
}

/// One key a batch delete could not remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyError {
    pub key: String,
    pub code: String,
    pub message: String,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.key, self.message, self.code)
    }
}

impl std::error::Error for KeyError {}

/// Partial-success report. `keys` were deleted, `errors` were not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteMultiResponse {
    pub keys: Vec<String>,
    pub errors: Vec<KeyError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub bucket: String,
    pub prefix: String,
    /// Page size; 0 means backend default.
    pub size: usize,
    /// Cursor from a previous response, replayed verbatim.
    pub cursor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResponse {
    pub objects: Vec<Object>,
    /// Non-empty iff more pages remain.
    pub cursor: String,
}
