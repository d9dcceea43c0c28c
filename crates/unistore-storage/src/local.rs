use async_trait::async_trait;
use chrono::{DateTime, Utc};
use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use unistore_core::error::{Backend, Result, StorageError};
use unistore_core::service::StorageService;
use unistore_core::types::{
    Acl, CopyRequest, CopyResponse, DeleteMultiRequest, DeleteMultiResponse, DeleteRequest,
    DeleteResponse, GetRequest, GetResponse, HeadRequest, HeadResponse, Headers, KeyError,
    ListRequest, ListResponse, Object, ObjectBody, PutRequest, PutResponse, rfc3339,
};
use unistore_core::validate;

use crate::upload::resolve_content_type;

/// Sidecar metadata lives under `<root>/.meta/<bucket>/`.
const META_DIR: &str = ".meta";
/// In-flight uploads are staged here and renamed into place.
const TMP_DIR: &str = ".tmp";
const DEFAULT_PAGE: usize = 1000;
const COPY_BUF: usize = 64 * 1024;

/// Filesystem-backed storage for local development and tests.
///
/// Buckets are directories under `root`, keys are relative paths inside
/// them. Metadata a filesystem cannot hold is kept in a JSON sidecar per
/// object. I/O errors map to HTTP-like statuses: `NotFound` is 404,
/// `PermissionDenied` 403, keys that cannot be represented as paths 400.
pub struct LocalStorage {
    root: PathBuf,
    name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    cache_control: String,
    #[serde(default)]
    content_encoding: String,
    #[serde(default)]
    content_language: String,
    #[serde(default)]
    content_disposition: String,
    #[serde(default)]
    etag: String,
    #[serde(default)]
    acl: Option<Acl>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl LocalStorage {
    pub fn new(root: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            name: name.to_string(),
        })
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.starts_with('.') || bucket.contains(['/', '\\', '\0']) {
            return Err(unrepresentable(format!("bucket name {bucket:?}")));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        if !is_relative_path(key) {
            return Err(unrepresentable(format!("object name {key:?}")));
        }
        Ok(self.bucket_path(bucket)?.join(key))
    }

    fn meta_path(&self, bucket: &str, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.root
            .join(META_DIR)
            .join(bucket)
            .join(format!("{digest}.json"))
    }

    async fn read_sidecar(&self, bucket: &str, key: &str) -> Result<Sidecar> {
        match fs::read(self.meta_path(bucket, key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::backend(Backend::Local, None, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn write_sidecar(&self, bucket: &str, key: &str, sidecar: &Sidecar) -> Result<()> {
        let path = self.meta_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let data = serde_json::to_vec_pretty(sidecar)
            .map_err(|e| StorageError::backend(Backend::Local, None, e))?;
        fs::write(&path, data).await.map_err(io_error)
    }

    /// Stream `body` into a staging file, then rename it over `dest`.
    /// Returns the quoted MD5 etag of what was written.
    async fn write_object(&self, dest: &Path, body: &mut dyn ObjectBody) -> Result<String> {
        let staging = self.root.join(TMP_DIR);
        fs::create_dir_all(&staging).await.map_err(io_error)?;
        let tmp = staging.join(uuid::Uuid::now_v7().to_string());

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            let mut hasher = Md5::new();
            let mut buf = vec![0u8; COPY_BUF];
            loop {
                let n = body.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                file.write_all(&buf[..n]).await?;
            }
            file.flush().await?;
            drop(file);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&tmp, dest).await?;
            Ok::<_, std::io::Error>(format!("\"{}\"", hex::encode(hasher.finalize())))
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        result.map_err(io_error)
    }

    /// Metadata of a stored object. Directories are not objects.
    async fn stat(&self, path: &Path) -> Result<std::fs::Metadata> {
        let meta = fs::metadata(path).await.map_err(io_error)?;
        if meta.is_dir() {
            return Err(io_error(std::io::Error::new(
                ErrorKind::NotFound,
                "no such object",
            )));
        }
        Ok(meta)
    }

    async fn headers(&self, bucket: &str, key: &str) -> Result<(PathBuf, Headers)> {
        let path = self.object_path(bucket, key)?;
        let meta = self.stat(&path).await?;
        let sidecar = self.read_sidecar(bucket, key).await?;

        let headers = Headers {
            cache_control: sidecar.cache_control,
            content_disposition: sidecar.content_disposition,
            content_encoding: sidecar.content_encoding,
            content_language: sidecar.content_language,
            content_length: meta.len(),
            content_type: sidecar.content_type,
            etag: sidecar.etag,
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            metadata: sidecar.metadata,
            ..Default::default()
        };
        Ok((path, headers))
    }

    /// Remove now-empty directories between `path` and its bucket directory.
    async fn prune_empty_dirs(&self, bucket_dir: &Path, path: &Path) {
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == bucket_dir || !d.starts_with(bucket_dir) {
                break;
            }
            if fs::remove_dir(d).await.is_err() {
                break;
            }
            dir = d.parent();
        }
    }

    async fn delete_one(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(StorageError::backend(
                    Backend::Local,
                    Some(409),
                    std::io::Error::other(format!("{key} is a directory")),
                ));
            }
            Ok(_) => fs::remove_file(&path).await.map_err(io_error)?,
            // deleting a missing key is a no-op
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(e)),
        }

        match fs::remove_file(self.meta_path(bucket, key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e)),
        }
        self.prune_empty_dirs(&self.bucket_path(bucket)?, &path).await;
        Ok(())
    }

    async fn file_object(&self, bucket: &str, key: String, path: &Path) -> Result<Object> {
        let meta = fs::metadata(path).await.map_err(io_error)?;
        let sidecar = self.read_sidecar(bucket, &key).await?;
        Ok(Object {
            bucket: bucket.to_string(),
            name: key,
            cache_control: sidecar.cache_control,
            content_disposition: sidecar.content_disposition,
            content_encoding: sidecar.content_encoding,
            content_language: sidecar.content_language,
            content_type: sidecar.content_type,
            etag: sidecar.etag,
            metadata: sidecar.metadata,
            size: meta.len(),
            updated: meta
                .modified()
                .ok()
                .map(|t| rfc3339(DateTime::<Utc>::from(t)))
                .unwrap_or_default(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn copy(&self, req: CopyRequest) -> Result<CopyResponse> {
        validate::bucket_and_key(&req.source_bucket, &req.source_key)?;
        validate::bucket_and_key(&req.bucket, &req.key)?;

        debug!(
            src_bucket = %req.source_bucket,
            src_key = %req.source_key,
            bucket = %req.bucket,
            key = %req.key,
            "local copy"
        );
        let src = self.object_path(&req.source_bucket, &req.source_key)?;
        let dest = self.object_path(&req.bucket, &req.key)?;
        self.stat(&src).await?;
        let sidecar = self
            .read_sidecar(&req.source_bucket, &req.source_key)
            .await?;

        let mut file = fs::File::open(&src).await.map_err(io_error)?;
        let etag = self.write_object(&dest, &mut file).await?;
        let sidecar = Sidecar { etag, ..sidecar };
        self.write_sidecar(&req.bucket, &req.key, &sidecar).await?;

        Ok(CopyResponse { etag: sidecar.etag })
    }

    async fn head(&self, req: HeadRequest) -> Result<HeadResponse> {
        validate::bucket_and_key(&req.bucket, &req.key)?;

        debug!(bucket = %req.bucket, key = %req.key, "local head");
        let (_, headers) = self.headers(&req.bucket, &req.key).await?;
        Ok(HeadResponse { headers })
    }

    async fn get(&self, req: GetRequest) -> Result<GetResponse> {
        validate::bucket_and_key(&req.bucket, &req.key)?;

        debug!(bucket = %req.bucket, key = %req.key, "local get");
        let (path, headers) = self.headers(&req.bucket, &req.key).await?;
        let file = fs::File::open(&path).await.map_err(io_error)?;
        Ok(GetResponse {
            headers,
            body: Box::pin(file),
        })
    }

    async fn put(&self, req: PutRequest) -> Result<PutResponse> {
        validate::bucket_and_key(&req.bucket, &req.key)?;
        let mut body = validate::body(req.body)?;
        let path = self.object_path(&req.bucket, &req.key)?;

        let content_type = resolve_content_type(&req.content_type, body.as_mut()).await?;

        debug!(bucket = %req.bucket, key = %req.key, %content_type, "local put");
        let etag = self.write_object(&path, body.as_mut()).await?;
        let sidecar = Sidecar {
            content_type,
            cache_control: req.cache_control,
            content_encoding: req.content_encoding,
            content_language: req.content_language,
            content_disposition: req.content_disposition,
            etag,
            acl: req.acl,
            metadata: req.metadata,
        };
        self.write_sidecar(&req.bucket, &req.key, &sidecar).await?;

        Ok(PutResponse { etag: sidecar.etag })
    }

    async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
        validate::bucket_and_key(&req.bucket, &req.key)?;

        debug!(bucket = %req.bucket, key = %req.key, "local delete");
        self.delete_one(&req.bucket, &req.key).await?;
        Ok(DeleteResponse {})
    }

    async fn delete_multi(&self, req: DeleteMultiRequest) -> Result<DeleteMultiResponse> {
        validate::bucket(&req.bucket)?;
        for key in &req.keys {
            validate::key(key)?;
        }

        let mut out = DeleteMultiResponse::default();
        for key in &req.keys {
            match self.delete_one(&req.bucket, key).await {
                Ok(()) => {
                    if !req.quiet {
                        out.keys.push(key.clone());
                    }
                }
                Err(e) => out.errors.push(KeyError {
                    key: key.clone(),
                    code: e
                        .status()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    message: e.to_string(),
                }),
            }
        }

        if !out.errors.is_empty() {
            warn!(
                bucket = %req.bucket,
                failed = out.errors.len(),
                "local batch delete partially failed"
            );
        }
        Ok(out)
    }

    async fn list(&self, req: ListRequest) -> Result<ListResponse> {
        validate::bucket(&req.bucket)?;

        debug!(bucket = %req.bucket, prefix = %req.prefix, cursor = %req.cursor, "local list");
        let bucket_dir = self.bucket_path(&req.bucket)?;
        if !fs::metadata(&bucket_dir)
            .await
            .map_err(io_error)?
            .is_dir()
        {
            return Err(io_error(std::io::Error::new(
                ErrorKind::NotFound,
                "no such bucket",
            )));
        }

        // Only the directory holding the prefix's last segment needs reading.
        let dir_part = match req.prefix.rfind('/') {
            Some(i) => &req.prefix[..=i],
            None => "",
        };
        // A prefix whose directory part is not a relative path inside the
        // bucket cannot match any stored key.
        if !dir_part.is_empty() && !is_relative_path(&dir_part[..dir_part.len() - 1]) {
            debug!(prefix = %req.prefix, "prefix names no storable key");
            return Ok(ListResponse::default());
        }
        let scan_dir = bucket_dir.join(dir_part);

        let mut entries: Vec<(String, bool)> = Vec::new();
        let mut rd = match fs::read_dir(&scan_dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ListResponse::default());
            }
            Err(e) => return Err(io_error(e)),
        };
        while let Some(entry) = rd.next_entry().await.map_err(io_error)? {
            let Ok(file_name) = entry.file_name().into_string() else {
                warn!(dir = %scan_dir.display(), "skipping non UTF-8 file name");
                continue;
            };
            let is_dir = entry.file_type().await.map_err(io_error)?.is_dir();
            let name = if is_dir {
                format!("{dir_part}{file_name}/")
            } else {
                format!("{dir_part}{file_name}")
            };
            if !name.starts_with(&req.prefix) {
                continue;
            }
            if is_dir {
                let path = entry.path();
                let has_file = tokio::task::spawn_blocking(move || contains_file(&path))
                    .await
                    .map_err(|e| StorageError::backend(Backend::Local, None, e))?;
                if !has_file {
                    continue;
                }
            }
            entries.push((name, is_dir));
        }
        entries.sort();

        let page = if req.size > 0 { req.size } else { DEFAULT_PAGE };
        let remaining: Vec<_> = entries
            .into_iter()
            .filter(|(name, _)| req.cursor.is_empty() || name.as_str() > req.cursor.as_str())
            .collect();
        let more = remaining.len() > page;
        let taken = &remaining[..remaining.len().min(page)];

        let mut directories = Vec::new();
        let mut files = Vec::new();
        for (name, is_dir) in taken {
            if *is_dir {
                directories.push(Object::directory(&req.bucket, name.clone()));
            } else {
                let path = bucket_dir.join(name);
                files.push(self.file_object(&req.bucket, name.clone(), &path).await?);
            }
        }

        let cursor = match (more, taken.last()) {
            (true, Some((name, _))) => name.clone(),
            _ => String::new(),
        };
        directories.extend(files);
        Ok(ListResponse {
            objects: directories,
            cursor,
        })
    }

    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn io_error(err: std::io::Error) -> StorageError {
    let status = match err.kind() {
        ErrorKind::NotFound => Some(404),
        ErrorKind::PermissionDenied => Some(403),
        ErrorKind::InvalidInput => Some(400),
        _ => None,
    };
    StorageError::backend(Backend::Local, status, err)
}

fn unrepresentable(what: String) -> StorageError {
    io_error(std::io::Error::new(
        ErrorKind::InvalidInput,
        format!("{what} cannot be stored on a local filesystem"),
    ))
}

/// Non-empty `/`-separated segments, none of them `.` or `..`, and no
/// characters that would let the path leave its bucket directory.
fn is_relative_path(path: &str) -> bool {
    !path.contains(['\\', '\0'])
        && path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Whether a directory holds at least one file somewhere below it.
/// Blocking; run it off the async executor.
fn contains_file(dir: &Path) -> bool {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return false;
    };
    rd.flatten().any(|entry| match entry.file_type() {
        Ok(ft) if ft.is_dir() => contains_file(&entry.path()),
        Ok(_) => true,
        Err(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Cursor;
    use tempfile::TempDir;
    use unistore_core::error::{ValidationError, is_client_error, is_not_found};

    fn store() -> (TempDir, LocalStorage) {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "test-local").unwrap();
        (tmp, storage)
    }

    async fn put(storage: &LocalStorage, bucket: &str, key: &str, data: &[u8]) {
        storage
            .put(PutRequest::new(bucket, key, Cursor::new(data.to_vec())))
            .await
            .unwrap();
    }

    async fn read_all(resp: GetResponse) -> Vec<u8> {
        let mut body = resp.body;
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn validation_runs_before_touching_the_filesystem() {
        let (tmp, storage) = store();
        std::fs::remove_dir_all(tmp.path()).unwrap();

        let err = storage
            .put(PutRequest::new("", "k", Cursor::new(b"x".to_vec())))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::EmptyBucket)));

        let err = storage
            .put(PutRequest::new("b", "", Cursor::new(b"x".to_vec())))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::EmptyKey)));

        let err = storage
            .put(PutRequest {
                bucket: "b".into(),
                key: "k".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::MissingBody)));

        let err = storage
            .delete(DeleteRequest {
                bucket: "b".into(),
                key: String::new(),
            })
            .await
            .unwrap_err();
        assert!(!err.is_backend_error());

        let err = storage.list(ListRequest::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::EmptyBucket)));

        // nothing was created by any of the rejected calls
        assert!(!tmp.path().exists());
    }

    #[tokio::test]
    async fn put_then_head_and_get_roundtrip_metadata() {
        let (_tmp, storage) = store();
        let data = b"hello from unistore";

        let put = storage
            .put(PutRequest {
                bucket: "docs".into(),
                key: "notes/today.txt".into(),
                body: Some(Box::new(Cursor::new(data.to_vec()))),
                acl: Some(Acl::PublicRead),
                cache_control: "max-age=60".into(),
                content_type: "text/markdown".into(),
                content_encoding: "identity".into(),
                content_language: "en".into(),
                content_disposition: "inline".into(),
                metadata: HashMap::from([("owner".to_string(), "alice".to_string())]),
            })
            .await
            .unwrap();
        assert!(put.etag.starts_with('"'));

        let head = storage
            .head(HeadRequest {
                bucket: "docs".into(),
                key: "notes/today.txt".into(),
            })
            .await
            .unwrap()
            .headers;
        assert_eq!(head.content_type, "text/markdown");
        assert_eq!(head.cache_control, "max-age=60");
        assert_eq!(head.content_encoding, "identity");
        assert_eq!(head.content_language, "en");
        assert_eq!(head.content_disposition, "inline");
        assert_eq!(head.content_length, data.len() as u64);
        assert_eq!(head.etag, put.etag);
        assert_eq!(head.metadata.get("owner").map(String::as_str), Some("alice"));
        assert!(head.last_modified.is_some());

        let get = storage
            .get(GetRequest {
                bucket: "docs".into(),
                key: "notes/today.txt".into(),
            })
            .await
            .unwrap();
        assert_eq!(get.headers, head);
        assert_eq!(read_all(get).await, data);
    }

    #[tokio::test]
    async fn content_type_is_sniffed_without_consuming_the_body() {
        let (_tmp, storage) = store();
        let png = b"\x89PNG\x0D\x0A\x1A\x0A-not-really-a-png";
        put(&storage, "img", "logo.png", png).await;

        let get = storage
            .get(GetRequest {
                bucket: "img".into(),
                key: "logo.png".into(),
            })
            .await
            .unwrap();
        assert_eq!(get.headers.content_type, "image/png");
        assert_eq!(read_all(get).await, png);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let (_tmp, storage) = store();
        put(&storage, "b", "exists", b"x").await;

        let err = storage
            .get(GetRequest {
                bucket: "b".into(),
                key: "missing".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_backend_error());
        assert!(is_not_found(&err));
        assert!(is_client_error(&err));

        let err = storage
            .head(HeadRequest {
                bucket: "nobucket".into(),
                key: "k".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_prunes_directories() {
        let (tmp, storage) = store();
        put(&storage, "b", "a/b/c.txt", b"x").await;

        let req = DeleteRequest {
            bucket: "b".into(),
            key: "a/b/c.txt".into(),
        };
        storage.delete(req.clone()).await.unwrap();
        storage.delete(req).await.unwrap();

        assert!(!tmp.path().join("b/a").exists());
        let listing = storage
            .list(ListRequest {
                bucket: "b".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(listing.objects.is_empty());
    }

    #[tokio::test]
    async fn delete_multi_reports_partial_failure() {
        let (_tmp, storage) = store();
        put(&storage, "b", "A", b"a").await;
        put(&storage, "b", "B/inner", b"b").await;
        put(&storage, "b", "C", b"c").await;

        let resp = storage
            .delete_multi(DeleteMultiRequest {
                bucket: "b".into(),
                keys: vec!["A".into(), "B".into(), "C".into()],
                quiet: false,
            })
            .await
            .unwrap();

        assert_eq!(resp.keys, vec!["A", "C"]);
        assert_eq!(resp.errors.len(), 1);
        assert_eq!(resp.errors[0].key, "B");
        assert_eq!(resp.errors[0].code, "409");
    }

    #[tokio::test]
    async fn quiet_delete_multi_only_reports_failures() {
        let (_tmp, storage) = store();
        put(&storage, "b", "one", b"1").await;
        put(&storage, "b", "two", b"2").await;

        let resp = storage
            .delete_multi(DeleteMultiRequest {
                bucket: "b".into(),
                keys: vec!["one".into(), "two".into()],
                quiet: true,
            })
            .await
            .unwrap();
        assert!(resp.keys.is_empty());
        assert!(resp.errors.is_empty());
    }

    #[tokio::test]
    async fn list_groups_common_prefixes_into_directories() {
        let (_tmp, storage) = store();
        for key in ["readme.txt", "photos/1.jpg", "photos/2.jpg", "docs/a/b.txt"] {
            put(&storage, "b", key, b"data").await;
        }

        let root = storage
            .list(ListRequest {
                bucket: "b".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = root
            .objects
            .iter()
            .map(|o| (o.name.as_str(), o.directory))
            .collect();
        assert_eq!(
            names,
            vec![("docs/", true), ("photos/", true), ("readme.txt", false)]
        );
        assert!(root.cursor.is_empty());
        assert_eq!(root.objects[0].size, 0);
        assert_eq!(root.objects[2].size, 4);

        let photos = storage
            .list(ListRequest {
                bucket: "b".into(),
                prefix: "photos/".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = photos.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["photos/1.jpg", "photos/2.jpg"]);

        let partial = storage
            .list(ListRequest {
                bucket: "b".into(),
                prefix: "pho".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(partial.objects.len(), 1);
        assert_eq!(partial.objects[0].name, "photos/");
    }

    #[tokio::test]
    async fn paginated_listing_matches_single_listing() {
        let (_tmp, storage) = store();
        for i in 0..10 {
            put(&storage, "b", &format!("file-{i:02}"), b"x").await;
            put(&storage, "b", &format!("dir-{i:02}/inner"), b"x").await;
        }

        let full = storage
            .list(ListRequest {
                bucket: "b".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(full.cursor.is_empty());
        let expected: BTreeSet<String> = full.objects.into_iter().map(|o| o.name).collect();
        assert_eq!(expected.len(), 20);

        let mut seen = Vec::new();
        let mut cursor = String::new();
        let mut pages = 0;
        loop {
            let page = storage
                .list(ListRequest {
                    bucket: "b".into(),
                    size: 3,
                    cursor: cursor.clone(),
                    ..Default::default()
                })
                .await
                .unwrap();
            pages += 1;
            assert!(page.objects.len() <= 3);
            seen.extend(page.objects.into_iter().map(|o| o.name));
            if page.cursor.is_empty() {
                break;
            }
            cursor = page.cursor;
        }

        assert_eq!(pages, 7);
        assert_eq!(seen.len(), expected.len());
        let seen_set: BTreeSet<String> = seen.into_iter().collect();
        assert_eq!(seen_set, expected);
    }

    #[tokio::test]
    async fn copy_keeps_content_and_metadata() {
        let (_tmp, storage) = store();
        storage
            .put(PutRequest {
                bucket: "src".into(),
                key: "report.csv".into(),
                body: Some(Box::new(Cursor::new(b"a,b\n1,2\n".to_vec()))),
                content_type: "text/csv".into(),
                metadata: HashMap::from([("rev".to_string(), "7".to_string())]),
                ..Default::default()
            })
            .await
            .unwrap();

        let copied = storage
            .copy(CopyRequest {
                source_bucket: "src".into(),
                source_key: "report.csv".into(),
                bucket: "dst".into(),
                key: "archive/report.csv".into(),
            })
            .await
            .unwrap();

        let get = storage
            .get(GetRequest {
                bucket: "dst".into(),
                key: "archive/report.csv".into(),
            })
            .await
            .unwrap();
        assert_eq!(get.headers.content_type, "text/csv");
        assert_eq!(get.headers.etag, copied.etag);
        assert_eq!(get.headers.metadata.get("rev").map(String::as_str), Some("7"));
        assert_eq!(read_all(get).await, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn copy_from_missing_source_is_not_found() {
        let (_tmp, storage) = store();
        let err = storage
            .copy(CopyRequest {
                source_bucket: "src".into(),
                source_key: "nope".into(),
                bucket: "dst".into(),
                key: "k".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn prefixes_escaping_the_bucket_list_nothing() {
        let (_tmp, storage) = store();
        put(&storage, "mine", "k", b"mine").await;
        put(&storage, "mine", "a/b.txt", b"nested").await;
        put(&storage, "other", "secret.txt", b"not yours").await;

        for prefix in ["../", "../other/", "../other/sec", "/etc/", "/", "a//", "./", "a/../"] {
            let resp = storage
                .list(ListRequest {
                    bucket: "mine".into(),
                    prefix: prefix.into(),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert!(resp.objects.is_empty(), "prefix {prefix:?}: {:?}", resp.objects);
            assert!(resp.cursor.is_empty());
        }

        // ordinary prefixes still work
        let resp = storage
            .list(ListRequest {
                bucket: "mine".into(),
                prefix: "a/".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = resp.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a/b.txt"]);
    }

    #[test]
    fn relative_path_rules() {
        assert!(is_relative_path("a"));
        assert!(is_relative_path("a/b/c.txt"));
        assert!(!is_relative_path(""));
        assert!(!is_relative_path("/etc"));
        assert!(!is_relative_path("a//b"));
        assert!(!is_relative_path(".."));
        assert!(!is_relative_path("a/./b"));
        assert!(!is_relative_path("a\\b"));
    }

    #[tokio::test]
    async fn empty_directories_are_not_listed() {
        let (tmp, storage) = store();
        put(&storage, "b", "kept/file", b"x").await;
        std::fs::create_dir_all(tmp.path().join("b/hollow/deeper")).unwrap();

        let resp = storage
            .list(ListRequest {
                bucket: "b".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = resp.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["kept/"]);
    }

    #[tokio::test]
    async fn keys_escaping_the_bucket_are_client_errors() {
        let (_tmp, storage) = store();
        for key in ["../escape", "a/../../b", "/abs", "dir/"] {
            let err = storage
                .put(PutRequest::new("b", key, Cursor::new(b"x".to_vec())))
                .await
                .unwrap_err();
            assert_eq!(err.status(), Some(400), "key {key:?}");
            assert!(err.is_client_error());
        }
    }
}
