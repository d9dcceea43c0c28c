#[cfg(feature = "s3")]
mod inner {
    use async_trait::async_trait;
    use aws_sdk_s3::Client;
    use aws_sdk_s3::config::http::HttpResponse;
    use aws_sdk_s3::error::SdkError;
    use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
    use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
    use aws_sdk_s3::primitives::{ByteStream, DateTime};
    use aws_sdk_s3::types::{Delete, MetadataDirective, ObjectCannedAcl, ObjectIdentifier};
    use futures::TryStreamExt;
    use http_body::Frame;
    use http_body_util::StreamBody;
    use tokio_util::io::ReaderStream;
    use tracing::{debug, warn};

    use unistore_core::error::{Backend, Result, StorageError};
    use unistore_core::service::StorageService;
    use unistore_core::types::{
        Acl, CopyRequest, CopyResponse, DeleteMultiRequest, DeleteMultiResponse, DeleteRequest,
        DeleteResponse, GetRequest, GetResponse, HeadRequest, HeadResponse, Headers, KeyError,
        ListRequest, ListResponse, Object, PutRequest, PutResponse, rfc3339,
    };
    use unistore_core::validate;

    use crate::upload::{non_empty, remaining_len, resolve_content_type};

    /// Point-read headers. HeadObject and GetObject outputs expose the same
    /// getters without sharing a trait.
    macro_rules! headers {
        ($out:expr) => {
            Headers {
                accept_ranges: string($out.accept_ranges()),
                cache_control: string($out.cache_control()),
                content_disposition: string($out.content_disposition()),
                content_encoding: string($out.content_encoding()),
                content_language: string($out.content_language()),
                content_length: $out.content_length().unwrap_or(0).max(0) as u64,
                content_range: String::new(),
                content_type: string($out.content_type()),
                etag: string($out.e_tag()),
                expires: string($out.expires_string()),
                last_modified: timestamp($out.last_modified()),
                metadata: $out.metadata().cloned().unwrap_or_default(),
                storage_class: string($out.storage_class().map(|s| s.as_str())),
            }
        };
    }

    /// DeleteObjects accepts at most this many keys per call.
    const DELETE_BATCH: usize = 1000;

    /// AWS S3 and S3-compatible storage.
    ///
    /// Works with AWS S3, MinIO, RustFS, Garage, Ceph RGW, SeaweedFS,
    /// and any other service implementing the S3 API.
    pub struct S3Storage {
        client: Client,
        name: String,
    }

    /// Options for creating an S3 client.
    pub struct S3Options<'a> {
        pub region: Option<&'a str>,
        pub name: &'a str,
        /// Custom endpoint URL (e.g. `http://localhost:9000` for MinIO).
        pub endpoint_url: Option<&'a str>,
        /// Force path-style addressing (`http://host/bucket/key` instead of `http://bucket.host/key`).
        /// Most S3-compatible servers require this.
        pub path_style: bool,
        /// Explicit access key. If None, uses env/profile credentials.
        pub access_key: Option<&'a str>,
        /// Explicit secret key. If None, uses env/profile credentials.
        pub secret_key: Option<&'a str>,
    }

    impl S3Storage {
        /// Wrap an already configured client.
        pub fn from_client(client: Client, name: &str) -> Self {
            Self {
                client,
                name: name.to_string(),
            }
        }

        /// Create for standard AWS S3.
        pub async fn new(region: Option<&str>, name: &str) -> Result<Self> {
            Self::with_options(S3Options {
                region,
                name,
                endpoint_url: None,
                path_style: false,
                access_key: None,
                secret_key: None,
            })
            .await
        }

        /// Create with full options.
        pub async fn with_options(opts: S3Options<'_>) -> Result<Self> {
            let mut config_loader = aws_config::from_env();

            if let Some(r) = opts.region {
                config_loader = config_loader.region(aws_config::Region::new(r.to_string()));
            }

            match (opts.access_key, opts.secret_key) {
                (Some(ak), Some(sk)) => {
                    let creds =
                        aws_sdk_s3::config::Credentials::new(ak, sk, None, None, "unistore-config");
                    config_loader = config_loader.credentials_provider(creds);
                }
                (None, None) => {}
                _ => {
                    return Err(StorageError::Config(
                        "access_key and secret_key must be set together".to_string(),
                    ));
                }
            }

            let sdk_config = config_loader.load().await;

            let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

            if let Some(endpoint) = opts.endpoint_url {
                s3_config_builder = s3_config_builder.endpoint_url(endpoint);
            }

            if opts.path_style {
                s3_config_builder = s3_config_builder.force_path_style(true);
            }

            let client = Client::from_conf(s3_config_builder.build());

            Ok(Self::from_client(client, opts.name))
        }
    }

    #[async_trait]
    impl StorageService for S3Storage {
        async fn copy(&self, req: CopyRequest) -> Result<CopyResponse> {
            validate::bucket_and_key(&req.source_bucket, &req.source_key)?;
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(
                src_bucket = %req.source_bucket,
                src_key = %req.source_key,
                bucket = %req.bucket,
                key = %req.key,
                "s3 copy"
            );
            let resp = self
                .client
                .copy_object()
                .copy_source(copy_source(&req.source_bucket, &req.source_key))
                .bucket(&req.bucket)
                .key(&req.key)
                .metadata_directive(MetadataDirective::Copy)
                .send()
                .await
                .map_err(sdk_error)?;

            Ok(CopyResponse {
                etag: resp
                    .copy_object_result()
                    .and_then(|r| r.e_tag())
                    .unwrap_or_default()
                    .to_string(),
            })
        }

        async fn head(&self, req: HeadRequest) -> Result<HeadResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(bucket = %req.bucket, key = %req.key, "s3 head");
            let resp = self
                .client
                .head_object()
                .bucket(&req.bucket)
                .key(&req.key)
                .send()
                .await
                .map_err(sdk_error)?;

            Ok(HeadResponse {
                headers: headers!(resp),
            })
        }

        async fn get(&self, req: GetRequest) -> Result<GetResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(bucket = %req.bucket, key = %req.key, "s3 get");
            let resp = self
                .client
                .get_object()
                .bucket(&req.bucket)
                .key(&req.key)
                .send()
                .await
                .map_err(sdk_error)?;

            let mut headers = headers!(resp);
            headers.content_range = string(resp.content_range());

            Ok(GetResponse {
                headers,
                body: Box::pin(resp.body.into_async_read()),
            })
        }

        async fn put(&self, req: PutRequest) -> Result<PutResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;
            let mut body = validate::body(req.body)?;

            let content_type = resolve_content_type(&req.content_type, body.as_mut()).await?;
            let length = remaining_len(body.as_mut()).await?;

            debug!(bucket = %req.bucket, key = %req.key, length, %content_type, "s3 put");
            let frames = ReaderStream::new(body).map_ok(Frame::data);
            let stream = ByteStream::from_body_1_x(StreamBody::new(frames));

            let metadata = (!req.metadata.is_empty()).then_some(req.metadata);
            let resp = self
                .client
                .put_object()
                .bucket(&req.bucket)
                .key(&req.key)
                .body(stream)
                .content_length(length as i64)
                .set_content_type(non_empty(&content_type))
                .set_acl(req.acl.map(canned_acl))
                .set_cache_control(non_empty(&req.cache_control))
                .set_content_encoding(non_empty(&req.content_encoding))
                .set_content_language(non_empty(&req.content_language))
                .set_content_disposition(non_empty(&req.content_disposition))
                .set_metadata(metadata)
                .send()
                .await
                .map_err(sdk_error)?;

            Ok(PutResponse {
                etag: string(resp.e_tag()),
            })
        }

        async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(bucket = %req.bucket, key = %req.key, "s3 delete");
            self.client
                .delete_object()
                .bucket(&req.bucket)
                .key(&req.key)
                .send()
                .await
                .map_err(sdk_error)?;
            Ok(DeleteResponse {})
        }

        async fn delete_multi(&self, req: DeleteMultiRequest) -> Result<DeleteMultiResponse> {
            validate::bucket(&req.bucket)?;
            for key in &req.keys {
                validate::key(key)?;
            }

            let mut out = DeleteMultiResponse::default();
            for (n, batch) in req.keys.chunks(DELETE_BATCH).enumerate() {
                debug!(bucket = %req.bucket, keys = batch.len(), "s3 delete objects");
                let objects = batch
                    .iter()
                    .map(|key| ObjectIdentifier::builder().key(key).build())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| StorageError::backend(Backend::S3, None, e))?;
                let delete = Delete::builder()
                    .set_objects(Some(objects))
                    .quiet(req.quiet)
                    .build()
                    .map_err(|e| StorageError::backend(Backend::S3, None, e))?;

                let result = self
                    .client
                    .delete_objects()
                    .bucket(&req.bucket)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(sdk_error);
                absorb_batch(&mut out, batch, result, n == 0)?;
            }

            if !out.errors.is_empty() {
                warn!(
                    bucket = %req.bucket,
                    failed = out.errors.len(),
                    "s3 batch delete partially failed"
                );
            }
            Ok(out)
        }

        async fn list(&self, req: ListRequest) -> Result<ListResponse> {
            validate::bucket(&req.bucket)?;

            debug!(bucket = %req.bucket, prefix = %req.prefix, cursor = %req.cursor, "s3 list");
            let max_keys = (req.size > 0).then(|| req.size.min(i32::MAX as usize) as i32);
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&req.bucket)
                .delimiter("/")
                .set_prefix(non_empty(&req.prefix))
                .set_max_keys(max_keys)
                .set_continuation_token(non_empty(&req.cursor))
                .send()
                .await
                .map_err(sdk_error)?;

            Ok(list_response(&req.bucket, &resp))
        }

        fn backend(&self) -> Backend {
            Backend::S3
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn string(v: Option<&str>) -> String {
        v.unwrap_or_default().to_string()
    }

    fn timestamp(dt: Option<&DateTime>) -> Option<chrono::DateTime<chrono::Utc>> {
        dt.and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
    }

    fn canned_acl(acl: Acl) -> ObjectCannedAcl {
        match acl {
            Acl::Private => ObjectCannedAcl::Private,
            Acl::PublicRead => ObjectCannedAcl::PublicRead,
        }
    }

    /// `bucket/key` with the key URL-encoded, as CopyObject expects.
    fn copy_source(bucket: &str, key: &str) -> String {
        let mut out = String::with_capacity(bucket.len() + key.len() + 1);
        out.push_str(bucket);
        out.push('/');
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~' | b'/') {
                out.push(b as char);
            } else {
                out.push_str(&format!("%{b:02X}"));
            }
        }
        out
    }

    fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|r| r.status().as_u16());
        StorageError::backend(Backend::S3, status, err)
    }

    fn delete_multi_response(resp: &DeleteObjectsOutput) -> DeleteMultiResponse {
        DeleteMultiResponse {
            keys: resp
                .deleted()
                .iter()
                .map(|d| string(d.key()))
                .collect(),
            errors: resp
                .errors()
                .iter()
                .map(|e| KeyError {
                    key: string(e.key()),
                    code: string(e.code()),
                    message: string(e.message()),
                })
                .collect(),
        }
    }

    /// Fold one DeleteObjects call into the running report. A failed first
    /// call is returned as is; once earlier batches have deleted keys, a
    /// failed call is reported against every key it carried.
    fn absorb_batch(
        out: &mut DeleteMultiResponse,
        batch: &[String],
        result: Result<DeleteObjectsOutput>,
        first: bool,
    ) -> Result<()> {
        match result {
            Ok(resp) => {
                let page = delete_multi_response(&resp);
                out.keys.extend(page.keys);
                out.errors.extend(page.errors);
                Ok(())
            }
            Err(e) if first => Err(e),
            Err(e) => {
                warn!(keys = batch.len(), error = %e, "s3 delete objects call failed");
                let code = e
                    .status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                let message = e.to_string();
                out.errors.extend(batch.iter().map(|key| KeyError {
                    key: key.clone(),
                    code: code.clone(),
                    message: message.clone(),
                }));
                Ok(())
            }
        }
    }

    fn list_response(bucket: &str, resp: &ListObjectsV2Output) -> ListResponse {
        let prefixes = resp.common_prefixes();
        let contents = resp.contents();

        let mut objects = Vec::with_capacity(prefixes.len() + contents.len());
        for prefix in prefixes {
            objects.push(Object::directory(bucket, string(prefix.prefix())));
        }
        for item in contents {
            objects.push(Object {
                bucket: bucket.to_string(),
                name: string(item.key()),
                etag: string(item.e_tag()),
                size: item.size().unwrap_or(0).max(0) as u64,
                storage_class: string(item.storage_class().map(|s| s.as_str())),
                updated: timestamp(item.last_modified())
                    .map(rfc3339)
                    .unwrap_or_default(),
                ..Default::default()
            });
        }

        ListResponse {
            objects,
            cursor: string(resp.next_continuation_token()),
        }
    }

}

#[cfg(feature = "s3")]
pub use inner::{S3Options, S3Storage};
