#[cfg(feature = "gcs")]
mod inner {
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use google_cloud_storage::client::{Client, ClientConfig};
    use google_cloud_storage::http::Error;
    use google_cloud_storage::http::object_access_controls::PredefinedObjectAcl;
    use google_cloud_storage::http::objects::Object as GcsObject;
    use google_cloud_storage::http::object_access_controls::Projection;
    use google_cloud_storage::http::objects::copy::CopyObjectRequest;
    use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
    use google_cloud_storage::http::objects::download::Range;
    use google_cloud_storage::http::objects::get::GetObjectRequest;
    use google_cloud_storage::http::objects::list::{ListObjectsRequest, ListObjectsResponse};
    use google_cloud_storage::http::objects::upload::{UploadObjectRequest, UploadType};
    use tokio_util::io::{ReaderStream, StreamReader};
    use tracing::{debug, warn};

    use unistore_core::error::{Backend, Result, StorageError};
    use unistore_core::service::StorageService;
    use unistore_core::types::{
        Acl, CopyRequest, CopyResponse, DeleteMultiRequest, DeleteMultiResponse, DeleteRequest,
        DeleteResponse, GetRequest, GetResponse, HeadRequest, HeadResponse, Headers, KeyError,
        ListRequest, ListResponse, Object, PutRequest, PutResponse, rfc3339,
    };
    use unistore_core::validate;

    use crate::upload::{non_empty, resolve_content_type};

    /// Google Cloud Storage.
    ///
    /// The JSON API reports failures with an HTTP status, so the not-found and
    /// client-error predicates work. Transport failures that never produced a
    /// response carry no status and classify as neither.
    pub struct GcsStorage {
        client: Client,
        name: String,
    }

    impl GcsStorage {
        /// Wrap an already configured client.
        pub fn from_client(client: Client, name: &str) -> Self {
            Self {
                client,
                name: name.to_string(),
            }
        }

        /// Create using application default credentials.
        pub async fn new(name: &str) -> Result<Self> {
            let config = ClientConfig::default()
                .with_auth()
                .await
                .map_err(|e| StorageError::Config(format!("GCS auth: {e}")))?;
            Ok(Self::from_client(Client::new(config), name))
        }

        async fn fetch_metadata(&self, bucket: &str, key: &str) -> Result<GcsObject> {
            self.client
                .get_object(&GetObjectRequest {
                    bucket: bucket.to_string(),
                    object: key.to_string(),
                    ..Default::default()
                })
                .await
                .map_err(gcs_error)
        }
    }

    #[async_trait]
    impl StorageService for GcsStorage {
        async fn copy(&self, req: CopyRequest) -> Result<CopyResponse> {
            validate::bucket_and_key(&req.source_bucket, &req.source_key)?;
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(
                src_bucket = %req.source_bucket,
                src_key = %req.source_key,
                bucket = %req.bucket,
                key = %req.key,
                "gcs copy"
            );
            let copied = self
                .client
                .copy_object(&CopyObjectRequest {
                    source_bucket: req.source_bucket.clone(),
                    source_object: req.source_key.clone(),
                    destination_bucket: req.bucket.clone(),
                    destination_object: req.key.clone(),
                    ..Default::default()
                })
                .await
                .map_err(gcs_error)?;

            Ok(CopyResponse {
                etag: copied.etag,
            })
        }

        async fn head(&self, req: HeadRequest) -> Result<HeadResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(bucket = %req.bucket, key = %req.key, "gcs head");
            let object = self.fetch_metadata(&req.bucket, &req.key).await?;
            Ok(HeadResponse {
                headers: object_headers(&object),
            })
        }

        async fn get(&self, req: GetRequest) -> Result<GetResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(bucket = %req.bucket, key = %req.key, "gcs get");
            let object = self.fetch_metadata(&req.bucket, &req.key).await?;

            // pin the download to the generation the headers describe
            let stream = self
                .client
                .download_streamed_object(
                    &GetObjectRequest {
                        bucket: req.bucket.clone(),
                        object: req.key.clone(),
                        generation: Some(object.generation),
                        ..Default::default()
                    },
                    &Range::default(),
                )
                .await
                .map_err(gcs_error)?;
            let reader = StreamReader::new(stream.map_err(std::io::Error::other));

            Ok(GetResponse {
                headers: object_headers(&object),
                body: Box::pin(reader),
            })
        }

        async fn put(&self, req: PutRequest) -> Result<PutResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;
            let mut body = validate::body(req.body)?;

            let content_type = resolve_content_type(&req.content_type, body.as_mut()).await?;

            debug!(bucket = %req.bucket, key = %req.key, %content_type, "gcs put");
            let metadata = (!req.metadata.is_empty()).then_some(req.metadata);
            let resource = GcsObject {
                bucket: req.bucket.clone(),
                name: req.key.clone(),
                content_type: non_empty(&content_type),
                cache_control: non_empty(&req.cache_control),
                content_encoding: non_empty(&req.content_encoding),
                content_language: non_empty(&req.content_language),
                content_disposition: non_empty(&req.content_disposition),
                metadata,
                ..Default::default()
            };

            let stored = self
                .client
                .upload_streamed_object(
                    &UploadObjectRequest {
                        bucket: req.bucket.clone(),
                        predefined_acl: req.acl.map(predefined_acl),
                        ..Default::default()
                    },
                    ReaderStream::new(body),
                    &UploadType::Multipart(Box::new(resource)),
                )
                .await
                .map_err(gcs_error)?;

            Ok(PutResponse {
                etag: stored.etag,
            })
        }

        async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
            validate::bucket_and_key(&req.bucket, &req.key)?;

            debug!(bucket = %req.bucket, key = %req.key, "gcs delete");
            self.client
                .delete_object(&DeleteObjectRequest {
                    bucket: req.bucket.clone(),
                    object: req.key.clone(),
                    ..Default::default()
                })
                .await
                .map_err(gcs_error)?;
            Ok(DeleteResponse {})
        }

        /// GCS has no multi-object delete; keys are removed one call at a
        /// time and failures are collected rather than returned.
        async fn delete_multi(&self, req: DeleteMultiRequest) -> Result<DeleteMultiResponse> {
            validate::bucket(&req.bucket)?;
            for key in &req.keys {
                validate::key(key)?;
            }

            let mut out = DeleteMultiResponse::default();
            for key in &req.keys {
                let result = self
                    .client
                    .delete_object(&DeleteObjectRequest {
                        bucket: req.bucket.clone(),
                        object: key.clone(),
                        ..Default::default()
                    })
                    .await;
                match result {
                    Ok(()) => {
                        if !req.quiet {
                            out.keys.push(key.clone());
                        }
                    }
                    Err(e) => out.errors.push(key_error(key, gcs_error(e))),
                }
            }

            if !out.errors.is_empty() {
                warn!(
                    bucket = %req.bucket,
                    failed = out.errors.len(),
                    "gcs batch delete partially failed"
                );
            }
            Ok(out)
        }

        async fn list(&self, req: ListRequest) -> Result<ListResponse> {
            validate::bucket(&req.bucket)?;

            debug!(bucket = %req.bucket, prefix = %req.prefix, cursor = %req.cursor, "gcs list");
            let resp = self
                .client
                .list_objects(&list_request(&req))
                .await
                .map_err(gcs_error)?;

            Ok(list_response(&req.bucket, resp))
        }

        fn backend(&self) -> Backend {
            Backend::Gcs
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn list_request(req: &ListRequest) -> ListObjectsRequest {
        ListObjectsRequest {
            bucket: req.bucket.clone(),
            delimiter: Some("/".to_string()),
            prefix: non_empty(&req.prefix),
            max_results: (req.size > 0).then(|| req.size.min(i32::MAX as usize) as i32),
            page_token: non_empty(&req.cursor),
            // full resource, including ACLs and owner
            projection: Some(Projection::Full),
            ..Default::default()
        }
    }

    fn predefined_acl(acl: Acl) -> PredefinedObjectAcl {
        match acl {
            Acl::Private => PredefinedObjectAcl::Private,
            Acl::PublicRead => PredefinedObjectAcl::PublicRead,
        }
    }

    fn gcs_error(err: Error) -> StorageError {
        let status = match &err {
            Error::Response(resp) => Some(resp.code),
            Error::HttpClient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        };
        StorageError::backend(Backend::Gcs, status, err)
    }

    fn key_error(key: &str, err: StorageError) -> KeyError {
        KeyError {
            key: key.to_string(),
            code: err
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            message: err.to_string(),
        }
    }

    fn updated(object: &GcsObject) -> Option<chrono::DateTime<chrono::Utc>> {
        object
            .updated
            .and_then(|t| chrono::DateTime::from_timestamp(t.unix_timestamp(), t.nanosecond()))
    }

    fn object_headers(object: &GcsObject) -> Headers {
        Headers {
            cache_control: object.cache_control.clone().unwrap_or_default(),
            content_disposition: object.content_disposition.clone().unwrap_or_default(),
            content_encoding: object.content_encoding.clone().unwrap_or_default(),
            content_language: object.content_language.clone().unwrap_or_default(),
            content_length: object.size.max(0) as u64,
            content_type: object.content_type.clone().unwrap_or_default(),
            etag: object.etag.clone(),
            last_modified: updated(object),
            metadata: object.metadata.clone().unwrap_or_default(),
            storage_class: object.storage_class.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    fn neutral_object(item: GcsObject) -> Object {
        let updated = updated(&item).map(rfc3339).unwrap_or_default();
        Object {
            bucket: item.bucket,
            name: item.name,
            cache_control: item.cache_control.unwrap_or_default(),
            component_count: item.component_count.map(i64::from).unwrap_or(0),
            content_disposition: item.content_disposition.unwrap_or_default(),
            content_encoding: item.content_encoding.unwrap_or_default(),
            content_language: item.content_language.unwrap_or_default(),
            content_type: item.content_type.unwrap_or_default(),
            etag: item.etag,
            generation: item.generation,
            metadata: item.metadata.unwrap_or_default(),
            size: item.size.max(0) as u64,
            storage_class: item.storage_class.unwrap_or_default(),
            updated,
            directory: false,
        }
    }

    fn list_response(bucket: &str, resp: ListObjectsResponse) -> ListResponse {
        let prefixes = resp.prefixes.unwrap_or_default();
        let items = resp.items.unwrap_or_default();

        let mut objects = Vec::with_capacity(prefixes.len() + items.len());
        objects.extend(prefixes.into_iter().map(|p| Object::directory(bucket, p)));
        objects.extend(items.into_iter().map(neutral_object));

        ListResponse {
            objects,
            cursor: resp.next_page_token.unwrap_or_default(),
        }
    }

}

#[cfg(feature = "gcs")]
pub use inner::GcsStorage;
