use async_trait::async_trait;

use crate::error::{Backend, Result};
use crate::types::{
    CopyRequest, CopyResponse, DeleteMultiRequest, DeleteMultiResponse, DeleteRequest,
    DeleteResponse, GetRequest, GetResponse, HeadRequest, HeadResponse, ListRequest, ListResponse,
    PutRequest, PutResponse,
};

/// Provider-neutral object storage operations.
///
/// Every adapter runs the shared validation before touching its backend and
/// returns backend failures as `StorageError::Backend` with the SDK error
/// preserved as the source.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Server-side copy. The destination inherits the source's metadata.
    async fn copy(&self, req: CopyRequest) -> Result<CopyResponse>;

    /// Metadata only, no body transferred.
    async fn head(&self, req: HeadRequest) -> Result<HeadResponse>;

    /// Metadata plus a stream positioned at the start of the object.
    async fn get(&self, req: GetRequest) -> Result<GetResponse>;

    /// Store the body under (bucket, key) with the given metadata and ACL.
    async fn put(&self, req: PutRequest) -> Result<PutResponse>;

    /// Remove an object. Deleting a missing key is not guaranteed to fail.
    async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse>;

    /// Best-effort batch delete. Per-key failures land in the response.
    async fn delete_multi(&self, req: DeleteMultiRequest) -> Result<DeleteMultiResponse>;

    /// One page of objects and `/`-delimited directory entries.
    async fn list(&self, req: ListRequest) -> Result<ListResponse>;

    /// Backend tag used in errors.
    fn backend(&self) -> Backend;

    /// Display name.
    fn name(&self) -> &str;
}
