use anyhow::Result;
use std::ffi::OsStr;
use std::path::Path;

use unistore_core::types::CopyRequest;

use super::{key_arg, open_service};

pub async fn run(
    base_dir: &Path,
    src_bucket: &str,
    src_key: &OsStr,
    dst_bucket: &str,
    dst_key: &OsStr,
) -> Result<()> {
    let req = CopyRequest {
        source_bucket: src_bucket.to_string(),
        source_key: key_arg(src_key)?,
        bucket: dst_bucket.to_string(),
        key: key_arg(dst_key)?,
    };
    let service = open_service(base_dir).await?;
    let resp = service.copy(req).await?;
    println!("{}", resp.etag);
    Ok(())
}
