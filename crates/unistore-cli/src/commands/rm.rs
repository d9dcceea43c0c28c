use anyhow::Result;
use std::ffi::OsString;
use std::path::Path;

use unistore_core::types::{DeleteMultiRequest, DeleteRequest};

use super::{key_arg, open_service};

/// One key is a plain delete, several go out as a single batch.
pub async fn run(base_dir: &Path, bucket: &str, keys: &[OsString], quiet: bool) -> Result<()> {
    let keys = keys
        .iter()
        .map(|k| key_arg(k))
        .collect::<Result<Vec<_>>>()?;
    let service = open_service(base_dir).await?;

    if let [key] = keys.as_slice() {
        service
            .delete(DeleteRequest {
                bucket: bucket.to_string(),
                key: key.clone(),
            })
            .await?;
        if !quiet {
            println!("deleted {key}");
        }
        return Ok(());
    }

    let resp = service
        .delete_multi(DeleteMultiRequest {
            bucket: bucket.to_string(),
            keys,
            quiet,
        })
        .await?;

    for key in &resp.keys {
        println!("deleted {key}");
    }
    for err in &resp.errors {
        eprintln!("failed  {err}");
    }
    if !resp.errors.is_empty() {
        anyhow::bail!("{} of the objects could not be deleted", resp.errors.len());
    }
    Ok(())
}
