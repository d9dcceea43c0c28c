use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;

use unistore_core::types::GetRequest;

use super::{key_arg, open_service};

pub async fn run(base_dir: &Path, bucket: &str, key: &OsStr, dest: Option<&Path>) -> Result<()> {
    let key = key_arg(key)?;
    let service = open_service(base_dir).await?;
    let resp = service
        .get(GetRequest {
            bucket: bucket.to_string(),
            key: key.clone(),
        })
        .await?;

    let mut body = resp.body;
    let written = match dest {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("cannot create {}", path.display()))?;
            tokio::io::copy(&mut body, &mut file).await?
        }
        None => tokio::io::copy(&mut body, &mut tokio::io::stdout()).await?,
    };

    tracing::info!(bucket, key = %key, bytes = written, "downloaded");
    Ok(())
}
