use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;

use unistore_core::types::{Acl, PutRequest};

use super::{key_arg, open_service};

pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_disposition: Option<String>,
    pub acl: Option<String>,
    pub meta: Vec<String>,
}

pub async fn run(
    base_dir: &Path,
    bucket: &str,
    key: &OsStr,
    file: &Path,
    opts: PutOptions,
) -> Result<()> {
    let key = key_arg(key)?;
    let acl = opts.acl.as_deref().map(str::parse::<Acl>).transpose()?;
    let metadata = parse_meta(&opts.meta)?;

    let body = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("cannot open {}", file.display()))?;

    let service = open_service(base_dir).await?;
    let resp = service
        .put(PutRequest {
            bucket: bucket.to_string(),
            key: key.clone(),
            body: Some(Box::new(body)),
            acl,
            cache_control: opts.cache_control.unwrap_or_default(),
            content_type: opts.content_type.unwrap_or_default(),
            content_encoding: opts.content_encoding.unwrap_or_default(),
            content_language: opts.content_language.unwrap_or_default(),
            content_disposition: opts.content_disposition.unwrap_or_default(),
            metadata,
        })
        .await?;

    tracing::info!(bucket, key = %key, etag = %resp.etag, "uploaded");
    println!("{}", resp.etag);
    Ok(())
}

fn parse_meta(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (k, v) = pair
                .split_once('=')
                .with_context(|| format!("metadata must be KEY=VALUE, got {pair:?}"))?;
            anyhow::ensure!(!k.is_empty(), "metadata key is empty in {pair:?}");
            Ok((k.to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_pairs_parse() {
        let meta = parse_meta(&["owner=alice".into(), "note=a=b".into()]).unwrap();
        assert_eq!(meta["owner"], "alice");
        assert_eq!(meta["note"], "a=b");
    }

    #[test]
    fn meta_without_separator_rejected() {
        assert!(parse_meta(&["owner".into()]).is_err());
        assert!(parse_meta(&["=x".into()]).is_err());
    }
}
