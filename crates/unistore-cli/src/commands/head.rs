use anyhow::Result;
use std::ffi::OsStr;
use std::path::Path;

use unistore_core::types::{HeadRequest, Headers};

use super::{format_bytes, key_arg, open_service};

pub async fn run(base_dir: &Path, bucket: &str, key: &OsStr) -> Result<()> {
    let key = key_arg(key)?;
    let service = open_service(base_dir).await?;
    let resp = service
        .head(HeadRequest {
            bucket: bucket.to_string(),
            key,
        })
        .await?;

    for (name, value) in header_lines(&resp.headers) {
        println!("{name:<22}{value}");
    }
    Ok(())
}

fn header_lines(h: &Headers) -> Vec<(&'static str, String)> {
    let mut lines = vec![(
        "Content-Length:",
        format!("{} ({})", h.content_length, format_bytes(h.content_length)),
    )];
    let optional = [
        ("Content-Type:", &h.content_type),
        ("ETag:", &h.etag),
        ("Cache-Control:", &h.cache_control),
        ("Content-Encoding:", &h.content_encoding),
        ("Content-Language:", &h.content_language),
        ("Content-Disposition:", &h.content_disposition),
        ("Accept-Ranges:", &h.accept_ranges),
        ("Content-Range:", &h.content_range),
        ("Expires:", &h.expires),
        ("Storage-Class:", &h.storage_class),
    ];
    lines.extend(
        optional
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(n, v)| (n, v.clone())),
    );
    if let Some(ts) = h.last_modified {
        lines.push(("Last-Modified:", ts.to_rfc2822()));
    }
    let mut meta: Vec<_> = h.metadata.iter().collect();
    meta.sort();
    for (k, v) in meta {
        lines.push(("Metadata:", format!("{k}={v}")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_headers_are_omitted() {
        let h = Headers {
            content_length: 10,
            content_type: "text/plain".into(),
            metadata: [("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
                .into(),
            ..Default::default()
        };
        let names: Vec<_> = header_lines(&h)
            .into_iter()
            .map(|(n, v)| format!("{n}{v}"))
            .collect();
        assert_eq!(
            names,
            vec![
                "Content-Length:10 (10 B)",
                "Content-Type:text/plain",
                "Metadata:a=1",
                "Metadata:b=2",
            ]
        );
    }
}
