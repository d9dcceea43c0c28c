use std::io::SeekFrom;

use tokio::io::AsyncSeekExt;
use tracing::debug;
use unistore_core::content_type::detect_content_type;
use unistore_core::types::ObjectBody;

/// Explicit content type if given, otherwise whatever the body sniffs as.
/// The body's read position is left where it was.
pub(crate) async fn resolve_content_type(
    explicit: &str,
    body: &mut dyn ObjectBody,
) -> std::io::Result<String> {
    if !explicit.is_empty() {
        return Ok(explicit.to_string());
    }
    let sniffed = detect_content_type(body).await?;
    debug!(content_type = %sniffed, "sniffed content type");
    Ok(sniffed)
}

/// Bytes between the current position and the end of the body.
pub(crate) async fn remaining_len(body: &mut dyn ObjectBody) -> std::io::Result<u64> {
    let start = body.seek(SeekFrom::Current(0)).await?;
    let end = body.seek(SeekFrom::End(0)).await?;
    body.seek(SeekFrom::Start(start)).await?;
    Ok(end.saturating_sub(start))
}

/// `Some(s)` unless `s` is empty. SDK builders take `Option` setters and an
/// empty string must not reach the backend as a header value.
pub(crate) fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
