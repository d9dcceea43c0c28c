pub mod config;
pub mod cp;
pub mod get;
pub mod head;
pub mod init;
pub mod ls;
pub mod put;
pub mod rm;

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;

use unistore_core::config::StorageConfig;
use unistore_core::service::StorageService;
use unistore_core::validate;

/// Build the configured storage service from `<base_dir>/unistore.toml`.
pub async fn open_service(base_dir: &Path) -> Result<Box<dyn StorageService>> {
    let config_path = StorageConfig::default_path(base_dir);
    let config = StorageConfig::load(&config_path)
        .with_context(|| format!("run `unistore init` or create {}", config_path.display()))?;
    let service = unistore_storage::factory::create_service(&config.storage).await?;
    tracing::debug!(
        backend = %service.backend(),
        name = service.name(),
        "storage service ready"
    );
    Ok(service)
}

/// Object keys arrive as raw OS strings; only valid UTF-8 is accepted.
pub fn key_arg(raw: &OsStr) -> Result<String> {
    Ok(validate::utf8_key(raw.as_encoded_bytes())?)
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
