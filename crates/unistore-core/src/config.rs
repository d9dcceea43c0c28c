use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Top-level configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub storage: StorageSettings,
}

/// Which adapter to build and how to reach its backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Display name for logs.
    #[serde(default = "default_name")]
    pub name: String,
    pub backend: BackendKind,
    /// AWS region (S3). Defaults to the environment's region.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible services (MinIO, Garage, etc.)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Use path-style addressing. Default: true for S3Compatible, false for S3.
    #[serde(default)]
    pub path_style: Option<bool>,
    /// S3 access key. Environment/profile credentials are used when unset.
    #[serde(default)]
    pub access_key: Option<String>,
    /// S3 secret key.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Root directory for the local backend.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_name() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    S3,
    /// S3-compatible: MinIO, RustFS, Garage, Ceph RGW, SeaweedFS, etc.
    #[serde(alias = "s3-compatible", alias = "minio", alias = "garage")]
    S3Compatible,
    Gcs,
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::S3 => write!(f, "s3"),
            BackendKind::S3Compatible => write!(f, "s3compatible"),
            BackendKind::Gcs => write!(f, "gcs"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

impl StorageConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading config");
        if !path.exists() {
            return Err(StorageError::Config(format!(
                "config file not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| StorageError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config pointing at a local store under `base_dir/data`.
    pub fn default_config(base_dir: &Path) -> Self {
        Self {
            storage: StorageSettings {
                name: default_name(),
                backend: BackendKind::Local,
                region: None,
                endpoint_url: None,
                path_style: None,
                access_key: None,
                secret_key: None,
                root: Some(base_dir.join("data").display().to_string()),
            },
        }
    }

    /// `<base_dir>/unistore.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("unistore.toml")
    }

    /// `~/.unistore`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".unistore"))
            .ok_or_else(|| StorageError::Config("Cannot determine home directory".to_string()))
    }
}
