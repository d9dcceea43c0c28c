//! Build the configured [`StorageService`] adapter.

use std::path::Path;

use unistore_core::config::{BackendKind, StorageSettings};
use unistore_core::service::StorageService;

use crate::local::LocalStorage;

/// Create a StorageService for the backend named in `settings`.
///
/// Supported backends:
/// - `local`: directory tree under `root`
/// - `s3`: AWS S3 (compile with `s3` feature)
/// - `s3compatible`: MinIO, Garage and friends; requires `endpoint_url`,
///   path-style addressing unless `path_style = false`
/// - `gcs`: Google Cloud Storage via application default credentials
///   (compile with `gcs` feature)
pub async fn create_service(settings: &StorageSettings) -> anyhow::Result<Box<dyn StorageService>> {
    match settings.backend {
        BackendKind::Local => {
            let root = settings
                .root
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("root required for local backend"))?;
            let storage = LocalStorage::new(Path::new(root), &settings.name)?;
            Ok(Box::new(storage))
        }

        #[cfg(feature = "s3")]
        BackendKind::S3 | BackendKind::S3Compatible => {
            let compatible = settings.backend == BackendKind::S3Compatible;
            if compatible && settings.endpoint_url.is_none() {
                anyhow::bail!("endpoint_url required for s3compatible backend");
            }
            let storage = crate::s3::S3Storage::with_options(crate::s3::S3Options {
                region: settings.region.as_deref(),
                name: &settings.name,
                endpoint_url: settings.endpoint_url.as_deref(),
                path_style: settings.path_style.unwrap_or(compatible),
                access_key: settings.access_key.as_deref(),
                secret_key: settings.secret_key.as_deref(),
            })
            .await?;
            Ok(Box::new(storage))
        }

        #[cfg(not(feature = "s3"))]
        BackendKind::S3 | BackendKind::S3Compatible => {
            anyhow::bail!("s3 feature not enabled. Recompile with --features s3")
        }

        #[cfg(feature = "gcs")]
        BackendKind::Gcs => {
            let storage = crate::gcs::GcsStorage::new(&settings.name).await?;
            Ok(Box::new(storage))
        }

        #[cfg(not(feature = "gcs"))]
        BackendKind::Gcs => {
            anyhow::bail!("gcs feature not enabled. Recompile with --features gcs")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use unistore_core::error::Backend;
    use unistore_core::types::ListRequest;

    fn settings(backend: BackendKind) -> StorageSettings {
        StorageSettings {
            name: "factory-test".into(),
            backend,
            region: None,
            endpoint_url: None,
            path_style: None,
            access_key: None,
            secret_key: None,
            root: None,
        }
    }

    #[tokio::test]
    async fn local_backend_from_settings() {
        let tmp = TempDir::new().unwrap();
        let mut s = settings(BackendKind::Local);
        s.root = Some(tmp.path().join("data").to_string_lossy().into_owned());

        let service = create_service(&s).await.unwrap();
        assert_eq!(service.backend(), Backend::Local);
        assert_eq!(service.name(), "factory-test");
        assert!(tmp.path().join("data").is_dir());

        let err = service
            .list(ListRequest {
                bucket: "absent".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn local_backend_requires_root() {
        let err = create_service(&settings(BackendKind::Local))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("root required"));
    }

    #[cfg(feature = "s3")]
    #[tokio::test]
    async fn s3_compatible_requires_endpoint() {
        let err = create_service(&settings(BackendKind::S3Compatible))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("endpoint_url"));
    }

    #[cfg(feature = "s3")]
    #[tokio::test]
    async fn s3_compatible_with_static_keys() {
        let mut s = settings(BackendKind::S3Compatible);
        s.endpoint_url = Some("http://127.0.0.1:9000".into());
        s.region = Some("us-east-1".into());
        s.access_key = Some("minioadmin".into());
        s.secret_key = Some("minioadmin".into());

        let service = create_service(&s).await.unwrap();
        assert_eq!(service.backend(), Backend::S3);
    }
}
