use anyhow::Result;
use std::path::Path;

use unistore_core::config::StorageConfig;

pub fn run(base_dir: &Path) -> Result<()> {
    println!("Initializing unistore in {}", base_dir.display());
    std::fs::create_dir_all(base_dir)?;

    let config_path = StorageConfig::default_path(base_dir);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let config = StorageConfig::default_config(base_dir);
    config.save(&config_path)?;
    println!("Created config: {}", config_path.display());
    println!("\nThe default backend stores objects on disk. To use a cloud backend,");
    println!("edit {} and set backend = \"s3\", \"s3compatible\" or \"gcs\".", config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use unistore_core::config::BackendKind;

    #[test]
    fn init_writes_local_config_once() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("home");
        run(&base).unwrap();

        let path = StorageConfig::default_path(&base);
        let config = StorageConfig::load(&path).unwrap();
        assert_eq!(config.storage.backend, BackendKind::Local);

        std::fs::write(&path, "[storage]\nbackend = \"gcs\"\n").unwrap();
        run(&base).unwrap();
        let config = StorageConfig::load(&path).unwrap();
        assert_eq!(config.storage.backend, BackendKind::Gcs);
    }
}
