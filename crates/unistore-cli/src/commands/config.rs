use anyhow::Result;
use std::path::Path;

use unistore_core::config::StorageConfig;

pub fn run(base_dir: &Path) -> Result<()> {
    let config_path = StorageConfig::default_path(base_dir);
    let config = StorageConfig::load(&config_path)?;
    let s = &config.storage;

    println!("Config: {}", config_path.display());
    println!();
    println!("  Name:           {}", s.name);
    println!("  Backend:        {}", s.backend);
    if let Some(region) = &s.region {
        println!("  Region:         {region}");
    }
    if let Some(endpoint) = &s.endpoint_url {
        println!("  Endpoint:       {endpoint}");
    }
    if let Some(path_style) = s.path_style {
        println!("  Path style:     {path_style}");
    }
    if let Some(ak) = &s.access_key {
        println!("  Access key:     {ak}");
        println!("  Secret key:     {}", if s.secret_key.is_some() { "****" } else { "(unset)" });
    }
    if let Some(root) = &s.root {
        println!("  Root:           {root}");
    }

    Ok(())
}
