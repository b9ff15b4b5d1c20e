//! Show or initialize the configuration.

use std::path::PathBuf;

use voxtrim_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, path: Option<PathBuf>, init: bool) -> anyhow::Result<()> {
    if init {
        let defaults = AppConfig::default();
        let written = match path {
            Some(path) => {
                defaults.save_to(&path)?;
                path
            }
            None => defaults.save()?,
        };
        println!("Wrote default configuration to {}", written.display());
        return Ok(());
    }

    let source = path.unwrap_or_else(config_file_path);
    println!("# {}", source.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
