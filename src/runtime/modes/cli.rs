//! CLI mode
//!
//! One-shot commands that share the server's storage configuration.

use colored::Colorize;

use crate::config::StaticConfig;
use crate::errors::{FramelinkerError, Result};
use crate::runtime::lifetime::startup::install_crypto_provider;
use crate::services::{AliasRegistry, RegisterRequest};
use crate::storage::{Region, create_kv_store};

/// Registers a frame URL against the configured KV store and prints the link.
pub async fn run_register(
    config: &StaticConfig,
    frame_url: String,
    api_key: String,
    region: Region,
) -> Result<()> {
    install_crypto_provider();
    if config.kv.kv_type == "memory" {
        println!(
            "{}",
            "Warning: kv.type is \"memory\", the alias only lives as long as this process"
                .yellow()
        );
    }

    let kv = create_kv_store(&config.kv).await?;
    let registry = AliasRegistry::new(kv, config.alias.id_length, config.server.public_url.clone());
    let registered = registry
        .register(RegisterRequest {
            frame_url: Some(frame_url),
            api_key: Some(api_key),
            region: Some(region.to_string()),
        })
        .await?;

    println!(
        "{} {}",
        "Registered".green().bold(),
        registered.alias_id.cyan()
    );
    println!("  {} {}", "Link:".bold(), registered.url.blue().underline());
    Ok(())
}

/// Prints a sample config, or writes it to `path`.
pub fn run_config_generate(path: Option<String>) -> Result<()> {
    let Some(path) = path else {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| FramelinkerError::config(format!("Failed to write {}: {}", path, e)))?;
    println!(
        "{} {}",
        "Configuration file generated:".green(),
        path.blue()
    );
    Ok(())
}
