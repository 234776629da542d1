//! Configuration view and validation commands (`livepreview config`).

use std::path::Path;

use anyhow::Result;
use livepreview::config::PreviewConfig;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = PreviewConfig::path_in(project_dir);

    match command {
        None | Some(ConfigCommands::Show) => {
            let mut config = PreviewConfig::load(project_dir)?;
            config.apply_env(|key| std::env::var(key).ok());

            println!();
            println!("Live Preview Configuration");
            println!("==========================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {} (using defaults)", config_path.display());
            }
            println!();

            println!("[server]");
            println!("  port = {}", config.port);
            println!("  dev = {}", config.dev);
            println!();

            println!("[channel]");
            match &config.coordinator_url {
                Some(url) => println!("  coordinator_url = \"{}\"", url),
                None => println!("  coordinator_url = (not set)"),
            }
            match &config.project_id {
                Some(id) => println!("  project_id = \"{}\"", id),
                None => println!("  project_id = (not set)"),
            }
            println!(
                "  reconnect_delay_ms = {}",
                config.reconnect_delay.as_millis()
            );
            println!();

            println!("[render]");
            println!(
                "  release_timeout_ms = {}",
                config.release_timeout.as_millis()
            );
            println!("  viewport = \"{}\"", config.viewport);
            println!();

            if config.coordinator_url.is_none() || config.project_id.is_none() {
                println!("Update channel disabled: coordinator_url and project_id are both required.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No config file at {}", config_path.display());
                println!("Defaults are valid.");
                return Ok(());
            }

            PreviewConfig::load(project_dir)?;
            println!("✓ {} is valid", config_path.display());
        }
    }

    Ok(())
}
