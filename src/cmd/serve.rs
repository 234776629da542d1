//! Preview server command (`livepreview serve`).

use std::path::Path;

use anyhow::{Context, Result};
use livepreview::config::PreviewConfig;
use livepreview::preview::models::ProjectId;
use livepreview::preview::server::start_server;
use livepreview::preview::viewport::ViewportPreset;

/// CLI overrides applied on top of the file and environment layers.
pub struct ServeArgs {
    pub port: Option<u16>,
    pub coordinator: Option<String>,
    pub project: Option<String>,
    pub viewport: Option<String>,
    pub open: bool,
    pub dev: bool,
}

pub async fn cmd_serve(project_dir: &Path, args: ServeArgs) -> Result<()> {
    let mut config = PreviewConfig::load(project_dir)?;
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.coordinator {
        config.coordinator_url = Some(url);
    }
    if let Some(project) = args.project {
        config.project_id = Some(ProjectId::new(project));
    }
    if let Some(viewport) = args.viewport {
        config.viewport = viewport
            .parse::<ViewportPreset>()
            .map_err(anyhow::Error::msg)?;
    }
    if args.dev {
        config.dev = true;
    }
    config
        .validate(&PreviewConfig::path_in(project_dir))
        .context("Invalid preview settings")?;

    // Skip in dev mode (no browser inside containers)
    if args.open && !config.dev {
        let url = format!("http://localhost:{}", config.port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                eprintln!("Failed to open browser: {}", e);
            }
        });
    }

    start_server(config.server_config()).await
}
