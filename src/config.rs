//! Preview configuration.
//!
//! Settings are layered: built-in defaults → `.livepreview/config.toml` →
//! environment (`PREVIEW_COORDINATOR_URL`, `PREVIEW_PROJECT_ID`) → CLI flags.
//!
//! ```toml
//! [server]
//! port = 3141
//! dev = false
//!
//! [channel]
//! coordinator_url = "ws://127.0.0.1:4000/ws"
//! project_id = "42"
//! reconnect_delay_ms = 3000
//!
//! [render]
//! release_timeout_ms = 10000
//! viewport = "desktop"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::errors::PreviewError;
use crate::preview::channel::DEFAULT_RECONNECT_DELAY;
use crate::preview::host::DEFAULT_RELEASE_TIMEOUT;
use crate::preview::models::ProjectId;
use crate::preview::server::ServerConfig;
use crate::preview::viewport::ViewportPreset;

pub const CONFIG_DIR: &str = ".livepreview";
pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_COORDINATOR_URL: &str = "PREVIEW_COORDINATOR_URL";
pub const ENV_PROJECT_ID: &str = "PREVIEW_PROJECT_ID";

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub port: u16,
    pub dev: bool,
    pub coordinator_url: Option<String>,
    pub project_id: Option<ProjectId>,
    pub reconnect_delay: Duration,
    pub release_timeout: Duration,
    pub viewport: ViewportPreset,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            port: 3141,
            dev: false,
            coordinator_url: None,
            project_id: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
            viewport: ViewportPreset::Desktop,
        }
    }
}

/// Raw TOML structure for `.livepreview/config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    server: Option<ServerSection>,
    channel: Option<ChannelSection>,
    render: Option<RenderSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    port: Option<u16>,
    dev: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChannelSection {
    coordinator_url: Option<String>,
    project_id: Option<ProjectId>,
    reconnect_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RenderSection {
    release_timeout_ms: Option<u64>,
    viewport: Option<ViewportPreset>,
}

impl PreviewConfig {
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load from the project directory. Returns defaults if the file doesn't exist.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = Self::path_in(project_dir);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let toml: ConfigToml = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let mut config = Self::default();
        config.merge(toml);
        config.validate(&config_path)?;
        Ok(config)
    }

    fn merge(&mut self, toml: ConfigToml) {
        if let Some(server) = toml.server {
            if let Some(port) = server.port {
                self.port = port;
            }
            if let Some(dev) = server.dev {
                self.dev = dev;
            }
        }
        if let Some(channel) = toml.channel {
            if let Some(url) = channel.coordinator_url {
                self.coordinator_url = Some(url);
            }
            if let Some(project_id) = channel.project_id {
                self.project_id = Some(project_id);
            }
            if let Some(ms) = channel.reconnect_delay_ms {
                self.reconnect_delay = Duration::from_millis(ms);
            }
        }
        if let Some(render) = toml.render {
            if let Some(ms) = render.release_timeout_ms {
                self.release_timeout = Duration::from_millis(ms);
            }
            if let Some(viewport) = render.viewport {
                self.viewport = viewport;
            }
        }
    }

    /// Apply environment overrides using `lookup` (usually `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_COORDINATOR_URL).filter(|v| !v.is_empty()) {
            self.coordinator_url = Some(url);
        }
        if let Some(id) = lookup(ENV_PROJECT_ID).filter(|v| !v.is_empty()) {
            self.project_id = Some(ProjectId::new(id));
        }
    }

    pub fn validate(&self, source: &Path) -> Result<(), PreviewError> {
        let invalid = |message: String| PreviewError::InvalidConfig {
            path: source.to_path_buf(),
            message,
        };

        if let Some(url) = &self.coordinator_url {
            if !url.starts_with("ws://") {
                return Err(invalid(format!(
                    "coordinator_url must be a ws:// URL, got '{}'",
                    url
                )));
            }
        }
        if self.reconnect_delay.is_zero() {
            return Err(invalid("reconnect_delay_ms must be greater than 0".into()));
        }
        if self.release_timeout.is_zero() {
            return Err(invalid("release_timeout_ms must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            dev_mode: self.dev,
            coordinator_url: self.coordinator_url.clone(),
            project_id: self.project_id.clone(),
            reconnect_delay: self.reconnect_delay,
            release_timeout: self.release_timeout,
            viewport: self.viewport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, content: &str) {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(CONFIG_FILE), content).unwrap();
    }

    #[test]
    fn test_preview_config_defaults() {
        let config = PreviewConfig::default();
        assert_eq!(config.port, 3141);
        assert!(!config.dev);
        assert!(config.coordinator_url.is_none());
        assert!(config.project_id.is_none());
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        assert_eq!(config.viewport, ViewportPreset::Desktop);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PreviewConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 3141);
    }

    #[test]
    fn test_load_full() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[server]
port = 4000
dev = true

[channel]
coordinator_url = "ws://127.0.0.1:9000/ws"
project_id = 42
reconnect_delay_ms = 500

[render]
release_timeout_ms = 2500
viewport = "mobile"
"#,
        );

        let config = PreviewConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 4000);
        assert!(config.dev);
        assert_eq!(config.coordinator_url.as_deref(), Some("ws://127.0.0.1:9000/ws"));
        assert_eq!(config.project_id, Some(ProjectId::new("42")));
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.release_timeout, Duration::from_millis(2500));
        assert_eq!(config.viewport, ViewportPreset::Mobile);
    }

    #[test]
    fn test_load_partial() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[channel]\nproject_id = \"abc\"\n");

        let config = PreviewConfig::load(dir.path()).unwrap();
        assert_eq!(config.project_id, Some(ProjectId::new("abc")));
        assert_eq!(config.port, 3141);
        assert_eq!(config.release_timeout, DEFAULT_RELEASE_TIMEOUT);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "not valid toml {{{{");
        assert!(PreviewConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[server]\nprot = 1\n");
        assert!(PreviewConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_http_coordinator() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "[channel]\ncoordinator_url = \"http://localhost:4000\"\n",
        );
        let err = PreviewConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn test_zero_delay_is_invalid() {
        let config = PreviewConfig {
            reconnect_delay: Duration::ZERO,
            ..PreviewConfig::default()
        };
        assert!(matches!(
            config.validate(Path::new("x.toml")),
            Err(PreviewError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[channel]\nproject_id = \"1\"\n");
        let mut config = PreviewConfig::load(dir.path()).unwrap();

        config.apply_env(|key| match key {
            ENV_PROJECT_ID => Some("7".to_string()),
            ENV_COORDINATOR_URL => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.project_id, Some(ProjectId::new("7")));
        assert!(config.coordinator_url.is_none());
    }

    #[test]
    fn test_server_config_mirrors_settings() {
        let config = PreviewConfig {
            port: 9999,
            viewport: ViewportPreset::Tablet,
            ..PreviewConfig::default()
        };
        let server = config.server_config();
        assert_eq!(server.port, 9999);
        assert_eq!(server.viewport, ViewportPreset::Tablet);
    }
}
