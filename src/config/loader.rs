//! Configuration loading with multi-layer merge

use super::sevdesk::API_TOKEN_ENV;
use super::{SevdeskConfig, StoreConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level projektflow configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjektflowConfig {
    /// sevDesk API access
    #[serde(default)]
    pub sevdesk: SevdeskConfig,

    /// Project store location
    #[serde(default)]
    pub store: StoreConfig,
}

impl ProjektflowConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/projektflow/config.toml
    /// 3. .projektflow/config.toml (working directory)
    /// 4. SEVDESK_API_TOKEN environment variable
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let env_token = std::env::var(API_TOKEN_ENV).ok();
        Self::load_layers(Self::user_config_path(), project_dir, env_token)
    }

    /// Merge the layers from explicit sources
    fn load_layers(
        user_config_path: Option<PathBuf>,
        project_dir: Option<&Path>,
        env_token: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = user_config_path {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".projektflow/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".projektflow/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            config.sevdesk.api_token = Some(token);
        }

        tracing::debug!(
            base_url = %config.sevdesk.base_url,
            has_token = config.sevdesk.api_token.is_some(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/projektflow/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("projektflow/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        self.sevdesk.merge(other.sevdesk);
        self.store.merge(other.store);
    }

    /// Database path, falling back to the user data directory
    pub fn store_path(&self) -> Result<PathBuf> {
        self.store
            .resolved_path()
            .context("could not determine data directory for the project store")
    }
}
