//! Console configuration.
//!
//! Loaded from `config.toml` in the platform config directory, then
//! overridden by `AWSCONSOLE_*` environment variables. Command-line flags are
//! applied on top by the binary.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REGION: &str = "ap-northeast-2";
pub const DEFAULT_LOG_FILTER: &str = "awsconsole=info,reqwest=warn,hyper=warn";

pub const ENV_BACKEND_URL: &str = "AWSCONSOLE_BACKEND_URL";
pub const ENV_REGION: &str = "AWSCONSOLE_REGION";

/// Platform directories for this application
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "", "awsconsole")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Origin the `/api/...` paths are resolved against
    pub backend_url: String,
    pub default_region: String,
    /// Overrides the default `<data dir>/session.json`
    pub session_file: Option<PathBuf>,
    /// `EnvFilter` directive; `RUST_LOG` still wins when set
    pub log_filter: Option<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            default_region: DEFAULT_REGION.to_string(),
            session_file: None,
            log_filter: None,
        }
    }
}

impl ConsoleConfig {
    /// Path of the config file, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location with environment overrides applied.
    ///
    /// Not validated: command-line overrides still have to be applied, so the
    /// caller runs [`validate`](Self::validate) once they are.
    pub fn load() -> Result<Self> {
        Self::load_with(Self::default_path().as_deref(), |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup);
        Ok(config)
    }

    /// Read `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Apply environment overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.trim().is_empty()) {
            self.default_region = region.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.backend_url)
            .with_context(|| format!("Invalid backend_url '{}'", self.backend_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("backend_url must be http or https, got '{}'", url.scheme());
        }
        if self.default_region.trim().is_empty() {
            anyhow::bail!("default_region must not be empty");
        }
        Ok(())
    }

    /// Where the session id is persisted
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("session.json")))
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
