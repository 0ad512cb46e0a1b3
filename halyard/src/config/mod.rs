//! Configuration management
//!
//! Default config location: ~/.halyard/config.toml

use anyhow::{anyhow, bail, Result};
use halyard_es::HttpClientConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Search engine connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Skip certificate verification (INSECURE - development only)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Budget for a blocking reindex during migration
    #[serde(default = "default_reindex_timeout")]
    pub reindex_timeout_secs: u64,
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_reindex_timeout() -> u64 {
    3600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            username: None,
            password: None,
            accept_invalid_certs: false,
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            reindex_timeout_secs: default_reindex_timeout(),
        }
    }
}

impl EngineConfig {
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            reindex_timeout: Duration::from_secs(self.reindex_timeout_secs),
        }
    }
}

/// Where learned mappings are persisted
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".halyard")
        .join("es_mappings.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Alias naming
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default = "default_read_suffix")]
    pub read_suffix: String,
    #[serde(default = "default_write_suffix")]
    pub write_suffix: String,
}

fn default_read_suffix() -> String {
    "-read".to_string()
}

fn default_write_suffix() -> String {
    "-write".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            read_suffix: default_read_suffix(),
            write_suffix: default_write_suffix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthesisConfig {
    /// Rescale search boosts onto 0-10 against the largest one
    #[serde(default = "default_true")]
    pub normalize_boosts: bool,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_page_size() -> usize {
    1000
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            normalize_boosts: default_true(),
            max_page_size: default_max_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MigrationConfig {
    /// Zero-padded digits in generated index names (`products-000001`)
    #[serde(default = "default_generation_width")]
    pub generation_width: usize,
    /// Confirm both aliases point at the new index before reporting success
    #[serde(default = "default_true")]
    pub reconcile: bool,
}

fn default_generation_width() -> usize {
    6
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            generation_width: default_generation_width(),
            reconcile: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,halyard=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            if let Err(e) = config.save(config_path) {
                tracing::warn!(path = %config_path.display(), error = %e, "Could not write default config");
            }
            config
        };

        config.expand_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would only fail later
    pub fn validate(&self) -> Result<()> {
        if self.engine.url.trim().is_empty() {
            bail!("engine.url must not be empty");
        }
        if self.engine.password.is_some() && self.engine.username.is_none() {
            bail!("engine.password is set without engine.username");
        }
        if self.identity.read_suffix.is_empty() || self.identity.write_suffix.is_empty() {
            bail!("identity suffixes must not be empty");
        }
        if self.identity.read_suffix == self.identity.write_suffix {
            bail!("identity.read_suffix and identity.write_suffix must differ");
        }
        if self.synthesis.max_page_size == 0 {
            bail!("synthesis.max_page_size must be at least 1");
        }
        if !(1..=18).contains(&self.migration.generation_width) {
            bail!("migration.generation_width must be between 1 and 18");
        }
        Ok(())
    }

    /// Expand ~ in all paths
    fn expand_paths(&mut self) -> Result<()> {
        self.store.path = expand_tilde(&self.store.path)?;
        Ok(())
    }
}
