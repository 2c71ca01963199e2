//! Sharpie configuration management
//! Handles loading and saving the config file plus environment overrides

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sharpie configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Database path
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Ollama settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// CORS origins; `*` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Path prefix of shareable prompt links
    #[serde(default = "default_share_path_prefix")]
    pub share_path_prefix: String,
}

fn default_db_path() -> String {
    "~/.sharpie/sharpie.db".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_share_path_prefix() -> String {
    "/p".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            server: ServerConfig::default(),
            inference: InferenceConfig::default(),
            allowed_origins: default_allowed_origins(),
            share_path_prefix: default_share_path_prefix(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Inference backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    /// Ollama base URL
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Ceiling on a whole generation request, body included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Model used when a generate request names none
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_model() -> String {
    "qwen2.5:3b".to_string()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            timeout_secs: default_timeout_secs(),
            default_model: default_model(),
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from the default location or specified path, then apply
    /// environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        let mut config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Config =
                serde_yaml::from_str(&raw).context("Failed to parse config file")?;
            debug!("Loaded config from {:?}", config_path);
            config
        } else {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Config::default();
            config.save(path)?;
            config
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Apply `OLLAMA_HOST`, `DATABASE_PATH` and `ALLOWED_ORIGINS`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
            self.inference.host = host;
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|v| !v.is_empty()) {
            self.database_path = path;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            if !origins.is_empty() {
                self.allowed_origins = origins;
            }
        }
    }

    /// Get the config file path
    fn config_path(path: Option<&str>) -> Result<PathBuf> {
        // Check env override first
        if let Ok(env_path) = std::env::var("SHARPIE_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".sharpie").join("config.yml"))
    }

    /// Resolve database path (expand a leading ~)
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match self.database_path.strip_prefix('~') {
            Some(rest) => {
                let home = dirs::home_dir().context("Cannot find home directory")?;
                Ok(home.join(rest.trim_start_matches(['/', '\\'])))
            }
            None => Ok(PathBuf::from(&self.database_path)),
        }
    }
}
