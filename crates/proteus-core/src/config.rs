use crate::download::DownloadPolicy;
use crate::transport::CurlOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables that override the file's connection settings.
pub const ENV_URL: &str = "PROTEUS_URL";
pub const ENV_TOKEN: &str = "PROTEUS_TOKEN";

/// Download polling parameters (optional `[download]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Re-polls allowed while the service answers 202. Negative means none.
    pub max_retries: i64,
    /// Fixed pause between polls, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 5,
        }
    }
}

/// Connection timeouts (optional `[http]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Whole-transfer cap, streamed downloads included.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 3600,
        }
    }
}

/// Global configuration loaded from `~/.config/proteus/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProteusConfig {
    /// Service base URL, e.g. `https://proteus.example.com/api/`.
    pub url: String,
    /// Bearer token sent with every request.
    pub token: String,
    #[serde(default)]
    pub download: Option<DownloadConfig>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
    /// Transformation catalog exposed to callers as-is.
    #[serde(default)]
    pub transformations: toml::Table,
    /// Output format catalog exposed to callers as-is.
    #[serde(default)]
    pub formats: toml::Table,
}

impl ProteusConfig {
    /// Fails when the service URL or token is missing.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() || self.token.trim().is_empty() {
            anyhow::bail!("The base URL or token is not set.");
        }
        Ok(())
    }

    /// Replaces url/token with `PROTEUS_URL` / `PROTEUS_TOKEN` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_URL) {
            self.url = url;
        }
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            self.token = token;
        }
        self
    }

    pub fn download_policy(&self) -> DownloadPolicy {
        let d = self.download.clone().unwrap_or_default();
        DownloadPolicy::new(d.max_retries, d.retry_delay_secs)
    }

    pub fn curl_options(&self) -> CurlOptions {
        let h = self.http.clone().unwrap_or_default();
        CurlOptions {
            connect_timeout: Duration::from_secs(h.connect_timeout_secs),
            timeout: Duration::from_secs(h.timeout_secs),
            ..CurlOptions::default()
        }
    }

    pub fn transformations_json(&self) -> serde_json::Value {
        table_to_json(&self.transformations)
    }

    pub fn formats_json(&self) -> serde_json::Value {
        table_to_json(&self.formats)
    }
}

fn table_to_json(table: &toml::Table) -> serde_json::Value {
    serde_json::to_value(table).unwrap_or_else(|e| {
        tracing::warn!("config table not representable as JSON: {}", e);
        serde_json::Value::Object(serde_json::Map::new())
    })
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("proteus")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ProteusConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ProteusConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<ProteusConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: ProteusConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
