use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.bintray.com/";
pub const DEFAULT_DOWNLOADS_ENDPOINT: &str = "https://dl.bintray.com/";

/// HTTP timeouts in seconds (optional section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// TCP/TLS connect timeout.
    pub connect_secs: u64,
    /// Longest a single read may stall before the request is failed.
    pub read_secs: u64,
    /// Longest a single write may stall before the request is failed.
    pub write_secs: u64,
    /// Upper bound on a whole request, including the body transfer.
    pub call_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            read_secs: 60,
            write_secs: 60,
            call_secs: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn call(&self) -> Duration {
        Duration::from_secs(self.call_secs)
    }

    /// curl has no per-read/per-write timeout; both map onto its low-speed window.
    pub fn stall(&self) -> Duration {
        Duration::from_secs(self.read_secs.max(self.write_secs))
    }
}

/// Retry pacing (optional section in config.toml).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay between download attempts in milliseconds. 0 retries immediately.
    #[serde(default)]
    pub delay_ms: u64,
}

/// Global configuration loaded from `~/.config/bbk/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Bintray-compatible API endpoint.
    pub api_endpoint: String,
    /// Bintray-compatible downloads endpoint.
    pub downloads_endpoint: String,
    /// Network stream buffer in bytes.
    pub network_buffer_bytes: usize,
    /// Checksum disk stream buffer in bytes.
    pub checksum_buffer_bytes: usize,
    /// Size of the network worker pool (catalog reads and downloads).
    pub http_threads: usize,
    /// Size of the checksum worker pool. None = number of cores * 6 (disk bound).
    #[serde(default)]
    pub checksum_threads: Option<usize>,
    /// Additional attempts per file after the first download fails.
    pub download_retries: u32,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            downloads_endpoint: DEFAULT_DOWNLOADS_ENDPOINT.to_string(),
            network_buffer_bytes: 16 * 1024,
            checksum_buffer_bytes: 16 * 1024,
            http_threads: 6,
            checksum_threads: None,
            download_retries: 3,
            timeouts: TimeoutConfig::default(),
            retry: None,
        }
    }
}

impl BackupConfig {
    pub fn effective_checksum_threads(&self) -> usize {
        self.checksum_threads
            .unwrap_or_else(|| num_cpus::get().saturating_mul(6))
            .max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry.map(|r| r.delay_ms).unwrap_or(0))
    }

    pub fn api_url(&self) -> Result<Url> {
        parse_endpoint("api_endpoint", &self.api_endpoint)
    }

    pub fn downloads_url(&self) -> Result<Url> {
        parse_endpoint("downloads_endpoint", &self.downloads_endpoint)
    }

    /// Rejects values the pipeline cannot run with, before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.http_threads == 0 {
            anyhow::bail!("http_threads must be at least 1");
        }
        if self.checksum_threads == Some(0) {
            anyhow::bail!("checksum_threads must be at least 1");
        }
        if self.network_buffer_bytes == 0 {
            anyhow::bail!("network_buffer_bytes must be at least 1");
        }
        if self.checksum_buffer_bytes == 0 {
            anyhow::bail!("checksum_buffer_bytes must be at least 1");
        }
        self.api_url()?;
        self.downloads_url()?;
        Ok(())
    }
}

fn parse_endpoint(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .with_context(|| format!("invalid {}, value = '{}'", name, value))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("invalid {}: expected http(s) URL, got '{}'", name, value);
    }
    if url.host_str().is_none() {
        anyhow::bail!("invalid {}: missing host in '{}'", name, value);
    }
    Ok(url)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bbk")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BackupConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BackupConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BackupConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
