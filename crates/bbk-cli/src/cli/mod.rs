//! CLI for the BBK backup tool.

mod commands;
mod format;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use bbk_core::config::{self, BackupConfig};
use std::path::PathBuf;

use commands::{run_backup_command, run_checksum};

/// Environment variable holding `user:apikey` for the API and downloads hosts.
pub const CREDENTIALS_ENV: &str = "BINTRAY_BACKUPER_API_CREDENTIALS";

/// Top-level CLI for the BBK backup tool.
#[derive(Debug, Parser)]
#[command(name = "bbk")]
#[command(about = "BBK: verified backup of a Bintray-compatible account", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every file of a subject, verifying SHA-1 checksums.
    Backup(BackupArgs),

    /// Compute SHA-1 of a file (the digest Bintray publishes).
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Disk read buffer (bytes).
        #[arg(long, default_value = "16384", value_name = "BYTES")]
        buffer_bytes: usize,
    },
}

/// Flags for `bbk backup`. Unset values fall back to config.toml.
#[derive(Debug, Clone, Args)]
pub struct BackupArgs {
    /// Bintray "subject": the org or user name that hosts the files.
    #[arg(long)]
    pub subject: String,

    /// Files are stored as DIR/subject/repo/package/path-to-file. Existing files
    /// are verified against the catalog checksum and only re-downloaded on mismatch.
    #[arg(long, value_name = "DIR")]
    pub download_dir: PathBuf,

    /// Bintray-compatible API endpoint.
    #[arg(long, value_name = "URL")]
    pub api_endpoint: Option<String>,

    /// Bintray-compatible downloads endpoint.
    #[arg(long, value_name = "URL")]
    pub downloads_endpoint: Option<String>,

    /// Network stream buffer (bytes).
    #[arg(long, value_name = "BYTES")]
    pub network_buffer_bytes: Option<usize>,

    /// Checksum disk stream buffer (bytes).
    #[arg(long, value_name = "BYTES")]
    pub checksum_buffer_bytes: Option<usize>,

    /// Number of threads for HTTP requests.
    #[arg(long, value_name = "N")]
    pub http_threads: Option<usize>,

    /// Number of threads for checksum verification (default: cores * 6, disk bound).
    #[arg(long, value_name = "N")]
    pub checksum_threads: Option<usize>,

    /// Number of retries to attempt for each download.
    #[arg(long, value_name = "N")]
    pub download_retries: Option<u32>,

    /// HTTP connection timeout (seconds).
    #[arg(long, value_name = "SECS")]
    pub http_connection_timeout: Option<u64>,

    /// HTTP read stall timeout (seconds).
    #[arg(long, value_name = "SECS")]
    pub http_read_timeout: Option<u64>,

    /// HTTP write stall timeout (seconds).
    #[arg(long, value_name = "SECS")]
    pub http_write_timeout: Option<u64>,

    /// HTTP call timeout (seconds).
    #[arg(long, value_name = "SECS")]
    pub http_call_timeout: Option<u64>,
}

impl BackupArgs {
    /// Overlay the flags that were given on top of `cfg`.
    pub fn apply_to(&self, cfg: &mut BackupConfig) {
        if let Some(v) = &self.api_endpoint {
            cfg.api_endpoint = v.clone();
        }
        if let Some(v) = &self.downloads_endpoint {
            cfg.downloads_endpoint = v.clone();
        }
        if let Some(v) = self.network_buffer_bytes {
            cfg.network_buffer_bytes = v;
        }
        if let Some(v) = self.checksum_buffer_bytes {
            cfg.checksum_buffer_bytes = v;
        }
        if let Some(v) = self.http_threads {
            cfg.http_threads = v;
        }
        if let Some(v) = self.checksum_threads {
            cfg.checksum_threads = Some(v);
        }
        if let Some(v) = self.download_retries {
            cfg.download_retries = v;
        }
        if let Some(v) = self.http_connection_timeout {
            cfg.timeouts.connect_secs = v;
        }
        if let Some(v) = self.http_read_timeout {
            cfg.timeouts.read_secs = v;
        }
        if let Some(v) = self.http_write_timeout {
            cfg.timeouts.write_secs = v;
        }
        if let Some(v) = self.http_call_timeout {
            cfg.timeouts.call_secs = v;
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Backup(args) => {
                let mut cfg = config::load_or_init()?;
                args.apply_to(&mut cfg);
                tracing::debug!("effective config: {:?}", cfg);
                let credentials = std::env::var(CREDENTIALS_ENV).ok();
                run_backup_command(&cfg, &args, credentials.as_deref()).await?;
            }
            CliCommand::Checksum { path, buffer_bytes } => run_checksum(&path, buffer_bytes)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
