//! Server configuration from command-line flags and environment variables.
//!
//! ```bash
//! API_KEY=s3cret MUSIC_DIR=/srv/music plexsync-api --port 8000
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use plexsync_core::DEFAULT_SOURCE_DOMAIN;
use plexsync_infra::jobs::RetryPolicy;
use plexsync_infra::source::SpotdlConfig;
use plexsync_observability::LogFormat;

#[derive(Debug, Clone, Parser)]
#[command(name = "plexsync-api")]
#[command(about = "Accepts media links and downloads them in the background")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    #[arg(short, long, default_value_t = 8000, env = "PORT")]
    pub port: u16,

    /// `json` or `pretty`
    #[arg(long, default_value = "json", env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Directory downloaded audio is written to
    #[arg(long, default_value = "./music", env = "MUSIC_DIR")]
    pub music_dir: PathBuf,

    /// Path to the spotdl executable
    #[arg(long, default_value = "spotdl", env = "SPOTDL_PATH")]
    pub spotdl_path: PathBuf,

    /// Shared secret expected in the `x-api-key` header
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Cookie file forwarded to spotdl
    #[arg(long, env = "COOKIE_FILE")]
    pub cookie_file: Option<PathBuf>,

    // === Jobs ===

    /// Attempts per job, including the first
    #[arg(long, default_value_t = 3, env = "MAX_ATTEMPTS")]
    pub max_attempts: u32,

    #[arg(long, default_value = "mp3", env = "AUDIO_FORMAT")]
    pub audio_format: String,

    #[arg(long, default_value = "320k", env = "BITRATE")]
    pub bitrate: String,

    /// Upper bound for a single spotdl invocation, in seconds
    #[arg(long, default_value_t = 3600, env = "DOWNLOAD_TIMEOUT_SECS")]
    pub download_timeout_secs: u64,

    /// How long finished jobs stay queryable, in seconds (0 keeps them forever)
    #[arg(long, default_value_t = 86_400, env = "JOB_TTL_SECS")]
    pub job_ttl_secs: u64,

    #[arg(long, default_value_t = 300, env = "SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Host that submitted links must belong to
    #[arg(long, default_value = DEFAULT_SOURCE_DOMAIN, env = "SOURCE_DOMAIN")]
    pub source_domain: String,
}

impl Config {
    /// Listen address; `host` may be IPv4 or IPv6 (brackets optional).
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen host {}: {e}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn spotdl(&self) -> SpotdlConfig {
        SpotdlConfig {
            binary: self.spotdl_path.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            cookie_file: self.cookie_file.clone(),
            audio_format: self.audio_format.clone(),
            bitrate: self.bitrate.clone(),
            timeout: Duration::from_secs(self.download_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts)
    }

    /// `None` when eviction is disabled.
    pub fn job_ttl(&self) -> Option<Duration> {
        (self.job_ttl_secs > 0).then(|| Duration::from_secs(self.job_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
