use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use bridge_traits::time::LogLevel;
use clap::Parser;
use core_runtime::logging::{LogFormat, LoggingConfig};

use crate::sessions::DEFAULT_MAX_SESSIONS;

#[derive(Debug, Parser)]
#[command(name = "bijlagetool", version, about = "Bijlagetool: search and download Google Drive attachments")]
pub struct Cli {
    /// Google client-secrets JSON file.
    #[arg(long, env = "BIJLAGETOOL_CLIENT_SECRETS")]
    pub client_secrets: PathBuf,

    /// Override the redirect URI from the client-secrets file.
    #[arg(long, env = "BIJLAGETOOL_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    #[arg(long, env = "BIJLAGETOOL_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(long, env = "BIJLAGETOOL_PORT", default_value_t = 8501)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BIJLAGETOOL_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    pub json_logs: bool,

    /// Seconds before a Drive request is abandoned.
    #[arg(long, default_value_t = 30)]
    pub request_timeout: u64,

    /// Minutes of inactivity after which a browser session is dropped.
    #[arg(long, default_value_t = 480)]
    pub session_idle_minutes: u64,

    /// Live browser sessions kept in memory.
    #[arg(long, env = "BIJLAGETOOL_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,
}

impl Cli {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}: {}", self.bind, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn logging(&self) -> LoggingConfig {
        let format = if self.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        LoggingConfig::default()
            .with_format(format)
            .with_level(self.log_level)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes.saturating_mul(60))
    }
}
