use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

use crate::page::PageOrigin;
use crate::resolver::BUILD_TIME_API_BASE;

/// UDO session client - headless page-load session bootstrap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// API base URL (falls back to the build-time value)
    #[arg(short = 'a', long, env = "UDO_API_BASE")]
    pub api_base: Option<String>,

    /// OAuth client id sent on login
    #[arg(short = 'c', long, env = "UDO_CLIENT_ID", default_value = "udo")]
    pub client_id: String,

    /// Current page URL, including any `code` parameter
    #[arg(short = 'u', long, env = "PAGE_URL")]
    pub page_url: String,

    /// Path to the SQLite file holding the session slot
    #[arg(short = 'd', long, env = "SESSION_DB_FILE")]
    pub session_db: Option<String>,

    /// Hostnames only reachable inside the deployment network
    #[arg(long, env = "INTERNAL_HOSTS", value_delimiter = ',', default_value = "backend")]
    pub internal_hosts: Vec<String>,

    /// Upper bound for each bootstrap network step, in seconds
    #[arg(long, env = "BOOTSTRAP_TIMEOUT", default_value = "10")]
    pub bootstrap_timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub http_connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Resolve the session for the page URL and print the guard decision
    #[default]
    Bootstrap,
    /// Navigate to the identity provider
    Login,
    /// Clear the local token and navigate to the logout endpoint
    Logout,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub command: Command,

    // API
    pub api_base: Option<String>,
    pub internal_hosts: Vec<String>,
    pub client_id: String,

    // Page
    pub page_url: Url,
    pub session_db: PathBuf,

    // Timeouts
    pub bootstrap_timeout: Duration,
    pub http_connect_timeout: Duration,
    pub http_request_timeout: Duration,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let page_url = Url::parse(args.page_url.trim())
            .with_context(|| format!("PAGE_URL is not a valid URL: {}", args.page_url))?;

        let config = Config {
            command: args.command.unwrap_or_default(),

            api_base: args
                .api_base
                .or_else(|| BUILD_TIME_API_BASE.map(str::to_string)),
            internal_hosts: args.internal_hosts,
            client_id: args.client_id,

            page_url,
            session_db: args
                .session_db
                .map(|s| expand_tilde(&s))
                .unwrap_or_else(default_session_db),

            bootstrap_timeout: Duration::from_secs(args.bootstrap_timeout),
            http_connect_timeout: Duration::from_secs(args.http_connect_timeout),
            http_request_timeout: Duration::from_secs(args.http_timeout),

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.page_url.scheme(), "http" | "https") {
            anyhow::bail!("PAGE_URL must be an http(s) URL: {}", self.page_url);
        }
        if PageOrigin::of(&self.page_url).is_opaque() {
            anyhow::bail!("PAGE_URL has no usable origin: {}", self.page_url);
        }
        if self.client_id.trim().is_empty() {
            anyhow::bail!("UDO_CLIENT_ID cannot be empty");
        }
        if self.bootstrap_timeout.is_zero()
            || self.http_connect_timeout.is_zero()
            || self.http_request_timeout.is_zero()
        {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn default_session_db() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("udo-session")
        .join("session.sqlite3")
}
