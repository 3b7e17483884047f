//! Configuration management for the WordPress MCP Server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::wordpress::SiteDefaults;

/// Command-line arguments for the WordPress MCP Server.
#[derive(Parser, Debug, Clone)]
#[command(name = "wordpress-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing WordPress content tools over stdio or HTTP/SSE")]
pub struct Args {
    /// Transport mode: stdio or sse
    #[arg(short, long, default_value = "stdio", env = "WORDPRESS_MCP_TRANSPORT")]
    pub transport: Transport,

    /// Address to bind (only for sse transport)
    #[arg(long, default_value = "127.0.0.1", env = "WORDPRESS_MCP_HOST")]
    pub host: String,

    /// HTTP port (only for sse transport)
    #[arg(short, long, default_value = "3000", env = "WORDPRESS_MCP_PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "WORDPRESS_MCP_DEBUG")]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "WORDPRESS_MCP_LOG_JSON")]
    pub log_json: bool,

    /// Timeout for WordPress REST requests, in seconds
    #[arg(long, default_value = "30", env = "WORDPRESS_MCP_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Default WordPress site URL
    #[arg(long, env = "WORDPRESS_SITE_URL")]
    pub site_url: Option<String>,

    /// Default WordPress username
    #[arg(long, env = "WORDPRESS_USERNAME")]
    pub username: Option<String>,

    /// Default WordPress application password
    #[arg(long, env = "WORDPRESS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// Bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// JSON log output
    pub log_json: bool,
    /// REST request timeout in seconds
    pub request_timeout: u64,
    /// Fallback credentials
    pub site: SiteDefaults,
}

impl Config {
    /// `host:port` for the SSE listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    /// Credentials used when a tool call does not supply its own.
    pub fn site_defaults(&self) -> SiteDefaults {
        self.site.clone()
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            host: args.host,
            port: args.port,
            debug: args.debug,
            log_json: args.log_json,
            request_timeout: args.request_timeout,
            site: SiteDefaults {
                site_url: args.site_url,
                username: args.username,
                password: args.password,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: "127.0.0.1".to_string(),
            port: 3000,
            debug: false,
            log_json: false,
            request_timeout: 30,
            site: SiteDefaults::default(),
        }
    }
}
