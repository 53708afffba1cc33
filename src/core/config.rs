/// Server Configuration
///
/// All settings come from environment variables with defaults. A `.env` file
/// in the working directory is loaded into the environment by `main` before
/// this module reads it.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "arithmetic-mcp")
/// - SERVER_VERSION: Version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "http")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 8000)
/// - WORKER_THREADS: HTTP worker count (default: CPU count, capped at 16)
/// - TOOL_DUPLICATE_POLICY: "replace" or "reject" (default: "replace")

use std::str::FromStr;

use crate::core::error::ConfigError;
use crate::core::protocol::ServerInfo;
use crate::core::registry::DuplicatePolicy;

const MAX_DEFAULT_WORKERS: usize = 16;

/// Which transports the binary serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Line-delimited JSON-RPC on stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP plus the plain tool routes.
    Http,
    /// STDIO in a background task alongside the HTTP server.
    Both,
}

impl FromStr for TransportMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            "both" => Ok(Self::Both),
            _ => Err("must be 'stdio', 'http', or 'both'"),
        }
    }
}

/// Settings for the whole binary, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server name as reported in MCP initialize responses
    pub name: String,
    /// Server version string as reported in MCP initialize responses
    pub version: String,
    /// Transports to serve
    pub transport: TransportMode,
    /// Bind address for HTTP mode (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// Port number for HTTP mode
    pub port: u16,
    /// HTTP worker thread count
    pub workers: usize,
    /// What to do when two tools share a name
    pub duplicate_policy: DuplicatePolicy,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let workers = match lookup("WORKER_THREADS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("WORKER_THREADS", raw, "expected a positive integer")),
            },
            None => num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
        };

        Ok(Self {
            name: lookup("SERVER_NAME").unwrap_or_else(|| "arithmetic-mcp".to_string()),
            version: lookup("SERVER_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            transport: parse_or("MCP_TRANSPORT_MODE", &lookup, TransportMode::Http)?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match lookup("PORT") {
                Some(raw) => raw
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| invalid("PORT", raw, "expected a port number"))?,
                None => 8000,
            },
            workers,
            duplicate_policy: parse_or("TOOL_DUPLICATE_POLICY", &lookup, DuplicatePolicy::Replace)?,
        })
    }

    /// `host:port` string the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Identity reported in MCP `initialize` responses.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

fn parse_or<T>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr<Err = &'static str>,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|reason| invalid(key, raw, reason)),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue { key, value, reason }
}
