use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://cloud.mongodb.com/";
pub const DEFAULT_BIND_PORT: u16 = 6005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryMode {
    Enabled,
    Disabled,
}

#[derive(Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_client_id: Option<String>,
    pub api_client_secret: Option<String>,
    pub connection_string: Option<String>,
    pub telemetry: TelemetryMode,
    pub do_not_track: bool,
    pub bind_addr: String,
    pub bind_port: u16,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_API_BASE_URL must be an http(s) URL")]
    InvalidApiBaseUrl,
    #[error("MCP_API_CLIENT_ID and MCP_API_CLIENT_SECRET must be set together")]
    IncompleteCredentials,
    #[error("MCP_TELEMETRY must be either `enabled` or `disabled`")]
    InvalidTelemetry,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url =
            non_empty("MCP_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !(api_base_url.starts_with("https://") || api_base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidApiBaseUrl);
        }

        let api_client_id = non_empty("MCP_API_CLIENT_ID");
        let api_client_secret = non_empty("MCP_API_CLIENT_SECRET");
        if api_client_id.is_some() != api_client_secret.is_some() {
            return Err(ConfigError::IncompleteCredentials);
        }

        let telemetry = match non_empty("MCP_TELEMETRY").as_deref() {
            None | Some("enabled") => TelemetryMode::Enabled,
            Some("disabled") => TelemetryMode::Disabled,
            Some(_) => return Err(ConfigError::InvalidTelemetry),
        };

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(DEFAULT_BIND_PORT);

        let config = Self {
            api_base_url,
            api_client_id,
            api_client_secret,
            connection_string: non_empty("MCP_CONNECTION_STRING"),
            telemetry,
            do_not_track: lookup("DO_NOT_TRACK").is_some(),
            bind_addr,
            bind_port,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry == TelemetryMode::Enabled && !self.do_not_track
    }
}

// Credentials and the connection string can carry secrets.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("api_client_id", &self.api_client_id)
            .field(
                "api_client_secret",
                &self.api_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .field("telemetry", &self.telemetry)
            .field("do_not_track", &self.do_not_track)
            .field("bind_addr", &self.bind_addr)
            .field("bind_port", &self.bind_port)
            .finish()
    }
}
