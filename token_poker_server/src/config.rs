//! Server configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:25917";
pub const DEFAULT_POLL_SECS: u64 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `TOKEN_POKER_BIND`
    pub bind: SocketAddr,
    /// How long a `List` waits for a new version before answering `Timeout`.
    /// `TOKEN_POKER_POLL_SECS`
    pub poll_window: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },
}

impl ServerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to its
    /// value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = match lookup("TOKEN_POKER_BIND") {
            Some(value) => value.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "TOKEN_POKER_BIND",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            None => default_bind(),
        };

        let poll_secs = match lookup("TOKEN_POKER_POLL_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: "TOKEN_POKER_POLL_SECS",
                        value,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "TOKEN_POKER_POLL_SECS",
                        value,
                        reason: e.to_string(),
                    });
                }
            },
            None => DEFAULT_POLL_SECS,
        };

        Ok(ServerConfig { bind, poll_window: Duration::from_secs(poll_secs) })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: default_bind(), poll_window: Duration::from_secs(DEFAULT_POLL_SECS) }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 25917))
}
