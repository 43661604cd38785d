//! Client configuration
//!
//! Options come from the command line with environment fallbacks and are
//! resolved into a validated [`ClientConfig`].

use crate::decoder::DEFAULT_MAX_FRAME_BYTES;
use clap::Args;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Smallest frame limit that still fits a realistic payload
const MIN_FRAME_BYTES: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid backend URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Backend URL must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },

    #[error("Maximum frame size must be at least {MIN_FRAME_BYTES} bytes, got {0}")]
    FrameLimitTooSmall(usize),
}

/// Connection options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionOpts {
    /// Base URL of the chat backend (env: SEARCH_CHAT_BACKEND_URL)
    #[arg(
        long,
        global = true,
        env = "SEARCH_CHAT_BACKEND_URL",
        default_value = DEFAULT_BACKEND_URL
    )]
    pub backend_url: String,

    /// Connect timeout in seconds (env: SEARCH_CHAT_CONNECT_TIMEOUT_SECS)
    #[arg(
        long,
        global = true,
        env = "SEARCH_CHAT_CONNECT_TIMEOUT_SECS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
    )]
    pub connect_timeout_secs: u64,

    /// Timeout for history and thread list requests, in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Longest accepted stream line in bytes (env: SEARCH_CHAT_MAX_FRAME_BYTES)
    #[arg(
        long,
        global = true,
        env = "SEARCH_CHAT_MAX_FRAME_BYTES",
        default_value_t = DEFAULT_MAX_FRAME_BYTES,
        hide = true
    )]
    pub max_frame_bytes: usize,
}

impl ConnectionOpts {
    pub fn resolve(&self) -> Result<ClientConfig, ConfigError> {
        let backend_url = parse_backend_url(&self.backend_url)?;

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                name: "Connect timeout",
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                name: "Request timeout",
            });
        }
        if self.max_frame_bytes < MIN_FRAME_BYTES {
            return Err(ConfigError::FrameLimitTooSmall(self.max_frame_bytes));
        }

        Ok(ClientConfig {
            backend_url,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_frame_bytes: self.max_frame_bytes,
        })
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(url)
}

/// Resolved settings for talking to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend_url: Url,
    pub connect_timeout: Duration,
    /// Applies to one-shot requests, never to turn streams
    pub request_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse(DEFAULT_BACKEND_URL).expect("default backend URL is valid"),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(url: &str) -> ConnectionOpts {
        ConnectionOpts {
            backend_url: url.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    #[test]
    fn defaults_resolve_to_default_config() {
        let config = opts(DEFAULT_BACKEND_URL).resolve().unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn rejects_unparseable_url() {
        let err = opts("not a url").resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = opts("ftp://example.com").resolve().unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedScheme("ftp".into()));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let mut connect = opts(DEFAULT_BACKEND_URL);
        connect.connect_timeout_secs = 0;
        assert!(matches!(
            connect.resolve(),
            Err(ConfigError::ZeroTimeout { .. })
        ));

        let mut request = opts(DEFAULT_BACKEND_URL);
        request.request_timeout_secs = 0;
        assert!(matches!(
            request.resolve(),
            Err(ConfigError::ZeroTimeout { .. })
        ));
    }

    #[test]
    fn rejects_tiny_frame_limit() {
        let mut tiny = opts(DEFAULT_BACKEND_URL);
        tiny.max_frame_bytes = 16;
        assert_eq!(tiny.resolve(), Err(ConfigError::FrameLimitTooSmall(16)));
    }

    #[test]
    fn keeps_base_path() {
        let config = opts("https://chat.example.com/api/").resolve().unwrap();
        assert_eq!(config.backend_url.path(), "/api/");
    }
}
