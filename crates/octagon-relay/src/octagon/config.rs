use std::time::Duration;

use crate::errors::RelayError;

/// Default Octagon API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.octagonagents.com/v1";

const API_KEY_ENV: &str = "OCTAGON_API_KEY";
const BASE_URL_ENV: &str = "OCTAGON_API_BASE_URL";

/// Configuration for the Octagon streaming client.
#[derive(Clone, Debug)]
pub struct OctagonClientConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible endpoint, including the version path.
    pub base_url: String,
    /// Limit on establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Longest idle gap tolerated while reading; an actively streaming body
    /// is never cut off. Overall deadlines belong to the caller.
    pub read_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl OctagonClientConfig {
    /// Creates a config with defaults and the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(120),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    /// Builds a config from `OCTAGON_API_KEY` and optional `OCTAGON_API_BASE_URL`.
    pub fn from_env() -> Result<Self, RelayError> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(RelayError::Config(format!(
                "missing {API_KEY_ENV} for Octagon client"
            )));
        }
        let config = Self::new(api_key);
        Ok(match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.base_url(url.trim()),
            _ => config,
        })
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the idle read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
