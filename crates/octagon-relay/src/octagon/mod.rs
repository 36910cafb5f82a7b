//! Octagon backend integration: HTTP client, SSE decoding, and configuration.
mod client;
mod config;
pub(crate) mod transport;

pub use client::OctagonClient;
pub use config::{DEFAULT_BASE_URL, OctagonClientConfig};

use std::sync::Arc;

use crate::errors::RelayError;
use crate::relay::{Relay, RelayBuilder};

/// Extension trait wiring an [`OctagonClient`] into a [`RelayBuilder`].
pub trait OctagonRelayBuilderExt {
    /// Uses an Octagon client built from `config` as the completion source.
    fn octagon(self, config: OctagonClientConfig) -> Result<Self, RelayError>
    where
        Self: Sized;
}

impl OctagonRelayBuilderExt for RelayBuilder {
    fn octagon(self, config: OctagonClientConfig) -> Result<Self, RelayError> {
        Ok(self.source(Arc::new(OctagonClient::new(config)?)))
    }
}

/// Builds a relay backed by Octagon using `OCTAGON_API_KEY`.
pub fn relay_from_env() -> Result<Relay, RelayError> {
    Relay::builder()
        .octagon(OctagonClientConfig::from_env()?)?
        .build()
}
