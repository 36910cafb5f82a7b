/// Errors produced while opening or reading a backend completion stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Backend returned an application-level failure (HTTP status, auth, stream error frame).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Backend response framing or payload could not be decoded.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl ProviderError {
    /// Creates a provider-level error.
    pub fn provider(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Provider {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Transport { message }
            | Self::Protocol { message } => message,
        }
    }

    /// HTTP status reported by the backend, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Terminal failure of an aggregation pass.
///
/// Text accumulated before the failure is never carried here; only the count
/// of discarded deltas is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationFailure {
    /// The event stream itself failed before terminating normally.
    #[error("event stream failed after {deltas_discarded} text deltas: {source}")]
    Stream {
        deltas_discarded: usize,
        #[source]
        source: ProviderError,
    },
    /// The aggregator was driven after reaching a terminal state.
    #[error("aggregation protocol violation: {message}")]
    Protocol { message: String },
}

impl AggregationFailure {
    /// Returns the stream error that triggered this failure, if any.
    pub fn cause(&self) -> Option<&ProviderError> {
        match self {
            Self::Stream { source, .. } => Some(source),
            Self::Protocol { .. } => None,
        }
    }
}

/// Top-level error type for the public relay API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Invalid relay or client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Requested tool is not part of the catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The backend stream could not be opened.
    #[error(transparent)]
    Provider(ProviderError),
    /// The backend stream was opened but aggregation failed.
    #[error(transparent)]
    Aggregation(AggregationFailure),
}

impl From<ProviderError> for RelayError {
    fn from(value: ProviderError) -> Self {
        RelayError::Provider(value)
    }
}

impl From<AggregationFailure> for RelayError {
    fn from(value: AggregationFailure) -> Self {
        RelayError::Aggregation(value)
    }
}
