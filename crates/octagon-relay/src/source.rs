use std::pin::Pin;
use std::time::Duration;

use crate::errors::ProviderError;

/// Ordered, finite stream of raw completion records.
pub type RecordStream =
    Pin<Box<dyn futures::Stream<Item = Result<serde_json::Value, ProviderError>> + Send + 'static>>;

/// One prompt relayed to a backend model.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// Correlation id for logs.
    pub call_id: uuid::Uuid,
    /// Backend model name (the agent name for Octagon).
    pub model: String,
    /// User prompt, already validated as non-blank.
    pub prompt: String,
    /// Optional per-request timeout applied by the transport.
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            call_id: uuid::Uuid::new_v4(),
            model: model.into(),
            prompt: prompt.into(),
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Backend that turns a prompt into a stream of raw completion records.
///
/// Implementations open the stream only; they never aggregate it.
#[async_trait::async_trait]
pub trait CompletionSource: Send + Sync {
    async fn open_stream(&self, req: CompletionRequest) -> Result<RecordStream, ProviderError>;
}
