use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::aggregate::{AggregateOptions, Aggregation, aggregate};
use crate::errors::RelayError;
use crate::source::{CompletionRequest, CompletionSource};
use crate::tools::{AgentTool, PromptInput, ToolResponse};

struct RelayInner {
    source: Arc<dyn CompletionSource>,
    options: AggregateOptions,
    timeout: Option<Duration>,
}

/// Runs agent tool calls: prompt in, aggregated answer out.
///
/// Cheap to clone; concurrent calls share only immutable state.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    /// Starts a builder.
    pub fn builder() -> RelayBuilder {
        RelayBuilder::default()
    }

    /// Relays `prompt` to `tool` and aggregates the streamed answer.
    pub async fn ask(
        &self,
        tool: AgentTool,
        prompt: impl Into<String>,
    ) -> Result<Aggregation, RelayError> {
        let input = PromptInput::new(prompt);
        input.validate()?;

        let mut request = CompletionRequest::new(tool.model(), input.prompt);
        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }
        let call_id = request.call_id;
        info!(%call_id, tool = %tool, "relaying prompt");

        let records = self.inner.source.open_stream(request).await?;
        let aggregation = aggregate(records, self.inner.options.clone()).await?;
        info!(%call_id, tool = %tool, chars = aggregation.text.len(), "tool call completed");
        Ok(aggregation)
    }

    /// Runs a tool by name and maps the outcome onto a result envelope.
    ///
    /// Never fails; every error becomes an `is_error` response.
    pub async fn call_tool(&self, name: &str, input: PromptInput) -> ToolResponse {
        let tool = match AgentTool::resolve(name) {
            Ok(tool) => tool,
            Err(err) => {
                warn!(tool = name, error = %err, "tool call rejected");
                return ToolResponse::error(format!("Error: {err}"));
            }
        };
        match self.ask(tool, input.prompt).await {
            Ok(aggregation) => ToolResponse::text(aggregation.text),
            Err(err) => {
                warn!(tool = %tool, error = %err, "tool call failed");
                ToolResponse::failure(tool, &err)
            }
        }
    }
}

/// Builder for [`Relay`].
#[derive(Default)]
pub struct RelayBuilder {
    source: Option<Arc<dyn CompletionSource>>,
    options: AggregateOptions,
    timeout: Option<Duration>,
}

impl RelayBuilder {
    /// Sets the backend the relay streams from.
    pub fn source(mut self, source: Arc<dyn CompletionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn aggregate_options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }

    /// Per-call timeout passed down to the source.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Relay, RelayError> {
        let source = self
            .source
            .ok_or_else(|| RelayError::Config("relay requires a completion source".into()))?;
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(RelayError::Config("timeout must be greater than zero".into()));
        }
        Ok(Relay {
            inner: Arc::new(RelayInner {
                source,
                options: self.options,
                timeout: self.timeout,
            }),
        })
    }
}
