//! Common imports for typical relay usage.
pub use crate::{
    AgentTool, AggregateOptions, Aggregation, AggregationFailure, CompletionSource, PromptInput,
    ProviderError, Relay, RelayBuilder, RelayError, ToolResponse,
};
