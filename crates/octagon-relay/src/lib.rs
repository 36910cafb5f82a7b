//! Relays prompts to Octagon financial-intelligence agents and aggregates the
//! streamed answer into one text result.
//!
//! The core is [`aggregate`]: it folds an ordered stream of raw completion
//! records (chat-completion chunks or response-style events) into a single
//! string, appending the last citation batch as a `SOURCES:` block. A stream
//! failure is always surfaced as [`AggregationFailure`], never as partial text.
//!
//! # Relaying a tool call
//!
//! ```no_run
//! use octagon_relay::prelude::*;
//! use octagon_relay::octagon::{OctagonClientConfig, OctagonRelayBuilderExt};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), RelayError> {
//! let relay = Relay::builder()
//!     .octagon(OctagonClientConfig::from_env()?)?
//!     .build()?;
//!
//! let response = relay
//!     .call_tool("octagon-agent", PromptInput::new("Summarize AAPL's latest 10-K"))
//!     .await;
//! println!("{}", response.joined_text());
//! # Ok(())
//! # }
//! ```
//!
//! # Aggregating a stream directly
//!
//! ```
//! use futures::stream;
//! use octagon_relay::{AggregateOptions, aggregate};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let records = stream::iter(vec![
//!     Ok(serde_json::json!({"choices": [{"delta": {"content": "foo"}}]})),
//!     Ok(serde_json::json!({"type": "response.output_text.delta", "text": {"delta": "bar"}})),
//! ]);
//! let out = aggregate(records, AggregateOptions::default()).await.unwrap();
//! assert_eq!(out.text, "foobar");
//! # }
//! ```

/// Stream aggregation state machine and driver.
pub mod aggregate;
/// Citation type and `SOURCES:` formatting.
pub mod citation;
/// Public error types.
pub mod errors;
/// Structural matcher for raw stream records.
pub mod event;
/// Logging initialization.
pub mod observability;
/// Octagon HTTP client and relay wiring.
pub mod octagon;
/// Common imports for typical usage.
pub mod prelude;
/// Relay entry point and builder.
pub mod relay;
/// Completion source contract.
pub mod source;
/// Agent tool catalog and result envelope.
pub mod tools;

pub use aggregate::{AggregateOptions, Aggregation, Aggregator, AggregatorState, aggregate};
pub use citation::{Citation, SOURCES_SEPARATOR, append_sources};
pub use errors::{AggregationFailure, ProviderError, RelayError};
pub use event::IncrementalEvent;
pub use observability::init_observability;
pub use relay::{Relay, RelayBuilder};
pub use source::{CompletionRequest, CompletionSource, RecordStream};
pub use tools::{AgentTool, PromptInput, ToolContent, ToolResponse};
