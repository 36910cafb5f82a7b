use std::collections::VecDeque;
use std::fmt;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, trace};

use crate::errors::{ProviderError, RelayError};
use crate::source::{CompletionRequest, CompletionSource, RecordStream};

use super::config::OctagonClientConfig;
use super::transport::{SseDecoder, SseFrame, decode_frame};

/// Streaming client for Octagon's OpenAI-compatible chat completions API.
pub struct OctagonClient {
    client: reqwest::Client,
    config: OctagonClientConfig,
}

impl OctagonClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: OctagonClientConfig) -> Result<Self, RelayError> {
        if config.api_key.trim().is_empty() {
            return Err(RelayError::Config(
                "Octagon client config api_key must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build Octagon client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client using `OCTAGON_API_KEY` / `OCTAGON_API_BASE_URL`.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::new(OctagonClientConfig::from_env()?)
    }

    pub fn config(&self) -> &OctagonClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl CompletionSource for OctagonClient {
    async fn open_stream(&self, req: CompletionRequest) -> Result<RecordStream, ProviderError> {
        let body = build_request_body(&req);
        debug!(call_id = %req.call_id, model = %req.model, "opening Octagon completion stream");

        let mut http_req = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(timeout) = req.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| {
                ProviderError::transport(format!("Octagon request failed: {}", describe_http_error(&e)))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::provider(
                format!("Octagon request for {} failed with status {status}: {body}", req.model),
                Some(status.as_u16()),
            ));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| describe_http_error(&e)));
        Ok(Box::pin(record_stream(bytes)))
    }
}

/// Renders a reqwest error with its source chain, flagging timeouts.
fn describe_http_error(err: &reqwest::Error) -> String {
    let chain = error_chain(err);
    if err.is_timeout() {
        format!("timed out: {chain}")
    } else {
        chain
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}

pub(crate) fn build_request_body(req: &CompletionRequest) -> serde_json::Value {
    serde_json::json!({
        "model": req.model,
        "messages": [{ "role": "user", "content": req.prompt }],
        "stream": true,
        "metadata": { "tool": "mcp" },
    })
}

/// Decodes an SSE byte stream into raw completion records.
///
/// A body read error ends the stream with `ProviderError::Transport`.
pub(crate) fn record_stream<S, E>(
    bytes: S,
) -> impl futures::Stream<Item = Result<serde_json::Value, ProviderError>> + Send + 'static
where
    S: futures::Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<serde_json::Value>,
        done: bool,
    }

    fn enqueue<S>(state: &mut State<S>, frame: SseFrame) -> Result<(), ProviderError> {
        trace!(event = ?frame.event, "sse frame");
        if let Some(record) = decode_frame(&frame)? {
            state.pending.push_back(record);
        }
        Ok(())
    }

    stream::try_unfold(
        State {
            bytes: Box::pin(bytes),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(record) = state.pending.pop_front() {
                    return Ok(Some((record, state)));
                }
                if state.done {
                    return Ok(None);
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            enqueue(&mut state, frame)?;
                        }
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::transport(format!(
                            "Octagon streaming read failed: {e}"
                        )));
                    }
                    None => {
                        state.done = true;
                        if let Some(frame) = state.decoder.finish() {
                            enqueue(&mut state, frame)?;
                        }
                    }
                }
            }
        },
    )
}
