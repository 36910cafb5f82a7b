//! Folds an ordered completion stream into one final text.

use futures::{Stream, StreamExt as _};
use tracing::{debug, warn};

use crate::citation::{Citation, append_sources};
use crate::errors::{AggregationFailure, ProviderError};
use crate::event::IncrementalEvent;

/// Options for one aggregation pass.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AggregateOptions {
    /// Append the last citation batch as a `SOURCES:` block.
    pub append_citations: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            append_citations: true,
        }
    }
}

impl AggregateOptions {
    /// Sets whether the citation block is appended.
    pub fn append_citations(mut self, enabled: bool) -> Self {
        self.append_citations = enabled;
        self
    }
}

/// Successful aggregation output.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Aggregation {
    pub text: String,
}

/// Lifecycle of an [`Aggregator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregatorState {
    Accumulating,
    Done,
    Failed,
}

/// Single-pass accumulation buffer.
///
/// Owned exclusively by one call; no locking.
#[derive(Debug)]
pub struct Aggregator {
    options: AggregateOptions,
    state: AggregatorState,
    text: String,
    deltas: usize,
    citations: Option<Vec<Citation>>,
}

impl Aggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self {
            options,
            state: AggregatorState::Accumulating,
            text: String::new(),
            deltas: 0,
            citations: None,
        }
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Number of text deltas applied so far.
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// Applies one event in arrival order.
    pub fn apply(&mut self, event: IncrementalEvent) -> Result<(), AggregationFailure> {
        self.ensure_accumulating("apply")?;
        match event {
            IncrementalEvent::Delta { text } => {
                self.text.push_str(&text);
                self.deltas += 1;
            }
            IncrementalEvent::Citations(batch) => {
                if let Some(previous) = &self.citations {
                    debug!(
                        replaced = previous.len(),
                        incoming = batch.len(),
                        "citation batch superseded"
                    );
                }
                self.citations = Some(batch);
            }
            IncrementalEvent::Unknown => {}
        }
        Ok(())
    }

    /// Classifies a raw record and applies every event it carries.
    pub fn apply_record(&mut self, record: &serde_json::Value) -> Result<(), AggregationFailure> {
        for event in IncrementalEvent::classify(record) {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Moves to `Done` and renders the final text.
    pub fn finish(&mut self) -> Result<Aggregation, AggregationFailure> {
        self.ensure_accumulating("finish")?;
        self.state = AggregatorState::Done;
        let mut text = std::mem::take(&mut self.text);
        if self.options.append_citations
            && let Some(citations) = self.citations.take()
        {
            append_sources(&mut text, &citations);
        }
        Ok(Aggregation { text })
    }

    /// Moves to `Failed`, dropping the partial text.
    pub fn fail(&mut self, source: ProviderError) -> AggregationFailure {
        if let Err(violation) = self.ensure_accumulating("fail") {
            return violation;
        }
        self.state = AggregatorState::Failed;
        self.text.clear();
        self.citations = None;
        AggregationFailure::Stream {
            deltas_discarded: self.deltas,
            source,
        }
    }

    fn ensure_accumulating(&self, op: &str) -> Result<(), AggregationFailure> {
        match self.state {
            AggregatorState::Accumulating => Ok(()),
            terminal => Err(AggregationFailure::Protocol {
                message: format!("cannot {op} after aggregation reached {terminal:?}"),
            }),
        }
    }
}

/// Consumes `records` to exhaustion and returns the aggregated text.
///
/// The first `Err` item ends the pass with [`AggregationFailure::Stream`];
/// no partial text is returned.
pub async fn aggregate<S>(
    records: S,
    options: AggregateOptions,
) -> Result<Aggregation, AggregationFailure>
where
    S: Stream<Item = Result<serde_json::Value, ProviderError>>,
{
    let mut records = std::pin::pin!(records);
    let mut aggregator = Aggregator::new(options);
    while let Some(next) = records.next().await {
        match next {
            Ok(record) => aggregator.apply_record(&record)?,
            Err(err) => {
                warn!(deltas = aggregator.deltas(), error = %err, "completion stream failed mid-aggregation");
                return Err(aggregator.fail(err));
            }
        }
    }
    let deltas = aggregator.deltas();
    let aggregation = aggregator.finish()?;
    debug!(deltas, chars = aggregation.text.len(), "aggregation complete");
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    fn chat(text: &str) -> Result<serde_json::Value, ProviderError> {
        Ok(json!({"choices": [{"delta": {"content": text}, "finish_reason": null}]}))
    }

    fn flat(text: &str) -> Result<serde_json::Value, ProviderError> {
        Ok(json!({"type": "response.output_text.delta", "text": {"delta": text}}))
    }

    fn stop_with(citations: serde_json::Value) -> Result<serde_json::Value, ProviderError> {
        Ok(json!({"choices": [{"delta": {}, "finish_reason": "stop", "citations": citations}]}))
    }

    async fn run(
        records: Vec<Result<serde_json::Value, ProviderError>>,
    ) -> Result<Aggregation, AggregationFailure> {
        aggregate(stream::iter(records), AggregateOptions::default()).await
    }

    #[tokio::test]
    async fn deltas_are_concatenated_in_arrival_order() {
        let out = run(vec![chat("The "), flat("quick "), chat("brown "), flat("fox")])
            .await
            .expect("aggregate");
        assert_eq!(out.text, "The quick brown fox");
    }

    #[tokio::test]
    async fn mixed_shapes_yield_foobar() {
        let out = run(vec![
            Ok(json!({"choices": [{"delta": {"content": "foo"}}]})),
            Ok(json!({"type": "response.output_text.delta", "text": {"delta": "bar"}})),
        ])
        .await
        .expect("aggregate");
        assert_eq!(out.text, "foobar");
    }

    #[tokio::test]
    async fn citations_are_formatted_byte_for_byte() {
        let out = run(vec![
            chat("Hello"),
            stop_with(json!([
                {"order": 1, "name": "A", "url": "u1"},
                {"order": 2, "name": "B", "url": "u2"}
            ])),
        ])
        .await
        .expect("aggregate");
        assert_eq!(out.text, "Hello\n\nSOURCES:\n1. A: u1\n2. B: u2\n");
    }

    #[tokio::test]
    async fn last_citation_batch_wins() {
        let out = run(vec![
            chat("x"),
            stop_with(json!([{"order": 1, "name": "Old", "url": "old"}])),
            Ok(json!({
                "type": "response.completed",
                "response": {"citations": [{"order": 9, "name": "New", "url": "new"}]}
            })),
        ])
        .await
        .expect("aggregate");
        assert_eq!(out.text, "x\n\nSOURCES:\n9. New: new\n");
    }

    #[tokio::test]
    async fn later_empty_batch_clears_earlier_citations() {
        let out = run(vec![
            chat("x"),
            stop_with(json!([{"order": 1, "name": "Old", "url": "old"}])),
            stop_with(json!([])),
        ])
        .await
        .expect("aggregate");
        assert_eq!(out.text, "x");
    }

    #[tokio::test]
    async fn citations_are_not_resorted_by_order() {
        let out = run(vec![
            chat("y"),
            stop_with(json!([
                {"order": 3, "name": "C", "url": "u3"},
                {"order": 1, "name": "A", "url": "u1"}
            ])),
        ])
        .await
        .expect("aggregate");
        assert_eq!(out.text, "y\n\nSOURCES:\n3. C: u3\n1. A: u1\n");
    }

    #[tokio::test]
    async fn unknown_records_do_not_change_the_result() {
        let clean = run(vec![
            chat("a"),
            flat("b"),
            stop_with(json!([{"order": 1, "name": "A", "url": "u1"}])),
        ])
        .await
        .expect("clean");
        let noisy = run(vec![
            Ok(json!({"type": "response.created", "response": {"id": "r1"}})),
            chat("a"),
            Ok(json!({"choices": [{"delta": {"role": "assistant"}}]})),
            Ok(json!({"usage": {"total_tokens": 12}})),
            flat("b"),
            Ok(json!(null)),
            stop_with(json!([{"order": 1, "name": "A", "url": "u1"}])),
            Ok(json!({"type": "response.in_progress"})),
        ])
        .await
        .expect("noisy");
        assert_eq!(clean, noisy);
    }

    #[tokio::test]
    async fn empty_stream_is_an_empty_success() {
        let out = run(vec![]).await.expect("aggregate");
        assert_eq!(out, Aggregation { text: String::new() });
    }

    #[tokio::test]
    async fn citations_alone_still_render_sources_block() {
        let out = run(vec![stop_with(json!([{"order": 1, "name": "A", "url": "u1"}]))])
            .await
            .expect("aggregate");
        assert_eq!(out.text, "\n\nSOURCES:\n1. A: u1\n");
    }

    #[tokio::test]
    async fn citations_can_be_disabled() {
        let out = aggregate(
            stream::iter(vec![
                chat("Hello"),
                stop_with(json!([{"order": 1, "name": "A", "url": "u1"}])),
            ]),
            AggregateOptions::default().append_citations(false),
        )
        .await
        .expect("aggregate");
        assert_eq!(out.text, "Hello");
    }

    #[tokio::test]
    async fn transport_error_after_partial_deltas_is_a_failure() {
        let result = run(vec![
            chat("partial "),
            flat("answer"),
            Err(ProviderError::transport("connection reset by peer")),
            chat("never applied"),
        ])
        .await;
        match result {
            Err(AggregationFailure::Stream {
                deltas_discarded,
                source,
            }) => {
                assert_eq!(deltas_discarded, 2);
                assert_eq!(source, ProviderError::transport("connection reset by peer"));
            }
            other => panic!("expected stream failure, got {other:?}"),
        }
    }

    #[test]
    fn terminal_states_are_final() {
        let mut done = Aggregator::new(AggregateOptions::default());
        done.apply(IncrementalEvent::delta("a")).expect("apply");
        assert_eq!(done.finish().expect("finish").text, "a");
        assert_eq!(done.state(), AggregatorState::Done);
        assert!(matches!(
            done.apply(IncrementalEvent::delta("b")),
            Err(AggregationFailure::Protocol { .. })
        ));
        assert!(matches!(done.finish(), Err(AggregationFailure::Protocol { .. })));

        let mut failed = Aggregator::new(AggregateOptions::default());
        failed.apply(IncrementalEvent::delta("a")).expect("apply");
        let failure = failed.fail(ProviderError::transport("eof"));
        assert!(matches!(failure, AggregationFailure::Stream { deltas_discarded: 1, .. }));
        assert_eq!(failed.state(), AggregatorState::Failed);
        assert!(matches!(
            failed.fail(ProviderError::transport("again")),
            AggregationFailure::Protocol { .. }
        ));
        assert!(matches!(failed.finish(), Err(AggregationFailure::Protocol { .. })));
    }
}
