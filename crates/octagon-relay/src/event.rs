//! Structural matcher for the records a completion stream emits.
//!
//! Two backend conventions coexist: chat-completion chunks (text under
//! `choices[0].delta.content`) and response-style events tagged by `type`.
//! Every record is folded into zero or more [`IncrementalEvent`]s; anything
//! unrecognized becomes [`IncrementalEvent::Unknown`].

use serde_json::Value;

use crate::citation::{Citation, parse_citations};

const RESPONSE_TEXT_DELTA: &str = "response.output_text.delta";
const RESPONSE_COMPLETED: &str = "response.completed";
const FINISH_STOP: &str = "stop";

/// One unit of a streamed response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncrementalEvent {
    /// Text fragment to append.
    Delta { text: String },
    /// Terminal citation batch; replaces any earlier batch.
    Citations(Vec<Citation>),
    /// Record with no recognized shape.
    Unknown,
}

impl IncrementalEvent {
    /// Creates a text delta event.
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta { text: text.into() }
    }

    /// Classifies one raw stream record.
    ///
    /// A chat chunk may carry both a delta and a citation batch; the delta is
    /// returned first so it is applied before the batch.
    pub fn classify(record: &Value) -> Vec<IncrementalEvent> {
        if let Some(choice) = record
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        {
            return classify_chat_choice(choice);
        }

        match record.get("type").and_then(Value::as_str) {
            Some(RESPONSE_TEXT_DELTA) => match response_delta_text(record) {
                Some(text) if !text.is_empty() => vec![Self::delta(text)],
                _ => vec![Self::Unknown],
            },
            Some(RESPONSE_COMPLETED) => {
                let response = record.get("response").unwrap_or(record);
                match citation_array(response).or_else(|| citation_array(record)) {
                    Some(values) => vec![Self::Citations(parse_citations(values))],
                    None => vec![Self::Unknown],
                }
            }
            _ => vec![Self::Unknown],
        }
    }
}

fn classify_chat_choice(choice: &Value) -> Vec<IncrementalEvent> {
    let mut events = Vec::with_capacity(2);
    if let Some(text) = choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
    {
        events.push(IncrementalEvent::delta(text));
    }
    let finished = choice.get("finish_reason").and_then(Value::as_str) == Some(FINISH_STOP);
    if finished && let Some(values) = citation_array(choice) {
        events.push(IncrementalEvent::Citations(parse_citations(values)));
    }
    if events.is_empty() {
        events.push(IncrementalEvent::Unknown);
    }
    events
}

// `text.delta` is what the Octagon backend sends; a bare string `delta` is the
// public Responses API form.
fn response_delta_text(record: &Value) -> Option<&str> {
    record
        .get("text")
        .and_then(|text| text.get("delta"))
        .and_then(Value::as_str)
        .or_else(|| record.get("delta").and_then(Value::as_str))
}

fn citation_array(value: &Value) -> Option<&[Value]> {
    value
        .get("citations")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}
