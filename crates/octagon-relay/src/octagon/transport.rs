use serde_json::Value;

use crate::errors::ProviderError;

const DONE_SENTINEL: &str = "[DONE]";

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder; chunk boundaries may fall anywhere.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    // Bytes of `buf` already searched for a frame delimiter.
    scanned: usize,
}

impl SseDecoder {
    /// Buffers `chunk` and returns every frame it completes.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((end, delim_len)) = frame_boundary(&self.buf, self.scanned) {
            let raw: Vec<u8> = self.buf.drain(..end + delim_len).take(end).collect();
            self.scanned = 0;
            frames.extend(parse_frame(&raw));
        }
        // A four-byte delimiter may start in the last three bytes.
        self.scanned = self.buf.len().saturating_sub(3);
        frames
    }

    /// Flushes a final frame the server did not terminate with a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        self.scanned = 0;
        let raw = std::mem::take(&mut self.buf);
        parse_frame(&raw)
    }
}

fn frame_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

fn parse_frame(bytes: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(bytes);
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

/// Turns a frame into a raw completion record.
///
/// Returns `Ok(None)` for keep-alives and the `[DONE]` sentinel. Error frames
/// sent by the backend become `ProviderError::Provider`.
pub(crate) fn decode_frame(frame: &SseFrame) -> Result<Option<Value>, ProviderError> {
    let data = frame.data.trim();
    if data.is_empty() || data == DONE_SENTINEL {
        return Ok(None);
    }
    let record: Value = serde_json::from_str(data)
        .map_err(|e| ProviderError::protocol(format!("invalid SSE JSON frame: {e}")))?;
    if let Some(message) = stream_error_message(&record) {
        return Err(ProviderError::provider(message, None));
    }
    Ok(Some(record))
}

fn stream_error_message(record: &Value) -> Option<String> {
    let typed_error = matches!(
        record.get("type").and_then(Value::as_str),
        Some("error" | "response.error" | "response.failed")
    );
    let error = record
        .get("error")
        .or_else(|| record.get("response").and_then(|r| r.get("error")))
        .filter(|e| !e.is_null());
    if error.is_none() && !typed_error {
        return None;
    }
    let message = error
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .or_else(|| record.get("message").and_then(Value::as_str))
        .unwrap_or("backend reported a stream error");
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"hel");
        assert!(frames.is_empty());
        let frames = decoder.push_chunk(b"lo\"}}]}\n\ndata: [DO");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].data.contains("hello"));
        let frames = decoder.push_chunk(b"NE]\n\n");
        assert_eq!(frames[0].data, "[DONE]");
    }

    #[test]
    fn decoder_handles_crlf_comments_and_multiline_data() {
        let mut decoder = SseDecoder::default();
        let frames =
            decoder.push_chunk(b": keep-alive\r\n\r\nevent: message\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("message"));
        assert_eq!(frames[0].data, "{\"a\":\n1}");
    }

    #[test]
    fn delimiters_split_across_tiny_chunks_are_found() {
        let mut decoder = SseDecoder::default();
        let payload = format!("data: {{\"text\":\"{}\"}}\r\n\r\ndata: 2\n\n", "x".repeat(4096));
        let mut frames = Vec::new();
        for byte in payload.as_bytes() {
            frames.extend(decoder.push_chunk(std::slice::from_ref(byte)));
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data.len(), "{\"text\":\"\"}".len() + 4096);
        assert_eq!(frames[1].data, "2");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn scan_offset_resumes_inside_a_partial_delimiter() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: a\r\n\r").is_empty());
        let frames = decoder.push_chunk(b"\ndata: b\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "a");
        let frames = decoder.push_chunk(b"\n");
        assert_eq!(frames[0].data, "b");
    }

    #[test]
    fn finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: {\"x\":1}").is_empty());
        let frame = decoder.finish().expect("trailing frame");
        assert_eq!(frame.data, "{\"x\":1}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn done_and_empty_frames_decode_to_nothing() {
        let done = SseFrame {
            event: None,
            data: "[DONE]".into(),
        };
        let empty = SseFrame {
            event: Some("ping".into()),
            data: String::new(),
        };
        assert_eq!(decode_frame(&done), Ok(None));
        assert_eq!(decode_frame(&empty), Ok(None));
    }

    #[test]
    fn json_frames_decode_to_records() {
        let frame = SseFrame {
            event: None,
            data: json!({"choices": [{"delta": {"content": "hi"}}]}).to_string(),
        };
        let record = decode_frame(&frame).expect("decode").expect("record");
        assert_eq!(record["choices"][0]["delta"]["content"], "hi");
    }

    #[test]
    fn invalid_json_is_a_protocol_error() {
        let frame = SseFrame {
            event: None,
            data: "{not json".into(),
        };
        assert!(matches!(
            decode_frame(&frame),
            Err(ProviderError::Protocol { .. })
        ));
    }

    #[test]
    fn error_frames_become_provider_errors() {
        for (data, expected) in [
            (json!({"error": {"message": "rate limited"}}), "rate limited"),
            (
                json!({"type": "response.failed", "response": {"error": {"message": "quota exceeded"}}}),
                "quota exceeded",
            ),
            (json!({"type": "error", "message": "overloaded"}), "overloaded"),
            (json!({"error": "bad key"}), "bad key"),
        ] {
            let frame = SseFrame {
                event: None,
                data: data.to_string(),
            };
            assert_eq!(
                decode_frame(&frame),
                Err(ProviderError::provider(expected, None)),
                "frame: {data}"
            );
        }
    }

    #[test]
    fn null_error_field_is_not_an_error() {
        let frame = SseFrame {
            event: None,
            data: json!({"error": null, "choices": [{"delta": {"content": "ok"}}]}).to_string(),
        };
        assert!(decode_frame(&frame).expect("decode").is_some());
    }
}
