//! SSE stream decoding
//!
//! Drives a byte stream (injected, not owned) through an adapter's line
//! parser, forwarding normalized events strictly in arrival order. Exactly
//! one terminal event comes out of every logical stream: adapter and
//! transport failures become a terminal `Error`, and a stream that closes
//! without any terminal gets a synthetic one.

use crate::{EgressError, Result};
use bytes::Bytes;
use chatwire_core::{
    adapter::{ProviderAdapter, SseParserState},
    events::StreamEvent,
    request::ProviderRequest,
};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

/// Decode a provider SSE byte stream into normalized events.
///
/// The byte stream is whatever the HTTP layer hands back
/// (`response.bytes_stream()` in production, canned chunks in tests);
/// ownership of transport and cancellation stays with the caller.
pub fn decode_sse_stream<'a, S, B, E>(
    byte_stream: S,
    adapter: &'a dyn ProviderAdapter,
) -> impl Stream<Item = StreamEvent> + 'a
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin + 'a,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = DecodeState {
        frames: byte_stream.eventsource(),
        adapter,
        parser: SseParserState::default(),
        pending: VecDeque::new(),
        terminal_seen: false,
        closed: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                if event.is_terminal() {
                    // Nothing is forwarded past the terminal, even if the
                    // underlying stream keeps producing frames.
                    st.terminal_seen = true;
                    st.closed = true;
                    st.pending.clear();
                }
                return Some((event, st));
            }

            if st.closed {
                return None;
            }

            match st.frames.next().await {
                Some(Ok(frame)) => {
                    match st.adapter.parse_sse_line(&frame.data, &mut st.parser) {
                        Ok(events) => st.pending.extend(events),
                        Err(e) => {
                            warn!(error = %e, "failed to parse SSE frame");
                            st.pending.push_back(StreamEvent::Error {
                                message: e.to_string(),
                            });
                        }
                    }
                }
                Some(Err(e)) => {
                    st.pending.push_back(StreamEvent::Error {
                        message: format!("SSE stream error: {}", e),
                    });
                }
                None => {
                    st.closed = true;
                    if !st.terminal_seen {
                        debug!("stream closed without a terminal event");
                        st.pending.push_back(StreamEvent::Error {
                            message: "stream closed before a terminal event".to_string(),
                        });
                    }
                }
            }
        }
    })
}

struct DecodeState<'a, S> {
    frames: S,
    adapter: &'a dyn ProviderAdapter,
    parser: SseParserState,
    pending: VecDeque<StreamEvent>,
    terminal_seen: bool,
    closed: bool,
}

/// Send a built streaming request and hand back the response byte stream
/// for [`decode_sse_stream`].
#[instrument(skip_all, fields(url = %request.url))]
pub async fn open_sse_stream(
    client: &Client,
    request: &ProviderRequest,
) -> Result<impl Stream<Item = reqwest::Result<Bytes>> + Unpin> {
    let mut builder = client.post(&request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }

    let response = builder.body(request.body.clone()).send().await?;

    if !response.status().is_success() {
        let status_code = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        return Err(EgressError::ProviderError {
            status_code,
            message,
        });
    }

    Ok(response.bytes_stream())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anthropic::AnthropicAdapter;
    use crate::openai::OpenAiAdapter;
    use chatwire_core::events::StreamUsage;
    use std::convert::Infallible;

    fn sse_body(frames: &[&str]) -> String {
        frames
            .iter()
            .map(|f| format!("data: {}\n\n", f))
            .collect::<String>()
    }

    fn byte_stream(
        chunks: Vec<std::result::Result<Bytes, String>>,
    ) -> impl Stream<Item = std::result::Result<Bytes, String>> + Unpin {
        futures::stream::iter(chunks)
    }

    async fn collect<S, B, E>(stream: S, adapter: &dyn ProviderAdapter) -> Vec<StreamEvent>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        decode_sse_stream(stream, adapter).collect().await
    }

    #[tokio::test]
    async fn decodes_anthropic_stream_in_order() {
        let body = sse_body(&[
            r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":10}}}"#,
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"Hello"}}"#,
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":" world"}}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}"#,
            r#"{"type":"message_stop"}"#,
        ]);

        let stream =
            futures::stream::iter(vec![Ok::<_, Infallible>(Bytes::from(body))]);
        let events = collect(stream, &AnthropicAdapter).await;

        assert_eq!(
            events,
            vec![
                StreamEvent::UsageUpdate { input_tokens: 10 },
                StreamEvent::TextDelta {
                    text: "Hello".into()
                },
                StreamEvent::TextDelta {
                    text: " world".into()
                },
                StreamEvent::Complete {
                    usage: StreamUsage {
                        input_tokens: 10,
                        output_tokens: 5
                    }
                },
            ]
        );
    }

    #[tokio::test]
    async fn frames_split_across_chunks_reassemble() {
        // One SSE frame delivered byte-by-byte over several transport chunks.
        let body = sse_body(&[
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"Hi"}}"#,
            r#"{"type":"message_stop"}"#,
        ]);
        let chunks: Vec<std::result::Result<Bytes, Infallible>> = body
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let events = collect(futures::stream::iter(chunks), &AnthropicAdapter).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { text: "Hi".into() },
                StreamEvent::Complete {
                    usage: StreamUsage::default()
                },
            ]
        );
    }

    #[tokio::test]
    async fn done_sentinel_is_terminal_not_dropped() {
        let openai = OpenAiAdapter::openai();
        let body = sse_body(&[
            r#"{"choices":[{"delta":{"content":"Hi"}}]}"#,
            "[DONE]",
        ]);
        let stream =
            futures::stream::iter(vec![Ok::<_, Infallible>(Bytes::from(body))]);
        let events = collect(stream, &openai).await;

        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn unexpected_closure_synthesizes_error() {
        let body = sse_body(&[
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"partial"}}"#,
        ]);
        let stream =
            futures::stream::iter(vec![Ok::<_, Infallible>(Bytes::from(body))]);
        let events = collect(stream, &AnthropicAdapter).await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::TextDelta {
                text: "partial".into()
            }
        );
        match &events[1] {
            StreamEvent::Error { message } => {
                assert!(message.contains("terminal"), "message: {message}");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_terminates_and_swallows_the_rest() {
        let body = sse_body(&[
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"ok"}}"#,
            r#"{"not json"#,
            // Valid frames after the failure must not be forwarded.
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"never"}}"#,
            r#"{"type":"message_stop"}"#,
        ]);
        let stream =
            futures::stream::iter(vec![Ok::<_, Infallible>(Bytes::from(body))]);
        let events = collect(stream, &AnthropicAdapter).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::TextDelta { text: "ok".into() });
        assert!(matches!(events[1], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn transport_error_becomes_terminal_error_event() {
        let first = sse_body(&[
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"ok"}}"#,
        ]);
        let stream = byte_stream(vec![
            Ok(Bytes::from(first)),
            Err("connection reset".to_string()),
        ]);
        let events = collect(stream, &AnthropicAdapter).await;

        assert_eq!(events.len(), 2);
        match &events[1] {
            StreamEvent::Error { message } => {
                assert!(message.contains("connection reset"), "message: {message}");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_stream_emits_exactly_one_error() {
        let stream = futures::stream::iter(Vec::<std::result::Result<Bytes, Infallible>>::new());
        let events = collect(stream, &AnthropicAdapter).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
    }
}
