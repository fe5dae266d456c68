//! Provider adapter trait definitions

use crate::{
    Result,
    events::{StreamEvent, StreamUsage},
    extract::Extraction,
    request::{ProviderRequest, StreamRequestInput, TitleRequestInput},
};

/// Shared capability contract implemented once per provider family.
///
/// Adapters are stateless values: everything request-specific arrives in the
/// input, and everything stream-specific lives in the [`SseParserState`]
/// owned by the reader. One adapter instance can therefore serve any number
/// of concurrent streams.
pub trait ProviderAdapter: Send + Sync {
    /// Build a streaming chat request in the provider's wire schema
    fn build_stream_request(&self, input: &StreamRequestInput) -> Result<ProviderRequest>;

    /// Parse one decoded SSE `data:` payload into zero or more normalized
    /// events. Unknown or ignorable frames yield an empty vec; the
    /// provider's own completion and error frames map to
    /// [`StreamEvent::Complete`] / [`StreamEvent::Error`].
    fn parse_sse_line(&self, data: &str, state: &mut SseParserState)
    -> Result<Vec<StreamEvent>>;

    /// Build a minimal, low-token, non-streaming title request.
    ///
    /// Extended-reasoning fields must be absent from the body even for
    /// providers where the streaming request sets them.
    fn build_title_request(&self, input: &TitleRequestInput) -> Result<ProviderRequest>;

    /// Provider-specific fast path for extracting the title text from a
    /// non-streaming response body. The caller falls back to
    /// [`crate::extract::extract_title`] when this reports `Unmatched`.
    fn parse_title_response(&self, body: &serde_json::Value) -> Extraction;
}

/// Per-stream decode scratch, owned by the SSE reader.
///
/// Token counts arrive on non-terminal frames on every provider, and tool
/// call arguments stream as JSON fragments, so the state accumulates both
/// until the adapter stamps them into the terminal event.
#[derive(Debug, Default)]
pub struct SseParserState {
    /// Prompt tokens reported so far
    pub input_tokens: u32,

    /// Completion tokens reported so far
    pub output_tokens: u32,

    /// The tool call currently being assembled, if any
    pub active_tool: Option<ActiveToolCall>,
}

impl SseParserState {
    /// Usage accumulated so far, for stamping into the terminal event
    pub fn usage(&self) -> StreamUsage {
        StreamUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        }
    }
}

/// A tool call in the middle of streaming its arguments
#[derive(Debug, Clone, Default)]
pub struct ActiveToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}
