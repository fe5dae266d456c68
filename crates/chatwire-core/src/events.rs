//! Normalized stream events emitted while decoding a provider SSE stream

use serde::{Deserialize, Serialize};

/// Stream event during response generation.
///
/// Exactly one terminal event (`Complete` or `Error`) is produced per
/// logical stream; the reader stops forwarding once it has seen one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental assistant text
    TextDelta { text: String },

    /// Incremental extended-reasoning text
    ThinkingDelta { text: String },

    /// A tool/function invocation being streamed or completed
    ToolCall {
        id: String,
        name: String,
        arguments: ToolCallArguments,
    },

    /// Partial token accounting seen mid-stream
    UsageUpdate { input_tokens: u32 },

    /// Stream finished successfully
    Complete { usage: StreamUsage },

    /// Stream ended abnormally
    Error { message: String },
}

impl StreamEvent {
    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

/// Tool-call argument payload: a partial JSON fragment while the call is
/// still streaming, or the fully assembled argument string once it closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallArguments {
    Delta(String),
    Complete(String),
}

/// Token usage information for a finished stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUsage {
    /// Number of tokens in the prompt
    pub input_tokens: u32,

    /// Number of tokens in the completion
    pub output_tokens: u32,
}
