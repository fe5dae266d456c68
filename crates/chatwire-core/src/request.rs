//! Normalized request inputs and the provider request value

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully built, provider-specific HTTP request.
///
/// Immutable value object: the body is pre-serialized JSON and the headers
/// carry whatever auth convention the provider uses. One input value
/// produces exactly one `ProviderRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Fully resolved endpoint URL (including any query-parameter auth)
    pub url: String,

    /// HTTP headers, auth included
    pub headers: HashMap<String, String>,

    /// Pre-serialized JSON request body
    pub body: String,
}

/// Caller-supplied parameters for a streaming chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequestInput {
    /// Provider base URL (no trailing slash)
    pub base_url: String,

    /// API key or credential
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Ordered list of prior messages
    pub messages: Vec<ChatMessage>,

    /// Available tools/functions
    pub tools: Vec<ToolDefinition>,

    /// Optional system prompt
    pub system: Option<String>,

    /// Whether to enable extended-reasoning ("thinking") mode
    pub thinking: bool,
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: Role,

    /// Text content of the message
    pub content: String,

    /// Optional image attachments
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    /// Create a plain text message with no attachments
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A base64-encoded image attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. "image/png"
    pub media_type: String,

    /// Base64-encoded payload
    pub data: String,
}

/// Tool/function definition in normalized form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the function
    pub name: String,

    /// Description of what the function does
    pub description: Option<String>,

    /// JSON schema for the function parameters
    pub parameters: serde_json::Value,
}

/// Caller-supplied parameters for a one-shot title-generation request.
///
/// Deliberately reduced: no tools, no system prompt and no thinking toggle.
/// Title calls are latency-sensitive and must never incur reasoning cost,
/// so streaming-only fields cannot even be expressed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRequestInput {
    /// Provider base URL (no trailing slash)
    pub base_url: String,

    /// API key or credential
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Prompt asking for a short conversation title
    pub prompt: String,
}
