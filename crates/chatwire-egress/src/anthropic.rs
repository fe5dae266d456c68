//! Anthropic provider adapter

use chatwire_core::{
    Result,
    adapter::{ActiveToolCall, ProviderAdapter, SseParserState},
    events::{StreamEvent, ToolCallArguments},
    extract::{Extraction, extract_text_from_content_like},
    request::{ProviderRequest, Role, StreamRequestInput, TitleRequestInput},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const TITLE_MAX_TOKENS: u32 = 50;
const THINKING_BUDGET_TOKENS: u32 = 1024;

/// Adapter for the Anthropic Messages API
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn build_stream_request(&self, input: &StreamRequestInput) -> Result<ProviderRequest> {
        // System-role messages fold into the system field; the Messages API
        // only accepts user/assistant turns.
        let mut system_parts: Vec<String> = input.system.iter().cloned().collect();
        let mut messages = Vec::new();

        for message in &input.messages {
            match message.role {
                Role::System => system_parts.push(message.content.clone()),
                Role::User | Role::Assistant => {
                    messages.push(to_anthropic_message(message));
                }
            }
        }

        let tools = if input.tools.is_empty() {
            None
        } else {
            Some(
                input
                    .tools
                    .iter()
                    .map(|t| AnthropicTool {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        input_schema: t.parameters.clone(),
                    })
                    .collect(),
            )
        };

        let request = AnthropicRequest {
            model: input.model.clone(),
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n"))
            },
            stream: Some(true),
            tools,
            thinking: input.thinking.then_some(ThinkingConfig {
                config_type: "enabled".to_string(),
                budget_tokens: THINKING_BUDGET_TOKENS,
            }),
        };

        Ok(ProviderRequest {
            url: format!("{}/v1/messages", input.base_url),
            headers: headers(&input.api_key),
            body: serde_json::to_string(&request)?,
        })
    }

    fn parse_sse_line(
        &self,
        data: &str,
        state: &mut SseParserState,
    ) -> Result<Vec<StreamEvent>> {
        let event: AnthropicStreamEvent = serde_json::from_str(data)?;

        let events = match event {
            AnthropicStreamEvent::MessageStart { message } => {
                state.input_tokens = message.usage.input_tokens;
                vec![StreamEvent::UsageUpdate {
                    input_tokens: message.usage.input_tokens,
                }]
            }

            AnthropicStreamEvent::ContentBlockStart { content_block } => {
                if let AnthropicStreamContentBlock::ToolUse { id, name } = content_block {
                    debug!(%id, %name, "tool call started");
                    state.active_tool = Some(ActiveToolCall {
                        id,
                        name,
                        arguments: String::new(),
                    });
                }
                Vec::new()
            }

            AnthropicStreamEvent::ContentBlockDelta { delta } => match delta {
                AnthropicStreamDelta::TextDelta { text } => {
                    vec![StreamEvent::TextDelta { text }]
                }
                AnthropicStreamDelta::ThinkingDelta { thinking } => {
                    vec![StreamEvent::ThinkingDelta { text: thinking }]
                }
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    match state.active_tool.as_mut() {
                        Some(tool) => {
                            tool.arguments.push_str(&partial_json);
                            vec![StreamEvent::ToolCall {
                                id: tool.id.clone(),
                                name: tool.name.clone(),
                                arguments: ToolCallArguments::Delta(partial_json),
                            }]
                        }
                        None => {
                            debug!("input_json_delta without active tool call");
                            Vec::new()
                        }
                    }
                }
                AnthropicStreamDelta::SignatureDelta {} => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockStop => match state.active_tool.take() {
                Some(tool) => vec![StreamEvent::ToolCall {
                    id: tool.id,
                    name: tool.name,
                    arguments: ToolCallArguments::Complete(tool.arguments),
                }],
                None => Vec::new(),
            },

            AnthropicStreamEvent::MessageDelta { usage, .. } => {
                // output_tokens is cumulative over the stream.
                state.output_tokens = usage.output_tokens;
                Vec::new()
            }

            AnthropicStreamEvent::MessageStop => {
                vec![StreamEvent::Complete {
                    usage: state.usage(),
                }]
            }

            AnthropicStreamEvent::Error { error } => {
                vec![StreamEvent::Error {
                    message: error.message,
                }]
            }

            AnthropicStreamEvent::Ping | AnthropicStreamEvent::Unknown => Vec::new(),
        };

        Ok(events)
    }

    fn build_title_request(&self, input: &TitleRequestInput) -> Result<ProviderRequest> {
        // Minimal and low-token: one user message, a hard output cap, and
        // neither `stream` nor `thinking` keys in the body.
        let request = AnthropicRequest {
            model: input.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: AnthropicContent::Text(input.prompt.clone()),
            }],
            max_tokens: TITLE_MAX_TOKENS,
            system: None,
            stream: None,
            tools: None,
            thinking: None,
        };

        Ok(ProviderRequest {
            url: format!("{}/v1/messages", input.base_url),
            headers: headers(&input.api_key),
            body: serde_json::to_string(&request)?,
        })
    }

    fn parse_title_response(&self, body: &serde_json::Value) -> Extraction {
        match body.get("content") {
            Some(content) => extract_text_from_content_like(content),
            None => Extraction::Unmatched,
        }
    }
}

fn headers(api_key: &str) -> HashMap<String, String> {
    HashMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("x-api-key".to_string(), api_key.to_string()),
        ("anthropic-version".to_string(), API_VERSION.to_string()),
    ])
}

fn to_anthropic_message(message: &chatwire_core::request::ChatMessage) -> AnthropicMessage {
    let role = match message.role {
        Role::Assistant => "assistant",
        _ => "user",
    }
    .to_string();

    let content = if message.attachments.is_empty() {
        AnthropicContent::Text(message.content.clone())
    } else {
        let mut blocks: Vec<AnthropicContentBlock> = message
            .attachments
            .iter()
            .map(|a| AnthropicContentBlock::Image {
                source: AnthropicImageSource {
                    source_type: "base64".to_string(),
                    media_type: a.media_type.clone(),
                    data: a.data.clone(),
                },
            })
            .collect();
        blocks.push(AnthropicContentBlock::Text {
            text: message.content.clone(),
        });
        AnthropicContent::Blocks(blocks)
    };

    AnthropicMessage { role, content }
}

// Anthropic API types

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    config_type: String,
    budget_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    Image { source: AnthropicImageSource },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    input_schema: serde_json::Value,
}

// Anthropic SSE stream event types

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    MessageStart {
        message: AnthropicStreamMessage,
    },
    ContentBlockStart {
        content_block: AnthropicStreamContentBlock,
    },
    ContentBlockDelta {
        delta: AnthropicStreamDelta,
    },
    ContentBlockStop,
    MessageDelta {
        delta: AnthropicStreamMessageDelta,
        usage: AnthropicStreamUsage,
    },
    MessageStop,
    Ping,
    Error {
        error: AnthropicStreamError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamMessage {
    #[allow(dead_code)]
    id: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamContentBlock {
    Text {},
    Thinking {},
    ToolUse { id: String, name: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    InputJsonDelta { partial_json: String },
    SignatureDelta {},
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamMessageDelta {
    #[allow(dead_code)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamUsage {
    output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicStreamError {
    message: String,
}
