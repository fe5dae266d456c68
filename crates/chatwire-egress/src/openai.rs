//! OpenAI provider adapter
//!
//! Also serves generic OpenAI-compatible endpoints (DeepSeek-style APIs,
//! local inference servers, gateway proxies) via [`OpenAiAdapter::compatible`],
//! which differs only in leaving out `stream_options` — some proxies reject
//! fields they do not know.

use chatwire_core::{
    Result,
    adapter::{ActiveToolCall, ProviderAdapter, SseParserState},
    events::{StreamEvent, ToolCallArguments},
    extract::{Extraction, extract_text_from_content_like},
    request::{ChatMessage, ProviderRequest, Role, StreamRequestInput, TitleRequestInput},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const TITLE_MAX_TOKENS: u32 = 50;

/// Adapter for the OpenAI Chat Completions API and compatible endpoints
#[derive(Debug, Clone, Copy)]
pub struct OpenAiAdapter {
    include_stream_options: bool,
}

impl OpenAiAdapter {
    /// The canonical OpenAI endpoint (requests mid-stream usage accounting)
    pub const fn openai() -> Self {
        Self {
            include_stream_options: true,
        }
    }

    /// A generic OpenAI-compatible endpoint
    pub const fn compatible() -> Self {
        Self {
            include_stream_options: false,
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn build_stream_request(&self, input: &StreamRequestInput) -> Result<ProviderRequest> {
        let mut messages = Vec::new();
        if let Some(system) = &input.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: OpenAiMessageContent::Text(system.clone()),
            });
        }
        messages.extend(input.messages.iter().map(to_openai_message));

        let tools = if input.tools.is_empty() {
            None
        } else {
            Some(
                input
                    .tools
                    .iter()
                    .map(|t| OpenAiTool {
                        tool_type: "function".to_string(),
                        function: OpenAiFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let request = OpenAiRequest {
            model: input.model.clone(),
            messages,
            stream: Some(true),
            stream_options: self
                .include_stream_options
                .then_some(StreamOptions { include_usage: true }),
            tools,
            max_tokens: None,
        };

        Ok(ProviderRequest {
            url: format!("{}/chat/completions", input.base_url),
            headers: headers(&input.api_key),
            body: serde_json::to_string(&request)?,
        })
    }

    fn parse_sse_line(
        &self,
        data: &str,
        state: &mut SseParserState,
    ) -> Result<Vec<StreamEvent>> {
        // The Chat Completions stream signals completion out of band.
        if data.trim() == "[DONE]" {
            return Ok(vec![StreamEvent::Complete {
                usage: state.usage(),
            }]);
        }

        let chunk: OpenAiStreamChunk = serde_json::from_str(data)?;

        if let Some(error) = chunk.error {
            return Ok(vec![StreamEvent::Error {
                message: error.message,
            }]);
        }

        let mut events = Vec::new();

        if let Some(choice) = chunk.choices.first() {
            if let Some(text) = &choice.delta.reasoning_content
                && !text.is_empty()
            {
                events.push(StreamEvent::ThinkingDelta { text: text.clone() });
            }

            if let Some(text) = &choice.delta.content
                && !text.is_empty()
            {
                events.push(StreamEvent::TextDelta { text: text.clone() });
            }

            if let Some(tool_calls) = &choice.delta.tool_calls {
                for tc in tool_calls {
                    events.extend(apply_tool_call_delta(tc, state));
                }
            }

            // finish_reason closes any in-flight tool call; the stream itself
            // ends on the [DONE] sentinel.
            if choice.finish_reason.is_some()
                && let Some(tool) = state.active_tool.take()
            {
                events.push(StreamEvent::ToolCall {
                    id: tool.id,
                    name: tool.name,
                    arguments: ToolCallArguments::Complete(tool.arguments),
                });
            }
        }

        if let Some(usage) = chunk.usage {
            state.input_tokens = usage.prompt_tokens;
            state.output_tokens = usage.completion_tokens;
            events.push(StreamEvent::UsageUpdate {
                input_tokens: usage.prompt_tokens,
            });
        }

        Ok(events)
    }

    fn build_title_request(&self, input: &TitleRequestInput) -> Result<ProviderRequest> {
        let request = OpenAiRequest {
            model: input.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: OpenAiMessageContent::Text(input.prompt.clone()),
            }],
            stream: None,
            stream_options: None,
            tools: None,
            max_tokens: Some(TITLE_MAX_TOKENS),
        };

        Ok(ProviderRequest {
            url: format!("{}/chat/completions", input.base_url),
            headers: headers(&input.api_key),
            body: serde_json::to_string(&request)?,
        })
    }

    fn parse_title_response(&self, body: &serde_json::Value) -> Extraction {
        match body.get("choices").and_then(|c| c.get(0)) {
            Some(choice) => match choice.pointer("/message/content") {
                Some(content) => match extract_text_from_content_like(content) {
                    // choices[0] itself is a recognized shape, so a content
                    // value of an unexpected kind still counts as matched.
                    Extraction::Unmatched => Extraction::MatchedEmpty,
                    extraction => extraction,
                },
                None => Extraction::MatchedEmpty,
            },
            None => Extraction::Unmatched,
        }
    }
}

/// Fold one wire tool-call delta into the parser state, emitting normalized
/// events. A new call id closes the previous call first.
fn apply_tool_call_delta(
    tc: &OpenAiToolCallDelta,
    state: &mut SseParserState,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(id) = &tc.id
        && state.active_tool.as_ref().is_none_or(|t| &t.id != id)
    {
        if let Some(prev) = state.active_tool.take() {
            events.push(StreamEvent::ToolCall {
                id: prev.id,
                name: prev.name,
                arguments: ToolCallArguments::Complete(prev.arguments),
            });
        }
        state.active_tool = Some(ActiveToolCall {
            id: id.clone(),
            name: String::new(),
            arguments: String::new(),
        });
    }

    let Some(tool) = state.active_tool.as_mut() else {
        debug!("tool call arguments delta without a call id");
        return events;
    };

    if let Some(function) = &tc.function {
        if let Some(name) = &function.name {
            tool.name.push_str(name);
        }
        if let Some(arguments) = &function.arguments {
            tool.arguments.push_str(arguments);
            events.push(StreamEvent::ToolCall {
                id: tool.id.clone(),
                name: tool.name.clone(),
                arguments: ToolCallArguments::Delta(arguments.clone()),
            });
        }
    }

    events
}

fn headers(api_key: &str) -> HashMap<String, String> {
    HashMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), format!("Bearer {}", api_key)),
    ])
}

fn to_openai_message(message: &ChatMessage) -> OpenAiMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
    .to_string();

    let content = if message.attachments.is_empty() {
        OpenAiMessageContent::Text(message.content.clone())
    } else {
        let mut parts = vec![OpenAiContentPart::Text {
            text: message.content.clone(),
        }];
        parts.extend(message.attachments.iter().map(|a| {
            OpenAiContentPart::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: format!("data:{};base64,{}", a.media_type, a.data),
                },
            }
        }));
        OpenAiMessageContent::Parts(parts)
    };

    OpenAiMessage { role, content }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: String,
    content: OpenAiMessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum OpenAiMessageContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

// OpenAI SSE stream chunk types

#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    error: Option<OpenAiWireError>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiToolCallDelta {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiWireError {
    message: String,
}
