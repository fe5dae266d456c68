//! Google Gemini provider adapter
//!
//! The Generative Language API authenticates with a query-parameter key and
//! streams SSE when `alt=sse` is set on `:streamGenerateContent`.

use chatwire_core::{
    Result,
    adapter::{ProviderAdapter, SseParserState},
    events::{StreamEvent, ToolCallArguments},
    extract::{Extraction, extract_text_from_content_like},
    request::{ChatMessage, ProviderRequest, Role, StreamRequestInput, TitleRequestInput},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TITLE_MAX_TOKENS: u32 = 50;

/// Adapter for the Google Gemini Generative Language API
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleAdapter;

impl ProviderAdapter for GoogleAdapter {
    fn build_stream_request(&self, input: &StreamRequestInput) -> Result<ProviderRequest> {
        let mut system_parts: Vec<String> = input.system.iter().cloned().collect();
        let mut contents = Vec::new();

        for message in &input.messages {
            match message.role {
                Role::System => system_parts.push(message.content.clone()),
                Role::User | Role::Assistant => contents.push(to_google_content(message)),
            }
        }

        let tools = if input.tools.is_empty() {
            None
        } else {
            Some(vec![GoogleTool {
                function_declarations: input
                    .tools
                    .iter()
                    .map(|t| GoogleFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        let request = GoogleRequest {
            contents,
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(GoogleSystemInstruction {
                    parts: vec![GooglePart::text(system_parts.join("\n"))],
                })
            },
            tools,
            generation_config: input.thinking.then_some(GenerationConfig {
                max_output_tokens: None,
                thinking_config: Some(ThinkingConfig {
                    include_thoughts: true,
                }),
            }),
        };

        Ok(ProviderRequest {
            url: format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
                input.base_url, input.model, input.api_key
            ),
            headers: headers(),
            body: serde_json::to_string(&request)?,
        })
    }

    fn parse_sse_line(
        &self,
        data: &str,
        state: &mut SseParserState,
    ) -> Result<Vec<StreamEvent>> {
        let chunk: GoogleStreamChunk = serde_json::from_str(data)?;

        if let Some(error) = chunk.error {
            return Ok(vec![StreamEvent::Error {
                message: error.message,
            }]);
        }

        let mut events = Vec::new();
        let candidate = chunk.candidates.first();

        if let Some(candidate) = candidate
            && let Some(content) = &candidate.content
        {
            for part in &content.parts {
                if let Some(call) = &part.function_call {
                    // Gemini sends complete calls with no call id; the
                    // function name doubles as the identifier.
                    events.push(StreamEvent::ToolCall {
                        id: call.name.clone(),
                        name: call.name.clone(),
                        arguments: ToolCallArguments::Complete(call.args.to_string()),
                    });
                } else if let Some(text) = &part.text
                    && !text.is_empty()
                {
                    if part.thought.unwrap_or(false) {
                        events.push(StreamEvent::ThinkingDelta { text: text.clone() });
                    } else {
                        events.push(StreamEvent::TextDelta { text: text.clone() });
                    }
                }
            }
        }

        if let Some(usage) = chunk.usage_metadata {
            state.output_tokens = usage.candidates_token_count.unwrap_or(state.output_tokens);
            if usage.prompt_token_count != state.input_tokens {
                state.input_tokens = usage.prompt_token_count;
                events.push(StreamEvent::UsageUpdate {
                    input_tokens: usage.prompt_token_count,
                });
            }
        }

        if candidate.is_some_and(|c| c.finish_reason.is_some()) {
            events.push(StreamEvent::Complete {
                usage: state.usage(),
            });
        }

        Ok(events)
    }

    fn build_title_request(&self, input: &TitleRequestInput) -> Result<ProviderRequest> {
        // Hard output cap and no thinkingConfig: title calls never reason.
        let request = GoogleRequest {
            contents: vec![GoogleContent {
                role: "user".to_string(),
                parts: vec![GooglePart::text(input.prompt.clone())],
            }],
            system_instruction: None,
            tools: None,
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(TITLE_MAX_TOKENS),
                thinking_config: None,
            }),
        };

        Ok(ProviderRequest {
            url: format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                input.base_url, input.model, input.api_key
            ),
            headers: headers(),
            body: serde_json::to_string(&request)?,
        })
    }

    fn parse_title_response(&self, body: &serde_json::Value) -> Extraction {
        match body.get("candidates").and_then(|c| c.get(0)) {
            Some(candidate) => match candidate.pointer("/content/parts") {
                Some(parts) => match extract_text_from_content_like(parts) {
                    Extraction::Unmatched => Extraction::MatchedEmpty,
                    extraction => extraction,
                },
                None => Extraction::MatchedEmpty,
            },
            None => Extraction::Unmatched,
        }
    }
}

fn headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

fn to_google_content(message: &ChatMessage) -> GoogleContent {
    let role = match message.role {
        Role::Assistant => "model",
        _ => "user",
    }
    .to_string();

    let mut parts = vec![GooglePart::text(message.content.clone())];
    parts.extend(message.attachments.iter().map(|a| GooglePart {
        text: None,
        inline_data: Some(GoogleInlineData {
            mime_type: a.media_type.clone(),
            data: a.data.clone(),
        }),
        thought: None,
        function_call: None,
    }));

    GoogleContent { role, parts }
}

// Gemini API types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GoogleTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GoogleContent {
    role: String,
    parts: Vec<GooglePart>,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSystemInstruction {
    parts: Vec<GooglePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GoogleInlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GoogleFunctionCall>,
}

impl GooglePart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
            thought: None,
            function_call: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GoogleFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTool {
    function_declarations: Vec<GoogleFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleFunctionDeclaration {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,
}

// Gemini SSE stream chunk types

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleStreamChunk {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    usage_metadata: Option<GoogleUsageMetadata>,
    #[serde(default)]
    error: Option<GoogleWireError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleWireError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::events::StreamUsage;
    use chatwire_core::request::{Attachment, ToolDefinition};
    use serde_json::{Value, json};

    fn stream_input() -> StreamRequestInput {
        StreamRequestInput {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: "g-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            messages: vec![ChatMessage::text(Role::User, "Hello")],
            tools: vec![],
            system: None,
            thinking: false,
        }
    }

    fn parse_all(lines: &[&str]) -> Vec<StreamEvent> {
        let mut state = SseParserState::default();
        lines
            .iter()
            .flat_map(|line| GoogleAdapter.parse_sse_line(line, &mut state).unwrap())
            .collect()
    }

    #[test]
    fn stream_url_carries_sse_flag_and_key() {
        let request = GoogleAdapter.build_stream_request(&stream_input()).unwrap();
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse&key=g-key"
        );
        // Auth rides the URL; no auth header.
        assert!(!request.headers.contains_key("Authorization"));

        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["contents"][0]["role"], json!("user"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], json!("Hello"));
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn assistant_role_maps_to_model_and_system_to_instruction() {
        let mut input = stream_input();
        input.system = Some("Be terse".to_string());
        input.messages = vec![
            ChatMessage::text(Role::User, "Hi"),
            ChatMessage::text(Role::Assistant, "Hello!"),
        ];

        let request = GoogleAdapter.build_stream_request(&input).unwrap();
        let body: Value = serde_json::from_str(&request.body).unwrap();

        assert_eq!(body["contents"][1]["role"], json!("model"));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("Be terse")
        );
    }

    #[test]
    fn thinking_toggle_sets_thinking_config() {
        let mut input = stream_input();
        input.thinking = true;

        let request = GoogleAdapter.build_stream_request(&input).unwrap();
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["includeThoughts"],
            json!(true)
        );
    }

    #[test]
    fn tools_become_function_declarations() {
        let mut input = stream_input();
        input.tools = vec![ToolDefinition {
            name: "search".to_string(),
            description: Some("Web search".to_string()),
            parameters: json!({"type": "object"}),
        }];

        let request = GoogleAdapter.build_stream_request(&input).unwrap();
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            json!("search")
        );
    }

    #[test]
    fn attachments_become_inline_data() {
        let mut input = stream_input();
        input.messages = vec![ChatMessage {
            role: Role::User,
            content: "Describe".to_string(),
            attachments: vec![Attachment {
                media_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            }],
        }];

        let request = GoogleAdapter.build_stream_request(&input).unwrap();
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            json!("image/png")
        );
    }

    #[test]
    fn title_request_caps_tokens_and_never_thinks() {
        let request = GoogleAdapter
            .build_title_request(&TitleRequestInput {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                api_key: "g-key".to_string(),
                model: "gemini-2.0-flash".to_string(),
                prompt: "Name this chat".to_string(),
            })
            .unwrap();

        assert!(request.url.ends_with(":generateContent?key=g-key"));
        assert!(!request.url.contains("alt=sse"));

        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(50));
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn decode_text_stream_with_usage_and_finish() {
        let events = parse_all(&[
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"}]}}],"usageMetadata":{"promptTokenCount":4}}"#,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"lo"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":2}}"#,
        ]);

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { text: "Hel".into() },
                StreamEvent::UsageUpdate { input_tokens: 4 },
                StreamEvent::TextDelta { text: "lo".into() },
                StreamEvent::Complete {
                    usage: StreamUsage {
                        input_tokens: 4,
                        output_tokens: 2
                    }
                },
            ]
        );
    }

    #[test]
    fn decode_thought_parts_as_thinking() {
        let events = parse_all(&[
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"pondering","thought":true},{"text":"Answer"}]}}]}"#,
        ]);

        assert_eq!(
            events,
            vec![
                StreamEvent::ThinkingDelta {
                    text: "pondering".into()
                },
                StreamEvent::TextDelta {
                    text: "Answer".into()
                },
            ]
        );
    }

    #[test]
    fn decode_function_call_part() {
        let events = parse_all(&[
            r#"{"candidates":[{"content":{"role":"model","parts":[{"functionCall":{"name":"get_weather","args":{"location":"NYC"}}}]}}]}"#,
        ]);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::ToolCall {
                name, arguments, ..
            } => {
                assert_eq!(name, "get_weather");
                let ToolCallArguments::Complete(args) = arguments else {
                    panic!("expected complete arguments");
                };
                let parsed: Value = serde_json::from_str(args).unwrap();
                assert_eq!(parsed["location"], json!("NYC"));
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn error_body_maps_to_error_event() {
        let mut state = SseParserState::default();
        let events = GoogleAdapter
            .parse_sse_line(
                r#"{"error":{"code":429,"message":"Resource exhausted"}}"#,
                &mut state,
            )
            .unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::Error {
                message: "Resource exhausted".into()
            }]
        );
    }

    #[test]
    fn title_response_fast_path() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "Weather chat"}]}}]});
        assert_eq!(
            GoogleAdapter.parse_title_response(&body),
            Extraction::Found("Weather chat".into())
        );
        assert_eq!(
            GoogleAdapter.parse_title_response(&json!({"candidates": [{}]})),
            Extraction::MatchedEmpty
        );
        assert_eq!(
            GoogleAdapter.parse_title_response(&json!({"foo": 1})),
            Extraction::Unmatched
        );
    }
}
