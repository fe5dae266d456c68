//! Response-shape extraction fallback chain
//!
//! Pure functions that walk an arbitrary parsed JSON value looking for text
//! content in known provider response shapes: OpenAI Chat Completions and
//! Responses, Anthropic content blocks (including thinking blocks), Gemini
//! candidates/parts, and one-level `data`-wrapped gateway envelopes.

use serde_json::Value;

/// Gateway envelopes can nest; fail closed past this depth.
const MAX_ENVELOPE_DEPTH: usize = 5;

/// Outcome of an extraction attempt.
///
/// `MatchedEmpty` and `Unmatched` are deliberately distinct: the title
/// fetcher reports `empty_content` when a recognized shape held no text and
/// `parse_failed` when no shape matched at all, so collapsing the two into
/// a single "no title" would break that contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A non-empty, trimmed string was found
    Found(String),

    /// A recognized shape was entered but yielded no text
    MatchedEmpty,

    /// No recognized shape matched
    Unmatched,
}

impl Extraction {
    /// Whether a recognized shape was entered, even if it held no text
    pub fn is_matched(&self) -> bool {
        !matches!(self, Extraction::Unmatched)
    }

    /// The extracted title, if any
    pub fn into_title(self) -> Option<String> {
        match self {
            Extraction::Found(title) => Some(title),
            _ => None,
        }
    }
}

/// Attempt each known provider response shape in priority order and return
/// the first non-empty string found; `None` if nothing matched.
pub fn extract_title_from_common_response(value: &Value) -> Option<String> {
    extract_title(value).into_title()
}

/// Shape-tracking variant of [`extract_title_from_common_response`]
pub fn extract_title(value: &Value) -> Extraction {
    extract_at(value, 0)
}

fn extract_at(value: &Value, depth: usize) -> Extraction {
    if depth > MAX_ENVELOPE_DEPTH {
        tracing::debug!("envelope nesting exceeded depth {MAX_ENVELOPE_DEPTH}, failing closed");
        return Extraction::Unmatched;
    }

    let mut matched = false;

    // 1. The value itself is a string.
    if let Value::String(s) = value {
        return match non_empty(s) {
            Some(title) => Extraction::Found(title),
            None => Extraction::MatchedEmpty,
        };
    }

    // 2. OpenAI Responses API: top-level output_text.
    if let Some(s) = value.get("output_text").and_then(Value::as_str) {
        matched = true;
        if let Some(title) = non_empty(s) {
            return Extraction::Found(title);
        }
    }

    // 3. OpenAI Chat Completions: choices[0].message.content, then the
    //    legacy completions text field, then a streaming-style delta.
    if let Some(choice) = value.get("choices").and_then(|c| c.get(0)) {
        matched = true;
        if let Some(content) = choice.pointer("/message/content")
            && let Extraction::Found(title) = extract_text_from_content_like(content)
        {
            return Extraction::Found(title);
        }
        if let Some(s) = choice.get("text").and_then(Value::as_str)
            && let Some(title) = non_empty(s)
        {
            return Extraction::Found(title);
        }
        if let Some(s) = choice.pointer("/delta/content").and_then(Value::as_str)
            && let Some(title) = non_empty(s)
        {
            return Extraction::Found(title);
        }
    }

    // 4. Anthropic Messages: content blocks.
    if let Some(content) = value.get("content") {
        match extract_text_from_content_like(content) {
            Extraction::Found(title) => return Extraction::Found(title),
            Extraction::MatchedEmpty => matched = true,
            Extraction::Unmatched => {}
        }
    }

    // 5. Gemini: candidates[0].content.parts, then candidates[0].text.
    if let Some(candidate) = value.get("candidates").and_then(|c| c.get(0)) {
        matched = true;
        if let Some(parts) = candidate.pointer("/content/parts")
            && let Extraction::Found(title) = extract_text_from_content_like(parts)
        {
            return Extraction::Found(title);
        }
        if let Some(s) = candidate.get("text").and_then(Value::as_str)
            && let Some(title) = non_empty(s)
        {
            return Extraction::Found(title);
        }
    }

    // 6. Gateway-wrapped envelope: the wrapper is transparent, so the inner
    //    result (including Unmatched) propagates as-is.
    if let Some(inner) = value.get("data") {
        match extract_at(inner, depth + 1) {
            Extraction::Found(title) => return Extraction::Found(title),
            Extraction::MatchedEmpty => matched = true,
            Extraction::Unmatched => {}
        }
    }

    if matched {
        Extraction::MatchedEmpty
    } else {
        Extraction::Unmatched
    }
}

/// Extract text from a content-like value: a plain string, or a sequence of
/// typed content blocks per Anthropic/Gemini message schemas.
pub fn extract_text_from_content_like(value: &Value) -> Extraction {
    match value {
        Value::String(s) => match non_empty(s) {
            Some(title) => Extraction::Found(title),
            None => Extraction::MatchedEmpty,
        },
        Value::Array(items) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    if let Some(title) = non_empty(s) {
                        return Extraction::Found(title);
                    }
                    continue;
                }
                if let Some(s) = item.get("text").and_then(Value::as_str)
                    && let Some(title) = non_empty(s)
                {
                    return Extraction::Found(title);
                }
                if let Some(s) = item.get("output_text").and_then(Value::as_str)
                    && let Some(title) = non_empty(s)
                {
                    return Extraction::Found(title);
                }
                if let Some(s) = item.get("thinking").and_then(Value::as_str)
                    && let Some(title) = thinking_tail(s)
                {
                    return Extraction::Found(title);
                }
                if let Some(nested) = item.get("content")
                    && let Extraction::Found(title) = extract_text_from_content_like(nested)
                {
                    return Extraction::Found(title);
                }
                if let Some(nested) = item.get("parts")
                    && let Extraction::Found(title) = extract_text_from_content_like(nested)
                {
                    return Extraction::Found(title);
                }
            }
            Extraction::MatchedEmpty
        }
        _ => Extraction::Unmatched,
    }
}

/// Reasoning traces end with a concise restated answer on the final line;
/// earlier lines are scratch work. Take the last non-empty line and strip a
/// leading bullet marker.
fn thinking_tail(block: &str) -> Option<String> {
    let line = block.lines().rev().find(|l| !l.trim().is_empty())?;
    let line = line.trim();
    let line = line.strip_prefix("- ").unwrap_or(line);
    non_empty(line)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
