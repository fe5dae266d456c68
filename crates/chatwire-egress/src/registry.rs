//! Provider registry
//!
//! Maps configured provider names onto their stateless adapters. Adapters
//! carry no per-conversation state, so a single static instance serves
//! every stream and title call concurrently.

use crate::anthropic::AnthropicAdapter;
use crate::error::EgressError;
use crate::google::GoogleAdapter;
use crate::openai::OpenAiAdapter;
use chatwire_core::adapter::ProviderAdapter;
use std::str::FromStr;

static ANTHROPIC: AnthropicAdapter = AnthropicAdapter;
static OPENAI: OpenAiAdapter = OpenAiAdapter::openai();
static OPENAI_COMPATIBLE: OpenAiAdapter = OpenAiAdapter::compatible();
static GOOGLE: GoogleAdapter = GoogleAdapter;

/// Supported provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    /// OpenAI wire format served by a third party (DeepSeek, local
    /// gateways). Differs from [`ProviderKind::OpenAi`] only in which
    /// request extensions are safe to send.
    OpenAiCompatible,
    Google,
}

impl ProviderKind {
    /// The shared adapter for this provider family.
    pub fn adapter(self) -> &'static dyn ProviderAdapter {
        match self {
            ProviderKind::Anthropic => &ANTHROPIC,
            ProviderKind::OpenAi => &OPENAI,
            ProviderKind::OpenAiCompatible => &OPENAI_COMPATIBLE,
            ProviderKind::Google => &GOOGLE,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = EgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "deepseek" | "openai-compatible" | "openai_compatible" => {
                Ok(ProviderKind::OpenAiCompatible)
            }
            "google" | "gemini" => Ok(ProviderKind::Google),
            other => Err(EgressError::ConfigError(format!(
                "unknown provider: {}",
                other
            ))),
        }
    }
}

/// Look up the adapter for a configured provider name.
pub fn adapter_for(name: &str) -> crate::Result<&'static dyn ProviderAdapter> {
    Ok(name.parse::<ProviderKind>()?.adapter())
}
