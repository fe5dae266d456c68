//! ChatWire Egress Connectors
//!
//! Provider adapters and the transport-facing plumbing around them:
//! - Anthropic, OpenAI, OpenAI-compatible, and Google Gemini adapters
//! - SSE stream decoding into normalized events
//! - One-shot title fetching with diagnosable failure modes

pub mod anthropic;
pub mod client;
pub mod error;
pub mod google;
pub mod openai;
pub mod registry;
pub mod stream;
pub mod title;

pub use error::{EgressError, Result};
