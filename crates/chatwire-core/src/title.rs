//! Title fetch result and failure taxonomy

use serde::{Deserialize, Serialize};

/// Why a title fetch produced (or failed to produce) a title.
///
/// All of these are local failures reported as data; the caller substitutes
/// a deterministic fallback title rather than surfacing an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleFailureReason {
    /// A non-empty title was extracted
    Success,

    /// Server responded with a non-2xx status
    #[serde(rename = "http_non_200")]
    HttpNon200,

    /// Response matched a known shape but the extracted value was empty
    EmptyContent,

    /// Response shape unrecognized by both the adapter and the fallback extractor
    ParseFailed,

    /// Transport failed before a response was obtained
    NetworkError,
}

/// Diagnosed outcome of a one-shot title-generation request.
///
/// Invariant: `title.is_some()` iff `reason == Success`. Use the
/// constructors rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleFetchResult {
    /// Extracted title, present only on success
    pub title: Option<String>,

    /// Success or diagnosed failure mode
    pub reason: TitleFailureReason,

    /// HTTP status, if a response was obtained
    pub status: Option<u16>,

    /// Bounded preview of the raw response body, for diagnostics
    pub data_preview: Option<String>,
}

impl TitleFetchResult {
    /// A successful extraction
    pub fn success(title: String, status: u16) -> Self {
        Self {
            title: Some(title),
            reason: TitleFailureReason::Success,
            status: Some(status),
            data_preview: None,
        }
    }

    /// A diagnosed failure
    pub fn failure(
        reason: TitleFailureReason,
        status: Option<u16>,
        data_preview: Option<String>,
    ) -> Self {
        debug_assert!(reason != TitleFailureReason::Success);
        Self {
            title: None,
            reason,
            status,
            data_preview,
        }
    }

    /// Whether the fetch produced a usable title
    pub fn is_success(&self) -> bool {
        self.reason == TitleFailureReason::Success
    }
}
