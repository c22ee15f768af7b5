use serde::{Deserialize, Serialize};

/// Which detection stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Request scheme is a known non-network injection scheme.
    Protocol,
    /// Full URL matched an injected-resource signature.
    Pattern,
    /// Weighted indicators cleared the heuristic threshold.
    Heuristic,
    /// Matched, but recognized as legitimate — never blocked.
    Whitelist,
    /// No stage fired.
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Protocol => "protocol",
            MatchType::Pattern => "pattern",
            MatchType::Heuristic => "heuristic",
            MatchType::Whitelist => "whitelist",
            MatchType::None => "none",
        }
    }
}

/// Outcome of classifying one URL.
///
/// Invariants: `should_block` implies `is_match`, and `confidence == 0`
/// implies `match_type == None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_match: bool,
    pub match_type: MatchType,
    /// Stable identifier of the offending source, when extractable.
    pub match_id: Option<String>,
    /// Coarse classification of the injecting runtime, when derivable.
    pub origin_kind: Option<String>,
    pub should_block: bool,
    /// Human-readable justification; always populated.
    pub reason: String,
    /// Detection certainty, 0-100.
    pub confidence: u8,
}

impl ClassificationResult {
    pub fn no_match(reason: impl Into<String>) -> Self {
        Self {
            is_match: false,
            match_type: MatchType::None,
            match_id: None,
            origin_kind: None,
            should_block: false,
            reason: reason.into(),
            confidence: 0,
        }
    }
}
