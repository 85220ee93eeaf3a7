use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::models::ProductFeature;

/// Relevance label attached to a suggestion by the inference service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    High,
    Medium,
    Low,
    /// Missing or unrecognised label; scored as neutral
    Unspecified,
}

impl Relevance {
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()).as_deref() {
            Some("high") => Relevance::High,
            Some("medium") => Relevance::Medium,
            Some("low") => Relevance::Low,
            _ => Relevance::Unspecified,
        }
    }

    /// Factor applied to the base confidence score
    pub fn multiplier(self) -> f64 {
        match self {
            Relevance::High => 1.2,
            Relevance::Medium | Relevance::Unspecified => 1.0,
            Relevance::Low => 0.8,
        }
    }
}

/// One ranked entry extracted from the inference reply
#[derive(Debug, Clone, PartialEq)]
pub struct AiSuggestion {
    pub product_id: String,
    pub relevance: Relevance,
    pub explanation: Option<String>,
}

/// Outcome of decoding a free-text inference reply
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedReply {
    Parsed(Vec<AiSuggestion>),
    Unparseable,
}

/// Product identifiers may come back as strings or bare numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    #[serde(alias = "product_id")]
    product_id: RawId,
    // Non-string values read as absent
    #[serde(default)]
    relevance: Option<Value>,
    #[serde(default)]
    explanation: Option<Value>,
}

impl From<RawSuggestion> for AiSuggestion {
    fn from(raw: RawSuggestion) -> Self {
        let product_id = match raw.product_id {
            RawId::Text(id) => id.trim().to_string(),
            RawId::Number(n) => n.to_string(),
        };

        Self {
            product_id,
            relevance: Relevance::parse(raw.relevance.as_ref().and_then(Value::as_str)),
            explanation: raw
                .explanation
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Widest `[...]` span, across newlines
static BRACKETED_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("Invalid bracketed array regex"));

/// Decodes a reply that should be, or should contain, a JSON array of suggestions
///
/// The whole reply is tried first, then the widest `[...]` span inside it.
/// Elements that are not suggestion objects are dropped individually rather
/// than failing the whole reply.
pub fn decode_reply(raw: &str) -> DecodedReply {
    let entries = serde_json::from_str::<Vec<Value>>(raw.trim()).ok().or_else(|| {
        BRACKETED_ARRAY
            .find(raw)
            .and_then(|m| serde_json::from_str::<Vec<Value>>(m.as_str()).ok())
    });

    let Some(entries) = entries else {
        return DecodedReply::Unparseable;
    };

    let total = entries.len();
    let suggestions: Vec<AiSuggestion> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawSuggestion>(entry).ok())
        .map(AiSuggestion::from)
        .collect();

    if suggestions.len() < total {
        tracing::debug!(
            dropped = total - suggestions.len(),
            kept = suggestions.len(),
            "Dropped malformed inference reply entries"
        );
    }

    DecodedReply::Parsed(suggestions)
}

/// Keeps suggestions that name a known candidate, first mention wins
pub fn validate_suggestions(
    suggestions: Vec<AiSuggestion>,
    candidates: &[ProductFeature],
) -> Vec<AiSuggestion> {
    let known: HashSet<&str> = candidates.iter().map(|p| p.id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();

    suggestions
        .into_iter()
        .filter(|suggestion| {
            if !known.contains(suggestion.product_id.as_str()) {
                tracing::debug!(
                    product_id = %suggestion.product_id,
                    "Discarding suggestion for unknown product"
                );
                return false;
            }
            seen.insert(suggestion.product_id.clone())
        })
        .collect()
}
