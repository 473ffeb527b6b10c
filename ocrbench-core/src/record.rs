//! Ground-truth and prediction records.
//!
//! Both record kinds are keyed by `file_name`. Ground truth is either
//! unstructured (a single `text` field) or structured (one JSON value per
//! schema field). Predictions arrive as raw model output: plain text, a JSON
//! object, or a string holding JSON, often wrapped in a markdown code fence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One curated ground-truth entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    /// Unique identifier of the source document.
    pub file_name: String,
    /// Every other key of the record, in document order.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl GroundTruthRecord {
    /// Build an unstructured record holding only `text`.
    #[must_use]
    pub fn text_only(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("text".to_string(), Value::String(text.into()));
        Self {
            file_name: file_name.into(),
            fields,
        }
    }

    /// Build a structured record from an already-assembled field map.
    #[must_use]
    pub fn structured(file_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            file_name: file_name.into(),
            fields,
        }
    }

    /// The unstructured transcription, if this record has one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.fields.get("text").and_then(Value::as_str)
    }

    /// The structured payload stored under `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Raw model output for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    /// Free text, possibly containing (fenced) JSON.
    Text(String),
    /// Output that was already decoded into JSON.
    Structured(Value),
}

impl Default for Prediction {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Prediction {
    /// The prediction as plain text.
    ///
    /// Structured predictions are rendered back to compact JSON.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Structured(Value::String(s)) => s.clone(),
            Self::Structured(Value::Null) => String::new(),
            Self::Structured(v) => v.to_string(),
        }
    }

    /// The prediction as a structured object.
    ///
    /// Never fails: anything that cannot be read as a JSON object yields an
    /// empty map.
    #[must_use]
    pub fn parsed(&self) -> Map<String, Value> {
        match self {
            Self::Text(s) | Self::Structured(Value::String(s)) => parse_structured(s),
            Self::Structured(Value::Object(map)) => map.clone(),
            Self::Structured(_) => Map::new(),
        }
    }
}

/// One model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Identifier matching a ground-truth `file_name`.
    pub file_name: String,
    /// What the model produced.
    #[serde(default)]
    pub prediction: Prediction,
    /// Model that produced the prediction, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl PredictionRecord {
    /// Convenience constructor for a text prediction.
    #[must_use]
    pub fn text(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            prediction: Prediction::Text(text.into()),
            model_name: None,
        }
    }

    /// Convenience constructor for an already-structured prediction.
    #[must_use]
    pub fn structured(file_name: impl Into<String>, value: Value) -> Self {
        Self {
            file_name: file_name.into(),
            prediction: Prediction::Structured(value),
            model_name: None,
        }
    }
}

/// Remove a surrounding markdown code fence (```` ```json ```` or bare
/// ```` ``` ````) from model output.
///
/// Text without a fence is returned trimmed.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse model output into a JSON object.
///
/// Tries the fence-stripped text first, then the outermost `{ ... }` span.
/// Returns an empty map when neither yields an object.
#[must_use]
pub fn parse_structured(raw: &str) -> Map<String, Value> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Map::new();
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        return map;
    }
    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&body[start..=end]) {
                return map;
            }
        }
    }
    log::debug!("prediction is not a JSON object; treating it as empty");
    Map::new()
}
