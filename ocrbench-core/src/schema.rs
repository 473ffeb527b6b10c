//! Document schemas: which fields to score, how, and with what weight.
//!
//! A schema is loaded from YAML or JSON:
//!
//! ```yaml
//! schema_name: medical_form
//! fields:
//!   - name: logical_values
//!     type: categorical_dict
//!     evaluation: accuracy
//!     weight: 0.3
//! ```
//!
//! Weights are normalized to sum to 1.0 at load time (unless every weight is
//! zero, in which case they are left alone).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const MEDICAL_FORM_YAML: &str = include_str!("../schemas/medical_form.yaml");

/// Shape of a field's ground-truth payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Label → categorical value (typically Y/N).
    CategoricalDict,
    /// List of entity strings.
    EntityList,
    /// Label → free-text value.
    TextDict,
}

impl FieldKind {
    /// Canonical snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CategoricalDict => "categorical_dict",
            Self::EntityList => "entity_list",
            Self::TextDict => "text_dict",
        }
    }
}

/// How a field is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Evaluation {
    /// Fraction of ground-truth labels whose value matches.
    Accuracy,
    /// Entity-set F1.
    F1,
    /// Fraction of labels whose normalized text values contain one another.
    Pairing,
    /// Strict equality of the raw values.
    ExactMatch,
}

impl Evaluation {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::F1 => "f1",
            Self::Pairing => "pairing",
            Self::ExactMatch => "exact_match",
        }
    }
}

impl From<String> for Evaluation {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "accuracy" => Self::Accuracy,
            "f1" => Self::F1,
            "pairing" => Self::Pairing,
            "exact_match" => Self::ExactMatch,
            other => {
                log::warn!("unknown evaluation '{}', falling back to accuracy", other);
                Self::Accuracy
            }
        }
    }
}

impl From<Evaluation> for String {
    fn from(e: Evaluation) -> Self {
        e.as_str().to_string()
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_weight() -> f64 {
    1.0
}

/// One scored field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Key under which the field appears in ground truth and predictions.
    pub name: String,
    /// Payload shape.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Scoring method.
    pub evaluation: Evaluation,
    /// Relative weight; normalized by the owning schema.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldSpec {
    /// Create a field with weight 1.0.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind, evaluation: Evaluation) -> Self {
        Self {
            name: name.into(),
            kind,
            evaluation,
            weight: 1.0,
            description: String::new(),
        }
    }

    /// Set the (unnormalized) weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

fn default_schema_name() -> String {
    "unknown".to_string()
}

fn default_schema_type() -> String {
    "medical_form".to_string()
}

fn default_version() -> String {
    "v2".to_string()
}

/// On-disk representation; validated into [`Schema`].
#[derive(Deserialize)]
struct RawSchema {
    #[serde(default = "default_schema_name")]
    schema_name: String,
    #[serde(default = "default_schema_type")]
    schema_type: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    prompt_template: String,
}

impl TryFrom<RawSchema> for Schema {
    type Error = Error;

    fn try_from(raw: RawSchema) -> Result<Self> {
        let mut schema = Schema {
            schema_name: raw.schema_name,
            schema_type: raw.schema_type,
            version: raw.version,
            description: raw.description,
            fields: raw.fields,
            prompt_template: raw.prompt_template,
        };
        schema.validate()?;
        schema.normalize_weights();
        Ok(schema)
    }
}

/// A validated schema with normalized weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    schema_name: String,
    schema_type: String,
    version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    fields: Vec<FieldSpec>,
    #[serde(skip_serializing_if = "String::is_empty")]
    prompt_template: String,
}

impl Schema {
    /// Build a schema from field specs, validating and normalizing weights.
    ///
    /// # Errors
    ///
    /// Fails on duplicate field names or negative/non-finite weights.
    pub fn new(schema_name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self> {
        Self::try_from(RawSchema {
            schema_name: schema_name.into(),
            schema_type: default_schema_type(),
            version: default_version(),
            description: String::new(),
            fields,
            prompt_template: String::new(),
        })
    }

    /// Parse a YAML schema document.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error::schema(format!("invalid YAML schema: {}", e)))
    }

    /// Parse a JSON schema document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::schema(format!("invalid JSON schema: {}", e)))
    }

    /// Load a schema file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// The built-in medical form schema: Y/N answers, disease status,
    /// medical entities and label/value pairings.
    pub fn medical_form() -> Result<Self> {
        Self::from_yaml_str(MEDICAL_FORM_YAML)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(Error::schema("field with empty name"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::schema(format!(
                    "duplicate field '{}' in schema '{}'",
                    field.name, self.schema_name
                )));
            }
            if !field.weight.is_finite() || field.weight < 0.0 {
                return Err(Error::schema(format!(
                    "field '{}' has invalid weight {}",
                    field.name, field.weight
                )));
            }
        }
        Ok(())
    }

    fn normalize_weights(&mut self) {
        let total: f64 = self.fields.iter().map(|f| f.weight).sum();
        if total > 0.0 {
            for field in &mut self.fields {
                field.weight /= total;
            }
        }
    }

    /// Schema identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema_name
    }

    /// Schema family (e.g. `medical_form`).
    #[must_use]
    pub fn schema_type(&self) -> &str {
        &self.schema_type
    }

    /// Schema version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Prompt template. Carried for completeness; never used in scoring.
    #[must_use]
    pub fn prompt_template(&self) -> &str {
        &self.prompt_template
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Normalized weight of a field (0.0 for unknown fields).
    #[must_use]
    pub fn weight_of(&self, name: &str) -> f64 {
        self.field(name).map_or(0.0, |f| f.weight)
    }

    /// All normalized weights keyed by field name.
    #[must_use]
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.weight))
            .collect()
    }

    /// Whether a parsed prediction carries every field this schema scores.
    #[must_use]
    pub fn validate_prediction(&self, prediction: &Map<String, Value>) -> bool {
        self.fields.iter().all(|f| prediction.contains_key(&f.name))
    }

    /// Names of schema fields missing from a parsed prediction.
    #[must_use]
    pub fn missing_fields<'a>(&'a self, prediction: &Map<String, Value>) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| !prediction.contains_key(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weights_normalized() {
        let schema = Schema::new(
            "s",
            vec![
                FieldSpec::new("a", FieldKind::CategoricalDict, Evaluation::Accuracy).with_weight(3.0),
                FieldSpec::new("b", FieldKind::EntityList, Evaluation::F1).with_weight(1.0),
            ],
        )
        .unwrap();
        assert!((schema.weight_of("a") - 0.75).abs() < 1e-12);
        assert!((schema.weight_of("b") - 0.25).abs() < 1e-12);
        assert_eq!(schema.weight_of("missing"), 0.0);
    }

    #[test]
    fn test_zero_weights_untouched() {
        let schema = Schema::new(
            "s",
            vec![FieldSpec::new("a", FieldKind::TextDict, Evaluation::Pairing).with_weight(0.0)],
        )
        .unwrap();
        assert_eq!(schema.weight_of("a"), 0.0);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::new(
            "s",
            vec![
                FieldSpec::new("a", FieldKind::TextDict, Evaluation::Pairing),
                FieldSpec::new("a", FieldKind::TextDict, Evaluation::Pairing),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let yaml = "fields:\n  - name: a\n    type: text_dict\n    evaluation: pairing\n    weight: -1\n";
        assert!(Schema::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_yaml_defaults_and_unknown_evaluation() {
        let yaml = "fields:\n  - name: a\n    type: categorical_dict\n    evaluation: fuzzy\n";
        let schema = Schema::from_yaml_str(yaml).unwrap();
        assert_eq!(schema.name(), "unknown");
        assert_eq!(schema.version(), "v2");
        assert_eq!(schema.schema_type(), "medical_form");
        assert_eq!(schema.fields()[0].evaluation, Evaluation::Accuracy);
        assert_eq!(schema.weight_of("a"), 1.0);
    }

    #[test]
    fn test_medical_form_preset() {
        let schema = Schema::medical_form().unwrap();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["logical_values", "disease_status", "medical_entities", "field_pairings"]
        );
        let total: f64 = schema.fields().iter().map(|f| f.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(schema.field("medical_entities").unwrap().evaluation, Evaluation::F1);
    }

    #[test]
    fn test_validate_prediction() {
        let schema = Schema::medical_form().unwrap();
        let partial = json!({"logical_values": {}, "medical_entities": []});
        let partial = partial.as_object().unwrap();
        assert!(!schema.validate_prediction(partial));
        assert_eq!(schema.missing_fields(partial), ["disease_status", "field_pairings"]);
    }

    #[test]
    fn test_json_schema_roundtrips_normalized() {
        let schema = Schema::from_json_str(
            r#"{"schema_name": "x", "fields": [{"name": "a", "type": "entity_list", "evaluation": "f1", "weight": 2}]}"#,
        )
        .unwrap();
        let again: Schema = serde_json::from_str(&serde_json::to_string(&schema).unwrap()).unwrap();
        assert_eq!(again, schema);
    }
}
