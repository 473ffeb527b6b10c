//! Fuzzy key matching between ground-truth labels and predicted labels.
//!
//! Models reproduce form labels inconsistently: translated (`心脏病` vs
//! `Heart Disease`), enumerated (`Q1. Diabetes`), with or without
//! punctuation, or with extra words. Matching runs as a chain of tiers, each
//! scanning every predicted label (in document order) before the next tier
//! is tried:
//!
//! 1. [`ExactVariant`]: the canonical keys are equal
//! 2. [`AsciiContainment`]: one ASCII key contains the other (≥ 4 chars)
//! 3. [`FullContainment`]: one full key contains the other (≥ 4 chars)
//!
//! Canonicalization first maps known Chinese labels to their English form,
//! strips leading enumeration, and normalizes the result.
//!
//! ```
//! use ocrbench::matcher::KeyMatcher;
//! use serde_json::json;
//!
//! let predicted = json!({"Heart Disease": "Y", "Diabetes": "N"});
//! let matcher = KeyMatcher::default();
//! let value = matcher.find_value("1. 心脏病", predicted.as_object().unwrap());
//! assert_eq!(value, Some(&json!("Y")));
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::normalize::normalize;

/// Known label translations, keyed by the exact (trimmed) source label.
static LABEL_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("心脏病", "Heart Disease"),
        ("高血压", "Hypertension"),
        ("血病", "Blood Disease"),
        ("性病", "V.D."),
        ("肾病", "Kidney Disease"),
        ("糖尿病", "Diabetes"),
        ("甲状腺病", "Thyroid Disease"),
        ("其他有关健康资料", "Other Medical Problems"),
        ("结核病", "T.B."),
        ("结核病 (肺癆)", "T.B."),
        ("羊痫", "Epilepsy"),
        ("脑充血", "Stroke"),
        ("肝病", "Liver Disease"),
        ("黄疸病", "Jaundice"),
        ("肝炎", "Hepatitis"),
        ("病历", "MEDICAL HISTORY"),
        ("现在正在接受医药治疗", "Current Medical Treatment"),
        ("是否服食任何药物", "Medicine Pills or Tablets"),
        ("入住医院或在医院「门诊部」接受治疗", "Previous Hospital Experience"),
        ("全身麻醉", "General Anaesthetic"),
        (
            "对「盘尼西林」、食物或其他药物有「敏感」",
            "Allergic to Penicillin or Other Substances",
        ),
        ("乾草热、湿疹或哮喘", "Hay Fever, Eczema, Asthma"),
        ("风湿性热病", "Rheumatic Fever"),
        ("施手术、脱牙或受伤时是否流血不止", "Abnormal Bleeding"),
        (
            "类固醇、抗凝血药物或电疗",
            "Steroid, Anti-coagulant or Irradiation Therapy",
        ),
        (
            "黄胆病、肝炎或其他肝病",
            "Jaundice, Hepatitis or Other Liver Disease",
        ),
        ("突然晕倒或常觉头晕", "Fainting or Giddiness"),
        ("曾否患水痘、麻疹、风疹、痄腮等症", "Childhood Diseases"),
        ("是否怀孕", "Expectant Mother"),
        ("日期", "Date"),
        ("药物", "DRUGS"),
    ])
});

/// Leading enumeration: `Q1.`, `A3)`, `12、`, `(4)`, `1 `.
static ENUMERATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\(\[]?[A-Za-z]?\d+(?:[.)\]:、．\-]\s*|\s+)").expect("valid enumeration regex")
});

/// Shortest key eligible for containment matching.
pub const MIN_CONTAINMENT_LEN: usize = 4;

/// Strip a leading enumeration marker, keeping the label if nothing remains.
#[must_use]
pub fn strip_enumeration(label: &str) -> &str {
    match ENUMERATION.find(label) {
        Some(m) => {
            let rest = label[m.end()..].trim();
            if rest.is_empty() {
                label
            } else {
                rest
            }
        }
        None => label,
    }
}

/// Resolve synonyms and enumeration, returning the label to normalize.
#[must_use]
pub fn canonical_label(label: &str) -> Cow<'_, str> {
    let trimmed = label.trim();
    if let Some(english) = LABEL_SYNONYMS.get(trimmed) {
        return Cow::Borrowed(*english);
    }
    let stripped = strip_enumeration(trimmed);
    match LABEL_SYNONYMS.get(stripped) {
        Some(english) => Cow::Borrowed(*english),
        None => Cow::Borrowed(stripped),
    }
}

/// Comparison keys derived from one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVariants {
    /// Normalized, punctuation-free, whitespace-free key.
    pub full: String,
    /// `full` restricted to ASCII letters and digits.
    pub ascii: String,
}

impl KeyVariants {
    /// Derive both keys from a raw label.
    #[must_use]
    pub fn of(label: &str) -> Self {
        let canonical = canonical_label(label);
        let full: String = normalize(&canonical, true, false)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let ascii = full.chars().filter(char::is_ascii_alphanumeric).collect();
        Self { full, ascii }
    }
}

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Equal full or ASCII keys.
    Exact,
    /// ASCII key containment.
    AsciiContainment,
    /// Full key containment.
    FullContainment,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::AsciiContainment => "ascii-containment",
            Self::FullContainment => "full-containment",
        };
        f.write_str(name)
    }
}

/// One tier of the matching chain.
pub trait MatchStrategy {
    /// Tier reported for matches found by this strategy.
    fn tier(&self) -> MatchTier;

    /// Whether `candidate` matches `target`.
    fn matches(&self, target: &KeyVariants, candidate: &KeyVariants) -> bool;
}

/// Equal full keys or equal ASCII keys (empty keys never match).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactVariant;

impl MatchStrategy for ExactVariant {
    fn tier(&self) -> MatchTier {
        MatchTier::Exact
    }

    fn matches(&self, target: &KeyVariants, candidate: &KeyVariants) -> bool {
        (!target.full.is_empty() && target.full == candidate.full)
            || (!target.ascii.is_empty() && target.ascii == candidate.ascii)
    }
}

fn contains_either_way(a: &str, b: &str, min_len: usize) -> bool {
    if a.chars().count() < min_len || b.chars().count() < min_len {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// Containment on ASCII keys.
#[derive(Debug, Clone, Copy)]
pub struct AsciiContainment {
    /// Both keys must be at least this many characters.
    pub min_len: usize,
}

impl Default for AsciiContainment {
    fn default() -> Self {
        Self {
            min_len: MIN_CONTAINMENT_LEN,
        }
    }
}

impl MatchStrategy for AsciiContainment {
    fn tier(&self) -> MatchTier {
        MatchTier::AsciiContainment
    }

    fn matches(&self, target: &KeyVariants, candidate: &KeyVariants) -> bool {
        contains_either_way(&target.ascii, &candidate.ascii, self.min_len)
    }
}

/// Containment on full keys.
#[derive(Debug, Clone, Copy)]
pub struct FullContainment {
    /// Both keys must be at least this many characters.
    pub min_len: usize,
}

impl Default for FullContainment {
    fn default() -> Self {
        Self {
            min_len: MIN_CONTAINMENT_LEN,
        }
    }
}

impl MatchStrategy for FullContainment {
    fn tier(&self) -> MatchTier {
        MatchTier::FullContainment
    }

    fn matches(&self, target: &KeyVariants, candidate: &KeyVariants) -> bool {
        contains_either_way(&target.full, &candidate.full, self.min_len)
    }
}

/// Ordered chain of match strategies.
pub struct KeyMatcher {
    strategies: Vec<Box<dyn MatchStrategy + Send + Sync>>,
}

impl Default for KeyMatcher {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactVariant),
            Box::new(AsciiContainment::default()),
            Box::new(FullContainment::default()),
        ])
    }
}

impl fmt::Debug for KeyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers: Vec<MatchTier> = self.strategies.iter().map(|s| s.tier()).collect();
        f.debug_struct("KeyMatcher").field("tiers", &tiers).finish()
    }
}

impl KeyMatcher {
    /// Build a matcher from an explicit strategy chain.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn MatchStrategy + Send + Sync>>) -> Self {
        Self { strategies }
    }

    /// Tier at which two labels match, if any.
    #[must_use]
    pub fn match_tier(&self, target: &str, candidate: &str) -> Option<MatchTier> {
        let target = KeyVariants::of(target);
        let candidate = KeyVariants::of(candidate);
        self.strategies
            .iter()
            .find(|s| s.matches(&target, &candidate))
            .map(|s| s.tier())
    }

    /// Find the predicted entry matching `target`.
    ///
    /// Tiers run over every predicted label. When the winning label holds
    /// `null` the field is absent; no lower tier is consulted.
    #[must_use]
    pub fn find<'a>(
        &self,
        target: &str,
        predicted: &'a Map<String, Value>,
    ) -> Option<(MatchTier, &'a str, &'a Value)> {
        let target_keys = KeyVariants::of(target);
        let candidates: Vec<(&'a str, &'a Value, KeyVariants)> = predicted
            .iter()
            .map(|(k, v)| (k.as_str(), v, KeyVariants::of(k)))
            .collect();

        for strategy in &self.strategies {
            if let Some((label, value, _)) = candidates
                .iter()
                .find(|(_, _, keys)| strategy.matches(&target_keys, keys))
            {
                if value.is_null() {
                    return None;
                }
                if strategy.tier() != MatchTier::Exact {
                    log::debug!("matched '{}' to '{}' via {}", target, label, strategy.tier());
                }
                return Some((strategy.tier(), *label, *value));
            }
        }
        None
    }

    /// Value stored under the predicted label matching `target`.
    #[must_use]
    pub fn find_value<'a>(&self, target: &str, predicted: &'a Map<String, Value>) -> Option<&'a Value> {
        self.find(target, predicted).map(|(_, _, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strip_enumeration() {
        assert_eq!(strip_enumeration("Q1. Diabetes"), "Diabetes");
        assert_eq!(strip_enumeration("A3) Stroke"), "Stroke");
        assert_eq!(strip_enumeration("12、心脏病"), "心脏病");
        assert_eq!(strip_enumeration("(4) Date"), "Date");
        assert_eq!(strip_enumeration("Q1."), "Q1.");
        assert_eq!(strip_enumeration("Diabetes"), "Diabetes");
        // digits inside a word are not enumeration
        assert_eq!(strip_enumeration("1st visit"), "1st visit");
    }

    #[test]
    fn test_synonym_after_enumeration() {
        assert_eq!(canonical_label("1. 心脏病"), "Heart Disease");
        assert_eq!(canonical_label("  结核病 (肺癆) "), "T.B.");
    }

    #[test]
    fn test_variants() {
        let v = KeyVariants::of("Hay Fever, Eczema, Asthma");
        assert_eq!(v.full, "HAYFEVERECZEMAASTHMA");
        assert_eq!(v.ascii, v.full);

        let v = KeyVariants::of("血型 Blood Type");
        assert_eq!(v.full, "血型BLOODTYPE");
        assert_eq!(v.ascii, "BLOODTYPE");
    }

    #[test]
    fn test_synonym_exact_tier() {
        let m = KeyMatcher::default();
        assert_eq!(m.match_tier("1. 心脏病", "Heart Disease"), Some(MatchTier::Exact));
        assert_eq!(m.match_tier("V.D.", "性病"), Some(MatchTier::Exact));
    }

    #[test]
    fn test_ascii_containment_tier() {
        let m = KeyMatcher::default();
        assert_eq!(
            m.match_tier("Diabetes", "糖尿病 Diabetes Mellitus"),
            Some(MatchTier::AsciiContainment)
        );
    }

    #[test]
    fn test_full_containment_tier() {
        let m = KeyMatcher::default();
        assert_eq!(m.match_tier("过敏史记录", "过敏史"), None);
        assert_eq!(
            m.match_tier("药物过敏史", "药物过敏史记录"),
            Some(MatchTier::FullContainment)
        );
    }

    #[test]
    fn test_short_keys_do_not_contain() {
        let m = KeyMatcher::default();
        assert_eq!(m.match_tier("TB", "TB TEST RESULT"), None);
    }

    #[test]
    fn test_exact_preferred_over_containment() {
        let m = KeyMatcher::default();
        let pred = obj(json!({"Diabetes Mellitus": "N", "Diabetes": "Y"}));
        let (tier, label, value) = m.find("diabetes", &pred).unwrap();
        assert_eq!(tier, MatchTier::Exact);
        assert_eq!(label, "Diabetes");
        assert_eq!(value, &json!("Y"));
    }

    #[test]
    fn test_null_is_absent() {
        let m = KeyMatcher::default();
        let pred = obj(json!({"Diabetes": null}));
        assert_eq!(m.find_value("Diabetes", &pred), None);

        let pred = obj(json!({"Diabetes": ""}));
        assert_eq!(m.find_value("Diabetes", &pred), Some(&json!("")));
    }

    #[test]
    fn test_null_exact_hit_blocks_lower_tiers() {
        let m = KeyMatcher::default();
        let pred = obj(json!({"Diabetes": null, "Diabetes mellitus": "Y"}));
        assert!(m.find("Diabetes", &pred).is_none());
        assert_eq!(m.find_value("Diabetes", &pred), None);

        // a null sibling does not hide a real exact hit
        let pred = obj(json!({"Diabetes mellitus": null, "Diabetes": "N"}));
        assert_eq!(m.find_value("Diabetes", &pred), Some(&json!("N")));
    }

    #[test]
    fn test_no_match() {
        let m = KeyMatcher::default();
        let pred = obj(json!({"Stroke": "Y"}));
        assert!(m.find_value("Hepatitis", &pred).is_none());
        assert!(m.find_value("", &pred).is_none());
    }
}
