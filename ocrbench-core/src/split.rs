//! Named dataset splits.
//!
//! A split file maps split names to file names:
//!
//! ```json
//! {"v1": ["a.png", "b.png"], "v2": ["c.png"]}
//! ```
//!
//! Entries that are not lists are treated as empty, and empty names are
//! dropped. An absent or empty split means "no filtering".

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::GroundTruthRecord;

/// Split name → member file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSplits {
    splits: BTreeMap<String, BTreeSet<String>>,
}

impl<'de> Deserialize<'de> for DatasetSplits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let splits = raw
            .into_iter()
            .map(|(name, value)| {
                let files = match value {
                    Value::Array(items) => items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(s) if !s.is_empty() => Some(s),
                            Value::Null | Value::Bool(false) | Value::String(_) => None,
                            other => Some(other.to_string()),
                        })
                        .collect(),
                    _ => BTreeSet::new(),
                };
                (name, files)
            })
            .collect();
        Ok(Self { splits })
    }
}

impl DatasetSplits {
    /// Parse a split document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::parse(format!("invalid split file: {}", e)))
    }

    /// Load a split file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Add (or replace) a split.
    pub fn insert<I, S>(&mut self, name: impl Into<String>, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files = files
            .into_iter()
            .map(Into::into)
            .filter(|f: &String| !f.is_empty())
            .collect();
        self.splits.insert(name.into(), files);
    }

    /// Members of a split, or `None` when the split is absent or empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.splits.get(name).filter(|files| !files.is_empty())
    }

    /// Split names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.splits.keys().map(String::as_str)
    }

    /// Keep only ground-truth records belonging to `split`.
    ///
    /// Returns the input unchanged when the split is absent or empty.
    #[must_use]
    pub fn filter_ground_truth(&self, records: Vec<GroundTruthRecord>, split: &str) -> Vec<GroundTruthRecord> {
        match self.get(split) {
            Some(files) => records
                .into_iter()
                .filter(|r| files.contains(&r.file_name))
                .collect(),
            None => records,
        }
    }

    /// Keep only file names belonging to `split`.
    #[must_use]
    pub fn filter_file_names<'a>(&self, names: &[&'a str], split: &str) -> Vec<&'a str> {
        match self.get(split) {
            Some(files) => names.iter().copied().filter(|n| files.contains(*n)).collect(),
            None => names.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerant_parse() {
        let splits =
            DatasetSplits::from_json_str(r#"{"v1": ["a", "", null], "v2": "oops", "v3": []}"#).unwrap();
        assert_eq!(splits.get("v1").unwrap().len(), 1);
        assert!(splits.get("v2").is_none());
        assert!(splits.get("v3").is_none());
        assert!(splits.get("v4").is_none());
    }

    #[test]
    fn test_filter_ground_truth() {
        let mut splits = DatasetSplits::default();
        splits.insert("v1", ["a.png"]);
        let gt = vec![
            GroundTruthRecord::text_only("a.png", "x"),
            GroundTruthRecord::text_only("b.png", "y"),
        ];
        let kept = splits.filter_ground_truth(gt.clone(), "v1");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].file_name, "a.png");
        assert_eq!(splits.filter_ground_truth(gt, "v2").len(), 2);
    }

    #[test]
    fn test_filter_file_names() {
        let mut splits = DatasetSplits::default();
        splits.insert("v2", ["b"]);
        assert_eq!(splits.filter_file_names(&["a", "b"], "v2"), ["b"]);
        assert_eq!(splits.filter_file_names(&["a", "b"], "v1"), ["a", "b"]);
    }

    #[test]
    fn test_not_an_object_is_error() {
        assert!(DatasetSplits::from_json_str("[1, 2]").is_err());
    }
}
