//! Inter-annotator agreement (Cohen's kappa).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Landis & Koch style bucket for a kappa value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    /// κ < 0
    Poor,
    /// κ < 0.2
    Slight,
    /// κ < 0.4
    Fair,
    /// κ < 0.6
    Moderate,
    /// κ < 0.8
    Substantial,
    /// κ ≥ 0.8
    AlmostPerfect,
}

impl AgreementLevel {
    /// Bucket for `kappa`.
    #[must_use]
    pub fn from_kappa(kappa: f64) -> Self {
        if kappa < 0.0 {
            Self::Poor
        } else if kappa < 0.2 {
            Self::Slight
        } else if kappa < 0.4 {
            Self::Fair
        } else if kappa < 0.6 {
            Self::Moderate
        } else if kappa < 0.8 {
            Self::Substantial
        } else {
            Self::AlmostPerfect
        }
    }
}

impl fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Poor => "Poor agreement (worse than chance)",
            Self::Slight => "Slight agreement",
            Self::Fair => "Fair agreement",
            Self::Moderate => "Moderate agreement",
            Self::Substantial => "Substantial agreement",
            Self::AlmostPerfect => "Almost perfect agreement",
        })
    }
}

/// Cohen's kappa with its ingredients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KappaResult {
    /// Chance-corrected agreement.
    pub kappa: f64,
    /// Fraction of items both annotators labelled identically.
    pub observed_agreement: f64,
    /// Agreement expected from the marginal label frequencies.
    pub expected_agreement: f64,
    /// Items compared.
    pub n: usize,
    /// Bucketed verdict.
    pub level: AgreementLevel,
}

impl fmt::Display for KappaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kappa={:.4} (observed={:.4}, expected={:.4}, n={}): {}",
            self.kappa, self.observed_agreement, self.expected_agreement, self.n, self.level
        )
    }
}

/// Cohen's kappa between two label sequences over the union of their labels.
///
/// ```
/// use ocrbench::eval::agreement::cohens_kappa;
///
/// let a = ["Y", "Y", "N", "N"];
/// let b = ["Y", "N", "N", "N"];
/// let k = cohens_kappa(&a, &b).unwrap();
/// assert!((k.kappa - 0.5).abs() < 1e-12);
/// ```
///
/// # Errors
///
/// Fails when the sequences are empty or differ in length.
pub fn cohens_kappa<S>(annotator1: &[S], annotator2: &[S]) -> Result<KappaResult>
where
    S: Eq + Hash + Ord,
{
    if annotator1.len() != annotator2.len() {
        return Err(Error::invalid_input(format!(
            "annotation sequences differ in length: {} vs {}",
            annotator1.len(),
            annotator2.len()
        )));
    }
    if annotator1.is_empty() {
        return Err(Error::invalid_input("annotation sequences are empty"));
    }

    let n = annotator1.len();
    let agreed = annotator1
        .iter()
        .zip(annotator2)
        .filter(|(a, b)| a == b)
        .count();
    let observed = agreed as f64 / n as f64;

    let mut counts1: HashMap<&S, usize> = HashMap::new();
    let mut counts2: HashMap<&S, usize> = HashMap::new();
    for label in annotator1 {
        *counts1.entry(label).or_default() += 1;
    }
    for label in annotator2 {
        *counts2.entry(label).or_default() += 1;
    }
    // Sorted union keeps the floating-point sum order stable.
    let labels: BTreeSet<&S> = counts1.keys().chain(counts2.keys()).copied().collect();
    let nf = n as f64;
    let expected: f64 = labels
        .iter()
        .map(|label| {
            let p1 = counts1.get(label).copied().unwrap_or(0) as f64 / nf;
            let p2 = counts2.get(label).copied().unwrap_or(0) as f64 / nf;
            p1 * p2
        })
        .sum();

    let kappa = if expected >= 1.0 {
        1.0
    } else {
        (observed - expected) / (1.0 - expected)
    };
    Ok(KappaResult {
        kappa,
        observed_agreement: observed,
        expected_agreement: expected,
        n,
        level: AgreementLevel::from_kappa(kappa),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_agreement() {
        let a = ["Y", "N", "Y"];
        let k = cohens_kappa(&a, &a).unwrap();
        assert_eq!(k.kappa, 1.0);
        assert_eq!(k.level, AgreementLevel::AlmostPerfect);
    }

    #[test]
    fn test_single_label_everywhere() {
        let a = ["Y", "Y", "Y"];
        let k = cohens_kappa(&a, &a).unwrap();
        assert_eq!(k.expected_agreement, 1.0);
        assert_eq!(k.kappa, 1.0);
    }

    #[test]
    fn test_worse_than_chance() {
        let a = ["Y", "N", "Y", "N"];
        let b = ["N", "Y", "N", "Y"];
        let k = cohens_kappa(&a, &b).unwrap();
        assert_eq!(k.observed_agreement, 0.0);
        assert_eq!(k.kappa, -1.0);
        assert_eq!(k.level.to_string(), "Poor agreement (worse than chance)");
    }

    #[test]
    fn test_disjoint_labels_use_union() {
        let a = ["A", "A"];
        let b = ["B", "B"];
        let k = cohens_kappa(&a, &b).unwrap();
        assert_eq!(k.expected_agreement, 0.0);
        assert_eq!(k.kappa, 0.0);
        assert_eq!(k.level, AgreementLevel::Slight);
    }

    #[test]
    fn test_errors() {
        let empty: [&str; 0] = [];
        assert!(cohens_kappa(&empty, &empty).is_err());
        assert!(cohens_kappa(&["Y"], &["Y", "N"]).is_err());
    }

    #[test]
    fn test_levels() {
        assert_eq!(AgreementLevel::from_kappa(0.1), AgreementLevel::Slight);
        assert_eq!(AgreementLevel::from_kappa(0.3), AgreementLevel::Fair);
        assert_eq!(AgreementLevel::from_kappa(0.5), AgreementLevel::Moderate);
        assert_eq!(AgreementLevel::from_kappa(0.7), AgreementLevel::Substantial);
        assert_eq!(AgreementLevel::from_kappa(0.8), AgreementLevel::AlmostPerfect);
    }
}
