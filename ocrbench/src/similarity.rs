//! Distance and similarity metrics for OCR output.
//!
//! All rate metrics compare a prediction against a ground truth and return a
//! value where 0.0 is a perfect transcription. Precision/recall/F1 metrics
//! return a value where 1.0 is perfect.
//!
//! | Metric | Unit | Empty ground truth |
//! |--------|------|--------------------|
//! | [`cer`] | characters | 0 if prediction empty, else 1 |
//! | [`wer`] | tokens ([`crate::lang::tokenize`]) | 0 if prediction empty, else 1 |
//! | [`ned`] | characters | 0 if both empty, 1 if one empty |
//! | [`char_precision_recall`] | matching blocks | (1,1) if both empty, (0,0) if one empty |
//! | [`bow_f1`] | token sets | 1 if both empty, 0 if one empty |

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::lang::tokenize;

/// Edit distance (insertions, deletions, substitutions; unit cost).
///
/// O(n·m) time, O(min(n, m)) space.
///
/// ```
/// use ocrbench::similarity::levenshtein;
///
/// let a: Vec<char> = "kitten".chars().collect();
/// let b: Vec<char> = "sitting".chars().collect();
/// assert_eq!(levenshtein(&a, &b), 3);
/// ```
#[must_use]
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];
    for (i, x) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in short.iter().enumerate() {
            let substitution = prev[j] + usize::from(x != y);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Character-level edit distance between two strings.
#[must_use]
pub fn char_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein(&a, &b)
}

/// Character Error Rate: edit distance over ground-truth length.
///
/// Not bounded by 1.0: a prediction much longer than the ground truth scores
/// above 1.
#[must_use]
pub fn cer(prediction: &str, ground_truth: &str) -> f64 {
    let gt: Vec<char> = ground_truth.chars().collect();
    if gt.is_empty() {
        return if prediction.is_empty() { 0.0 } else { 1.0 };
    }
    let pred: Vec<char> = prediction.chars().collect();
    levenshtein(&pred, &gt) as f64 / gt.len() as f64
}

/// Word Error Rate over [`tokenize`] tokens.
#[must_use]
pub fn wer(prediction: &str, ground_truth: &str) -> f64 {
    let gt = tokenize(ground_truth);
    let pred = tokenize(prediction);
    if gt.is_empty() {
        return if pred.is_empty() { 0.0 } else { 1.0 };
    }
    levenshtein(&pred, &gt) as f64 / gt.len() as f64
}

/// Normalized Edit Distance: edit distance over the longer length. Always in [0, 1].
#[must_use]
pub fn ned(prediction: &str, ground_truth: &str) -> f64 {
    let pred: Vec<char> = prediction.chars().collect();
    let gt: Vec<char> = ground_truth.chars().collect();
    let longest = pred.len().max(gt.len());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(&pred, &gt) as f64 / longest as f64
}

/// Exact string equality.
#[must_use]
pub fn exact_match(prediction: &str, ground_truth: &str) -> bool {
    prediction == ground_truth
}

// =============================================================================
// Matching blocks
// =============================================================================

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a`
/// (then `b`) on ties. Returns `(i, j, size)`.
fn longest_match<T: Eq + Hash>(
    a: &[T],
    b2j: &HashMap<&T, Vec<usize>>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, item) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(item) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }
    (best_i, best_j, best_size)
}

/// Total size of the matching blocks between two sequences.
///
/// Recursively takes the longest common block and recurses on the pieces to
/// its left and right (the Ratcliff/Obershelp decomposition, with no junk
/// heuristic).
#[must_use]
pub fn matching_blocks_total<T: Eq + Hash>(a: &[T], b: &[T]) -> usize {
    let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
    for (j, item) in b.iter().enumerate() {
        b2j.entry(item).or_default().push(j);
    }

    let mut total = 0;
    let mut queue = vec![((0, a.len()), (0, b.len()))];
    while let Some(((alo, ahi), (blo, bhi))) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, (alo, ahi), (blo, bhi));
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push(((alo, i), (blo, j)));
        }
        if i + k < ahi && j + k < bhi {
            queue.push(((i + k, ahi), (j + k, bhi)));
        }
    }
    total
}

/// Character precision and recall from matching blocks.
///
/// Precision is matched characters over prediction length; recall is matched
/// characters over ground-truth length.
#[must_use]
pub fn char_precision_recall(prediction: &str, ground_truth: &str) -> (f64, f64) {
    let pred: Vec<char> = prediction.chars().collect();
    let gt: Vec<char> = ground_truth.chars().collect();
    match (pred.is_empty(), gt.is_empty()) {
        (true, true) => return (1.0, 1.0),
        (true, false) | (false, true) => return (0.0, 0.0),
        (false, false) => {}
    }
    let matched = matching_blocks_total(&pred, &gt) as f64;
    (matched / pred.len() as f64, matched / gt.len() as f64)
}

// =============================================================================
// Set-based F1
// =============================================================================

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Bag-of-words F1 over the token sets of both texts (order ignored).
#[must_use]
pub fn bow_f1(prediction: &str, ground_truth: &str) -> f64 {
    let pred: HashSet<&str> = tokenize(prediction).into_iter().collect();
    let gt: HashSet<&str> = tokenize(ground_truth).into_iter().collect();
    match (pred.is_empty(), gt.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    let common = pred.intersection(&gt).count() as f64;
    harmonic_mean(common / pred.len() as f64, common / gt.len() as f64)
}

/// Outcome of matching a predicted entity list against a ground-truth list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityScores {
    /// Fraction of predicted entities that matched a ground-truth entity.
    pub precision: f64,
    /// Fraction of ground-truth entities that were found.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Ground-truth entities found.
    pub true_positives: usize,
    /// Predicted entities matching nothing.
    pub false_positives: usize,
    /// Ground-truth entities not found.
    pub false_negatives: usize,
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Entity-set F1 with substring matching.
///
/// Entities are compared lower-cased and trimmed. A ground-truth entity counts
/// as found when it contains, or is contained in, any predicted entity, so
/// `"aspirin"` is found by `"Aspirin 100mg"`.
///
/// ```
/// use ocrbench::similarity::entity_f1;
///
/// let s = entity_f1(&["Aspirin 100mg", "Metformin"], &["aspirin", "metformin"]);
/// assert_eq!(s.f1, 1.0);
/// ```
#[must_use]
pub fn entity_f1<P: AsRef<str>, G: AsRef<str>>(predicted: &[P], ground_truth: &[G]) -> EntityScores {
    let pred: Vec<String> = predicted
        .iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .collect();
    let gt: Vec<String> = ground_truth
        .iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .collect();

    let true_positives = gt
        .iter()
        .filter(|g| pred.iter().any(|p| overlaps(g, p)))
        .count();
    let false_positives = pred
        .iter()
        .filter(|p| !gt.iter().any(|g| overlaps(g, p)))
        .count();
    let false_negatives = gt.len() - true_positives;

    let precision = if pred.is_empty() {
        0.0
    } else {
        (pred.len() - false_positives) as f64 / pred.len() as f64
    };
    let recall = if gt.is_empty() {
        0.0
    } else {
        true_positives as f64 / gt.len() as f64
    };

    EntityScores {
        precision,
        recall,
        f1: harmonic_mean(precision, recall),
        true_positives,
        false_positives,
        false_negatives,
    }
}
