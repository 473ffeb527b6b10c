//! Text canonicalization for OCR comparison.
//!
//! Model output and curated transcriptions differ in ways that carry no
//! content: full-width vs half-width forms, case, line wrapping, framing
//! phrases like "Recognized text:", and spacing inside CJK runs. The
//! normalizer removes those differences before any metric is computed.
//!
//! # Pipeline
//!
//! 1. Unicode NFKC
//! 2. Remove noise phrases (case-insensitive, in order)
//! 3. Upper-case
//! 4. Bracketed mark glyphs `(X)`, `[✓]` → ` Y `; empty brackets `( )` → ` N `
//! 5. Remove whitespace between adjacent CJK ideographs
//! 6. Line breaks → spaces
//! 7. Strip ASCII and CJK punctuation (when requested)
//! 8. Strip every non-alphanumeric character (strict semantic mode)
//! 9. Collapse whitespace and trim
//!
//! # Example
//!
//! ```
//! use ocrbench::normalize::normalize;
//!
//! assert_eq!(normalize("Recognized text: Hello,\n World!", true, false), "HELLO WORLD");
//! assert_eq!(normalize("高 血 压 (✓)", true, false), "高血压 Y");
//! assert_eq!(normalize("Under medication", false, true), "UNDERMEDICATION");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::lang::collapse_cjk_whitespace;

/// Framing phrases models prepend to their output.
static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)handwritten note:",
        r"(?i)handwritten:",
        r"(?i)\[redacted\]",
        r"(?i)note:",
        r"(?i)caption this image",
        r"(?i)recognized text:",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid noise pattern"))
    .collect()
});

static MARKED_BOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[\{][XV\u{2713}\u{2714}\u{2717}\u{2718}][\)\]\}]").expect("valid regex"));

static EMPTY_BOX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[\{]\s*[\)\]\}]").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Punctuation outside ASCII that transcriptions commonly contain.
const EXTENDED_PUNCTUATION: &str = "！＂＃＄％＆＇（）＊＋，－．／：；＜＝＞？＠［＼］＾＿｀｛｜｝～\
“”‘’〈〉《》「」『』【】〔〕〖〗〽〰〾〿–—„‟†‡•‥…‰′″‹›※‼‽‾‿⁀⁁⁂⁃、。・";

/// Returns true for characters removed by punctuation stripping.
#[must_use]
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || EXTENDED_PUNCTUATION.contains(c)
}

/// Upper bound on re-normalization passes.
const MAX_PASSES: usize = 4;

/// Normalize text for comparison.
///
/// * `remove_punctuation` strips ASCII and CJK punctuation.
/// * `strict_semantic` additionally strips everything that is not a letter or
///   digit (including spaces), so `"under medication"` and
///   `"undermedication"` compare equal. It implies punctuation removal.
///
/// The result is stable: normalizing it again with the same flags returns it
/// unchanged.
#[must_use]
pub fn normalize(text: &str, remove_punctuation: bool, strict_semantic: bool) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut current = normalize_pass(text, remove_punctuation, strict_semantic);
    for _ in 1..MAX_PASSES {
        let next = normalize_pass(&current, remove_punctuation, strict_semantic);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Default normalization for free text: punctuation removed.
#[must_use]
pub fn normalize_default(text: &str) -> String {
    normalize(text, true, false)
}

/// Strict normalization for labels and short values.
#[must_use]
pub fn normalize_label(text: &str) -> String {
    normalize(text, true, true)
}

fn normalize_pass(text: &str, remove_punctuation: bool, strict_semantic: bool) -> String {
    let mut s: String = text.nfkc().collect();

    for pattern in NOISE_PATTERNS.iter() {
        if pattern.is_match(&s) {
            s = pattern.replace_all(&s, "").into_owned();
        }
    }

    s = s.to_uppercase();

    s = MARKED_BOX.replace_all(&s, " Y ").into_owned();
    s = EMPTY_BOX.replace_all(&s, " N ").into_owned();

    s = collapse_cjk_whitespace(&s);
    s = s.replace('\n', " ");

    if remove_punctuation || strict_semantic {
        s.retain(|c| !is_punctuation(c));
    }
    if strict_semantic {
        s.retain(char::is_alphanumeric);
    }

    let collapsed = WHITESPACE.replace_all(&s, " ");
    collapse_cjk_whitespace(collapsed.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(normalize("", true, true), "");
        assert_eq!(normalize("   \n ", true, false), "");
    }

    #[test]
    fn test_nfkc_fullwidth() {
        assert_eq!(normalize("ＡＢＣ１２３", false, false), "ABC123");
    }

    #[test]
    fn test_noise_removed_case_insensitive() {
        assert_eq!(normalize("HANDWRITTEN NOTE: take pills", false, false), "TAKE PILLS");
        assert_eq!(normalize("[Redacted] name", true, false), "NAME");
        assert_eq!(normalize("Caption this image please", false, false), "PLEASE");
    }

    #[test]
    fn test_checkbox_glyphs() {
        assert_eq!(normalize("Diabetes (X)", true, false), "DIABETES Y");
        assert_eq!(normalize("Diabetes [✔]", true, false), "DIABETES Y");
        assert_eq!(normalize("Diabetes ( )", true, false), "DIABETES N");
        assert_eq!(normalize("Diabetes {}", false, false), "DIABETES N");
        // lower-case v is upper-cased first
        assert_eq!(normalize("(v)", true, false), "Y");
    }

    #[test]
    fn test_cjk_spacing() {
        assert_eq!(normalize("心 脏\n病", false, false), "心脏病");
        assert_eq!(normalize("心脏 A 病", false, false), "心脏 A 病");
    }

    #[test]
    fn test_punctuation_kept_unless_requested() {
        assert_eq!(normalize("a, b.", false, false), "A, B.");
        assert_eq!(normalize("a, b.", true, false), "A B");
        assert_eq!(normalize("《病历》：无", true, false), "病历无");
    }

    #[test]
    fn test_strict_semantic() {
        assert_eq!(normalize("under medication", false, true), "UNDERMEDICATION");
        assert_eq!(normalize("T.B. (肺癆)", false, true), "TB肺癆");
    }

    #[test]
    fn test_punctuation_exposing_cjk_gap() {
        // Removing the comma leaves two ideographs separated by spaces.
        let once = normalize("心 , 脏", true, false);
        assert_eq!(once, "心脏");
        assert_eq!(normalize(&once, true, false), once);
    }

    #[test]
    fn test_idempotent_on_nested_noise() {
        let once = normalize("NOTnote:E: x", false, false);
        assert_eq!(normalize(&once, false, false), once);
    }
}
