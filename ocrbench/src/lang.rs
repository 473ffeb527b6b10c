//! Script classification for tokenization and normalization.
//!
//! Only the CJK Unified Ideographs block (U+4E00..=U+9FFF) is treated as
//! "CJK" here: that is the block form transcriptions draw from, and the one
//! the tokenizer splits into single-character tokens.

/// Returns true for a CJK Unified Ideograph.
#[must_use]
#[inline]
pub fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}')
}

/// Returns true if any character of `text` is a CJK ideograph.
#[must_use]
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_ideograph)
}

/// Remove whitespace runs whose neighbours on both sides are CJK ideographs.
///
/// `"心 脏  病 A"` becomes `"心脏病 A"`. Whitespace next to non-CJK text is
/// left alone.
#[must_use]
pub fn collapse_cjk_whitespace(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            let bridged = start > 0
                && i < chars.len()
                && is_cjk_ideograph(chars[start - 1])
                && is_cjk_ideograph(chars[i]);
            if !bridged {
                out.extend(&chars[start..i]);
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Split text into word tokens.
///
/// Text containing CJK ideographs is split into maximal ASCII alphanumeric
/// runs plus single ideographs (everything else is dropped). Other text is
/// split on whitespace.
///
/// ```
/// use ocrbench::lang::tokenize;
///
/// assert_eq!(tokenize("hello world"), ["hello", "world"]);
/// assert_eq!(tokenize("血压 120mmHg"), ["血", "压", "120mmHg"]);
/// ```
#[must_use]
pub fn tokenize(text: &str) -> Vec<&str> {
    if !contains_cjk(text) {
        return text.split_whitespace().collect();
    }
    let mut tokens = Vec::new();
    let mut run_start: Option<usize> = None;
    for (idx, c) in text.char_indices() {
        if c.is_ascii_alphanumeric() {
            run_start.get_or_insert(idx);
            continue;
        }
        if let Some(start) = run_start.take() {
            tokens.push(&text[start..idx]);
        }
        if is_cjk_ideograph(c) {
            tokens.push(&text[idx..idx + c.len_utf8()]);
        }
    }
    if let Some(start) = run_start {
        tokens.push(&text[start..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cjk() {
        assert!(is_cjk_ideograph('心'));
        assert!(!is_cjk_ideograph('A'));
        // Hiragana is outside the ideograph block.
        assert!(!is_cjk_ideograph('あ'));
    }

    #[test]
    fn test_collapse_only_between_ideographs() {
        assert_eq!(collapse_cjk_whitespace("心 脏  病 A"), "心脏病 A");
        assert_eq!(collapse_cjk_whitespace("A B"), "A B");
        assert_eq!(collapse_cjk_whitespace(" 心 "), " 心 ");
        assert_eq!(collapse_cjk_whitespace("心\n\t脏"), "心脏");
    }

    #[test]
    fn test_tokenize_plain() {
        assert_eq!(tokenize("  a  b c "), ["a", "b", "c"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_mixed() {
        assert_eq!(tokenize("高血压: Y, 2024年"), ["高", "血", "压", "Y", "2024", "年"]);
    }
}
