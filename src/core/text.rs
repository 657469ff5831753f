use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());

/// Replace every whitespace run with a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// Remove every decimal digit, leaving the surrounding text untouched.
pub fn strip_digits(text: &str) -> String {
    DIGITS.replace_all(text, "").into_owned()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words left after dropping every character that is neither alphanumeric
/// nor whitespace. Zero means the text is effectively blank.
pub fn alphanumeric_word_count(text: &str) -> usize {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    word_count(&kept)
}

/// Form used for snippet matching: compatibility-normalized, lowercase,
/// whitespace collapsed.
pub fn normalize_for_match(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    collapse_whitespace(&composed.to_lowercase())
}
