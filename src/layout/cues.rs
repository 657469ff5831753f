//! Shallow lexical cues used by the paragraph segmenter.

use std::sync::LazyLock;

use regex::Regex;

static ENUMERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[IVX]+\.|\d+\.|[a-z]\))").unwrap());

const SENTENCE_ENDINGS: [&str; 12] = [
    ".", "!", "?", ":", ";", ".\"", ".)", "\".", "\").", "\"),", "\";", "\":",
];

const BULLETS: [char; 5] = ['•', '-', '*', '(', '['];

/// Connector words that open a new clause in Portuguese legal prose.
const CONNECTORS: [&str; 22] = [
    "art.",
    "artigo",
    "parágrafo",
    "§",
    "inciso",
    "considerando",
    "portanto",
    "assim",
    "desta",
    "neste",
    "pelo",
    "conforme",
    "segundo",
    "outrossim",
    "ademais",
    "contudo",
    "todavia",
    "entretanto",
    "por",
    "ante",
    "diante",
    "face",
];

const CAPS_MIN_LEN: usize = 5;
const CAPS_RATIO: f32 = 0.8;

/// At least one cased character and no lowercase ones.
pub fn is_upper(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        cased |= c.is_uppercase();
    }
    cased
}

/// More than 80% of the alphabetic characters are uppercase.
pub fn is_all_caps(text: &str) -> bool {
    if text.chars().count() < CAPS_MIN_LEN {
        return false;
    }
    let (letters, upper) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(letters, upper), c| {
            (letters + 1, upper + usize::from(c.is_uppercase()))
        });
    letters > 0 && upper as f32 / letters as f32 > CAPS_RATIO
}

pub fn ends_sentence(text: &str) -> bool {
    SENTENCE_ENDINGS.iter().any(|ending| text.ends_with(ending))
}

/// Uppercase opening, enumerator, bullet glyph or connector word.
pub fn starts_like_paragraph(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    if first.is_uppercase() || BULLETS.contains(&first) || ENUMERATOR.is_match(text) {
        return true;
    }
    let lower = text.to_lowercase();
    CONNECTORS.iter().any(|word| lower.starts_with(word))
}

/// Uppercase heading, or a short line introducing what follows.
pub fn looks_like_title(text: &str) -> bool {
    (is_upper(text) && text.chars().count() > 5)
        || (text.ends_with(':') && text.split_whitespace().count() < 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_caps_needs_length_and_ratio() {
        assert!(is_all_caps("CLÁUSULA PRIMEIRA"));
        assert!(is_all_caps("DO OBJETO 1."));
        assert!(!is_all_caps("ART."));
        assert!(!is_all_caps("12345"));
        assert!(!is_all_caps("Mostly lowercase"));
    }

    #[test]
    fn upper_ignores_uncased_characters() {
        assert!(is_upper("SECTION 2."));
        assert!(!is_upper("2024 - 15"));
        assert!(!is_upper("SECTION two"));
    }

    #[test]
    fn sentence_endings() {
        assert!(ends_sentence("as agreed."));
        assert!(ends_sentence("the \"Term\":"));
        assert!(ends_sentence("(see above)."));
        assert!(!ends_sentence("shall terminate on"));
        assert!(!ends_sentence("goods,"));
    }

    #[test]
    fn paragraph_openings() {
        assert!(starts_like_paragraph("Governing Law"));
        assert!(starts_like_paragraph("2. Governing Law"));
        assert!(starts_like_paragraph("IV. Das penalidades"));
        assert!(starts_like_paragraph("b) multa diária"));
        assert!(starts_like_paragraph("• item"));
        assert!(starts_like_paragraph("§ 1º O contratante"));
        assert!(starts_like_paragraph("conforme disposto"));
        assert!(!starts_like_paragraph("december 31, 2025."));
        assert!(!starts_like_paragraph(""));
    }

    #[test]
    fn titles() {
        assert!(looks_like_title("DAS OBRIGAÇÕES"));
        assert!(looks_like_title("The parties agree as follows:"));
        assert!(!looks_like_title("TERMO"));
        assert!(!looks_like_title("Plain sentence without colon"));
    }
}
