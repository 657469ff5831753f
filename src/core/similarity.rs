//! Approximate string scores on a 0..=100 scale.
//!
//! All scores are symmetric and give 100 for identical input. The base score
//! is normalized Levenshtein similarity; the partial and token-set variants
//! follow the classic fuzzy-matching definitions built on top of it.

use std::collections::{BTreeSet, HashMap};

use strsim::{levenshtein, normalized_levenshtein};

/// Plain edit-distance similarity.
pub fn ratio(a: &str, b: &str) -> u8 {
    to_score(normalized_levenshtein(a, b))
}

/// Best [`ratio`] between the shorter string and every equally long window
/// of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }
    if long.contains(short) {
        return 100;
    }

    let short_len = short.chars().count();
    let boundaries: Vec<usize> = long
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(long.len()))
        .collect();

    let mut best = 0.0_f64;
    for start in 0..boundaries.len() - short_len {
        let window = &long[boundaries[start]..boundaries[start + short_len]];
        let distance = levenshtein(window, short);
        let score = 1.0 - distance as f64 / short_len as f64;
        if score > best {
            best = score;
            if distance == 0 {
                break;
            }
        }
    }
    to_score(best)
}

/// Sorted unique tokens of a string after lowercasing and replacing every
/// non-alphanumeric character with a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    tokens: BTreeSet<String>,
}

impl TokenSet {
    pub fn new(text: &str) -> Self {
        let processed: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .to_lowercase();
        Self {
            tokens: processed.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Word-order insensitive similarity between two strings.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_ratio_prepared(&TokenSet::new(a), &TokenSet::new(b))
}

/// [`token_set_ratio`] on pre-tokenized input; the paragraph filter compares
/// every paragraph against every other and tokenizes each one once.
pub fn token_set_ratio_prepared(a: &TokenSet, b: &TokenSet) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let join = |tokens: Vec<&String>| {
        tokens
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let shared = join(a.tokens.intersection(&b.tokens).collect());
    let only_a = join(a.tokens.difference(&b.tokens).collect());
    let only_b = join(b.tokens.difference(&a.tokens).collect());

    let combined_a = concat_tokens(&shared, &only_a);
    let combined_b = concat_tokens(&shared, &only_b);

    let mut best = 0;
    for (x, y) in [
        (&shared, &combined_a),
        (&shared, &combined_b),
        (&combined_a, &combined_b),
    ] {
        if x.is_empty() || y.is_empty() {
            continue;
        }
        if score_upper_bound(x, y) <= best {
            continue;
        }
        best = best.max(ratio(x, y));
    }
    best
}

fn concat_tokens(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Cheap ceiling for [`ratio`]: the edit distance is at least the length
/// difference and at least the character-multiset difference.
fn score_upper_bound(a: &str, b: &str) -> u8 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 100;
    }

    let mut counts: HashMap<char, i64> = HashMap::new();
    for c in a.chars() {
        *counts.entry(c).or_default() += 1;
    }
    for c in b.chars() {
        *counts.entry(c).or_default() -= 1;
    }
    let (surplus, deficit) = counts.values().fold((0_i64, 0_i64), |(s, d), &v| {
        if v > 0 {
            (s + v, d)
        } else {
            (s, d - v)
        }
    });
    let min_distance = surplus.max(deficit) as usize;
    to_score(1.0 - min_distance as f64 / longest as f64)
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_full() {
        let text = "the licensee shall pay all fees";
        assert_eq!(ratio(text, text), 100);
        assert_eq!(partial_ratio(text, text), 100);
        assert_eq!(token_set_ratio(text, text), 100);
    }

    #[test]
    fn scores_are_symmetric() {
        let a = "confidential information of the disclosing party";
        let b = "information of the receiving party";
        assert_eq!(ratio(a, b), ratio(b, a));
        assert_eq!(partial_ratio(a, b), partial_ratio(b, a));
        assert_eq!(token_set_ratio(a, b), token_set_ratio(b, a));
    }

    #[test]
    fn token_set_ignores_word_order() {
        assert_eq!(
            token_set_ratio("governing law of new york", "new york governing law of"),
            100
        );
    }

    #[test]
    fn token_set_tolerates_subset() {
        let score = token_set_ratio(
            "this agreement is confidential",
            "this agreement is confidential and proprietary",
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn unrelated_text_scores_low() {
        let score = token_set_ratio("payment due within thirty days", "governing law new york");
        assert!(score < 60, "score was {score}");
    }

    #[test]
    fn partial_ratio_finds_embedded_text() {
        assert_eq!(partial_ratio("terminate on", "shall terminate on december"), 100);
        assert!(partial_ratio("terminate 0n", "shall terminate on december") > 90);
    }

    #[test]
    fn partial_ratio_handles_multibyte() {
        assert_eq!(partial_ratio("cláusula", "a cláusula terceira"), 100);
        assert!(partial_ratio("clausula", "a cláusula terceira") >= 85);
    }

    #[test]
    fn empty_input_scores_zero_against_text() {
        assert_eq!(partial_ratio("", "abc"), 0);
        assert_eq!(token_set_ratio("", "abc"), 0);
    }

    #[test]
    fn upper_bound_never_underestimates() {
        let pairs = [
            ("kitten", "sitting"),
            ("flaw", "lawn"),
            ("governing law", "law governing"),
        ];
        for (a, b) in pairs {
            assert!(score_upper_bound(a, b) >= ratio(a, b));
        }
    }
}
