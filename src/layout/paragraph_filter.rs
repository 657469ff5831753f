//! Document-wide paragraph filtering: exact duplicates, near-duplicate
//! clusters and paragraphs that are too short.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::core::config::ReaderConfig;
use crate::core::model::Paragraph;
use crate::core::similarity::{token_set_ratio_prepared, TokenSet};
use crate::core::text::{collapse_whitespace, strip_digits, word_count};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The digit-free text occurs more than once.
    ExactDuplicate,
    /// Part of a near-duplicate cluster of at least `max_paragraph_repetitions`.
    Repetition,
    /// Fewer digit-free words than `min_words_per_paragraph`.
    TooShort,
}

#[derive(Debug, Clone)]
pub struct DroppedParagraph {
    pub paragraph: Paragraph,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Survivors, renumbered per page in input order.
    pub kept: Vec<Paragraph>,
    pub dropped: Vec<DroppedParagraph>,
}

struct Candidate {
    clean_text: String,
    tokens: TokenSet,
    words_without_digits: usize,
    repeated: bool,
}

/// Filter the paragraphs of a whole document. Input must be in document
/// order, page by page.
pub fn filter_paragraphs(mut paragraphs: Vec<Paragraph>, config: &ReaderConfig) -> FilterOutcome {
    let threshold = config.fuzzy_threshold;
    let max_repetitions = config.max_paragraph_repetitions;

    let without_digits: Vec<String> = paragraphs.iter().map(|p| strip_digits(&p.raw_text)).collect();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for text in &without_digits {
        *occurrences.entry(text.as_str()).or_default() += 1;
    }

    let mut candidates: Vec<Candidate> = paragraphs
        .iter()
        .zip(&without_digits)
        .map(|(paragraph, text)| Candidate {
            clean_text: collapse_whitespace(&paragraph.raw_text),
            tokens: TokenSet::new(text),
            words_without_digits: word_count(text),
            repeated: false,
        })
        .collect();
    for (paragraph, text) in paragraphs.iter_mut().zip(&without_digits) {
        paragraph.duplicate_flag = occurrences[text.as_str()] > 1;
    }

    let mut boilerplate: HashSet<String> = HashSet::new();
    let mut clustered: HashSet<usize> = HashSet::new();
    for source in 0..candidates.len() {
        if clustered.contains(&source) || boilerplate.contains(&candidates[source].clean_text) {
            continue;
        }
        let members: Vec<usize> = (0..candidates.len())
            .filter(|&other| {
                token_set_ratio_prepared(&candidates[source].tokens, &candidates[other].tokens)
                    > threshold
            })
            .collect();

        let is_cluster = members.len() >= max_repetitions;
        if is_cluster {
            debug!(source, members = members.len(), "near-duplicate cluster");
            boilerplate.insert(candidates[source].clean_text.clone());
            clustered.extend(members.iter().copied());
        }
        for &member in &members {
            paragraphs[member].repeated_with = Some(source);
            paragraphs[member].repetition_count = members.len();
            candidates[member].repeated |= is_cluster;
        }
    }

    let mut outcome = FilterOutcome::default();
    let mut next_index: BTreeMap<u32, usize> = BTreeMap::new();
    for (mut paragraph, candidate) in paragraphs.into_iter().zip(candidates) {
        let reason = if paragraph.duplicate_flag {
            Some(DropReason::ExactDuplicate)
        } else if candidate.repeated || boilerplate.contains(&candidate.clean_text) {
            Some(DropReason::Repetition)
        } else if candidate.words_without_digits < config.min_words_per_paragraph {
            Some(DropReason::TooShort)
        } else {
            None
        };
        paragraph.clean_text = candidate.clean_text;

        match reason {
            Some(reason) => outcome.dropped.push(DroppedParagraph { paragraph, reason }),
            None => {
                let index = next_index.entry(paragraph.page).or_default();
                paragraph.paragraph_index = *index;
                *index += 1;
                paragraph.width = (paragraph.bbox.x1 - paragraph.bbox.x0).abs();
                paragraph.height = (paragraph.bbox.y1 - paragraph.bbox.y0).abs();
                outcome.kept.push(paragraph);
            }
        }
    }

    info!(
        kept = outcome.kept.len(),
        dropped = outcome.dropped.len(),
        "filtered paragraphs"
    );
    outcome
}
