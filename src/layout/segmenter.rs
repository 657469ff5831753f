//! Groups consecutive lines of a page into paragraphs.
//!
//! Every pair of neighbouring lines is run through an ordered decision table.
//! The first rule that matches decides whether the second line opens a new
//! paragraph; later rules are never consulted.

use tracing::trace;

use super::cues::{ends_sentence, is_all_caps, looks_like_title, starts_like_paragraph};
use super::page_stats::PageStatistics;
use crate::core::geometry::BBox;
use crate::core::model::{padded_extent, Line, Paragraph};
use crate::core::text::word_count;

/// Lines with fewer words than this count as short.
const SHORT_LINE_WORDS: usize = 8;

/// The rule that decided a paragraph break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakRule {
    FirstLine,
    LargeGap,
    GapWithSentenceCue,
    CapsBlock,
    CapsBlockEnd,
    AfterTitle,
    SentenceBoundary,
    AfterShortLine,
    Continuation,
}

impl BreakRule {
    pub fn is_break(self) -> bool {
        matches!(
            self,
            Self::LargeGap
                | Self::GapWithSentenceCue
                | Self::CapsBlockEnd
                | Self::AfterTitle
                | Self::SentenceBoundary
                | Self::AfterShortLine
        )
    }
}

/// Decide how `current` relates to the line above it. `previous_text` is the
/// text of the last non-empty line.
pub fn break_rule(
    current: &Line,
    previous: Option<&Line>,
    previous_text: &str,
    stats: &PageStatistics,
) -> BreakRule {
    let Some(previous) = previous else {
        return BreakRule::FirstLine;
    };
    let gap = current.bbox.y0 - previous.bbox.y1;
    let typical = stats.typical_line_gap;
    let current_text = current.text.trim();
    let previous_text = previous_text.trim();

    let previous_ends_sentence = ends_sentence(previous_text);
    let current_opens = starts_like_paragraph(current_text);
    let previous_caps = is_all_caps(previous_text);
    let current_caps = is_all_caps(current_text);

    if gap > stats.dynamic_paragraph_threshold {
        BreakRule::LargeGap
    } else if gap > typical * 1.5 && (previous_ends_sentence || current_opens) {
        BreakRule::GapWithSentenceCue
    } else if previous_caps && current_caps {
        BreakRule::CapsBlock
    } else if previous_caps {
        BreakRule::CapsBlockEnd
    } else if looks_like_title(previous_text) && gap > typical * 0.8 {
        BreakRule::AfterTitle
    } else if previous_ends_sentence && current_opens && gap > typical {
        BreakRule::SentenceBoundary
    } else if word_count(previous_text) < SHORT_LINE_WORDS && gap > typical * 1.2 {
        BreakRule::AfterShortLine
    } else {
        BreakRule::Continuation
    }
}

/// Segment the filtered lines of one page.
pub fn segment_page(page: u32, lines: &[Line]) -> Vec<Paragraph> {
    let mut ordered = lines.to_vec();
    ordered.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    let stats = PageStatistics::from_lines(&ordered);

    let mut paragraphs = Vec::new();
    let mut buffer: Vec<&Line> = Vec::new();
    let mut previous: Option<&Line> = None;
    let mut previous_text: &str = "";

    for line in &ordered {
        let rule = break_rule(line, previous, previous_text, &stats);
        trace!(page, line = line.line_index, ?rule, "paragraph break rule");
        if rule.is_break() && !buffer.is_empty() {
            paragraphs.push(flush(page, paragraphs.len(), &buffer));
            buffer.clear();
        }
        if line.token_count > 0 {
            buffer.push(line);
            previous_text = line.text.as_str();
        }
        previous = Some(line);
    }
    if !buffer.is_empty() {
        paragraphs.push(flush(page, paragraphs.len(), &buffer));
    }
    paragraphs
}

fn flush(page: u32, paragraph_index: usize, lines: &[&Line]) -> Paragraph {
    let raw_text = lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();
    let bbox = BBox::union_all(lines.iter().map(|line| &line.bbox)).unwrap_or_default();
    let (width, height) = padded_extent(&bbox);
    Paragraph {
        page,
        paragraph_index,
        token_count: word_count(&raw_text),
        raw_text,
        clean_text: String::new(),
        bbox,
        width,
        height,
        duplicate_flag: false,
        repeated_with: None,
        repetition_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(index: usize, text: &str, x0: f32, y0: f32, x1: f32) -> Line {
        let bbox = BBox::new(x0, y0, x1, y0 + 10.0);
        Line {
            page: 1,
            line_index: index,
            text: text.to_string(),
            bbox,
            token_count: word_count(text),
            width: x1 - x0 + 0.025,
            height: 10.025,
            font_size: 10.0,
        }
    }

    fn texts(paragraphs: &[Paragraph]) -> Vec<&str> {
        paragraphs.iter().map(|p| p.raw_text.as_str()).collect()
    }

    #[test]
    fn continuation_lines_merge() {
        let lines = vec![
            line(0, "This Agreement shall terminate on", 72.0, 100.0, 300.0),
            line(1, "December 31, 2025.", 72.0, 112.0, 180.0),
        ];
        let paragraphs = segment_page(1, &lines);
        assert_eq!(
            texts(&paragraphs),
            vec!["This Agreement shall terminate on December 31, 2025."]
        );
        assert_eq!(paragraphs[0].bbox, BBox::new(72.0, 100.0, 300.0, 122.0));
        assert_eq!(paragraphs[0].token_count, 8);
    }

    #[test]
    fn large_gap_splits_numbered_clause() {
        let lines = vec![
            line(0, "The term ends when both parties sign the release.", 72.0, 100.0, 400.0),
            line(1, "2. Governing Law", 72.0, 140.0, 200.0),
            line(2, "This Agreement is governed by the laws of Delaware", 72.0, 152.0, 400.0),
        ];
        let paragraphs = segment_page(1, &lines);
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].paragraph_index, 0);
        assert_eq!(paragraphs[1].paragraph_index, 1);
        assert!(paragraphs[1].raw_text.starts_with("2. Governing Law"));
    }

    #[test]
    fn caps_block_stays_together_then_breaks() {
        let lines = vec![
            line(0, "CLÁUSULA PRIMEIRA", 72.0, 100.0, 200.0),
            line(1, "DO OBJETO", 72.0, 112.0, 160.0),
            line(2, "O presente contrato tem por objeto a prestação", 72.0, 124.0, 400.0),
            line(3, "de serviços de consultoria jurídica", 72.0, 136.0, 350.0),
        ];
        let paragraphs = segment_page(1, &lines);
        assert_eq!(
            texts(&paragraphs),
            vec![
                "CLÁUSULA PRIMEIRA DO OBJETO",
                "O presente contrato tem por objeto a prestação de serviços de consultoria jurídica",
            ]
        );
    }

    #[test]
    fn rules_are_checked_in_order() {
        let lines = vec![
            line(0, "HEADING TEXT", 72.0, 100.0, 200.0),
            line(1, "MORE HEADING", 72.0, 112.0, 200.0),
        ];
        let stats = PageStatistics::from_lines(&lines);
        assert_eq!(
            break_rule(&lines[0], None, "", &stats),
            BreakRule::FirstLine
        );
        assert_eq!(
            break_rule(&lines[1], Some(&lines[0]), &lines[0].text, &stats),
            BreakRule::CapsBlock
        );

        let far = line(2, "MORE HEADING", 72.0, 400.0, 200.0);
        assert_eq!(
            break_rule(&far, Some(&lines[0]), &lines[0].text, &stats),
            BreakRule::LargeGap
        );
    }

    /// Typical gap 2.0, hard split above 20.0.
    fn fixed_stats() -> PageStatistics {
        PageStatistics {
            mean_height: 10.0,
            median_height: 10.0,
            std_height: 0.0,
            mean_font_size: 10.0,
            gaps: vec![2.0],
            mean_gap: 2.0,
            median_gap: 2.0,
            std_gap: 0.0,
            typical_line_gap: 2.0,
            dynamic_paragraph_threshold: 20.0,
        }
    }

    fn rule_between(previous: &str, current: &str, gap: f32) -> BreakRule {
        let above = line(0, previous, 72.0, 100.0, 400.0);
        let below = line(1, current, 72.0, 110.0 + gap, 400.0);
        break_rule(&below, Some(&above), &above.text, &fixed_stats())
    }

    #[test]
    fn gap_with_sentence_cue() {
        assert_eq!(
            rule_between("The goods were delivered.", "payment follows within ten days", 4.0),
            BreakRule::GapWithSentenceCue
        );
        assert_eq!(
            rule_between("shall be delivered by the supplier", "2. Payment", 4.0),
            BreakRule::GapWithSentenceCue
        );
        assert_eq!(
            rule_between("shall be delivered by the supplier and", "payment follows", 4.0),
            BreakRule::AfterShortLine
        );
    }

    #[test]
    fn break_after_title() {
        assert_eq!(
            rule_between("The parties agree as follows:", "the supplier shall deliver", 2.5),
            BreakRule::AfterTitle
        );
        assert_eq!(
            rule_between("The parties agree as follows:", "the supplier shall deliver", 1.0),
            BreakRule::Continuation
        );
    }

    #[test]
    fn sentence_boundary_needs_more_than_typical_gap() {
        assert_eq!(
            rule_between("The goods were delivered in full.", "Payment follows within ten days.", 2.5),
            BreakRule::SentenceBoundary
        );
        assert_eq!(
            rule_between("The goods were delivered in full.", "Payment follows within ten days.", 2.0),
            BreakRule::Continuation
        );
    }

    #[test]
    fn break_after_short_line() {
        assert_eq!(
            rule_between("signed by both parties", "and witnessed by the notary", 2.5),
            BreakRule::AfterShortLine
        );
        assert_eq!(
            rule_between("signed by both parties", "and witnessed by the notary", 2.0),
            BreakRule::Continuation
        );
        assert_eq!(
            rule_between(
                "signed by both parties in the presence of two witnesses",
                "and the notary",
                2.5
            ),
            BreakRule::Continuation
        );
    }

    #[test]
    fn caps_block_shadows_title() {
        // "DAS OBRIGAÇÕES" is both all caps and a title.
        assert_eq!(
            rule_between("DAS OBRIGAÇÕES", "DO CONTRATANTE", 2.5),
            BreakRule::CapsBlock
        );
        assert!(!BreakRule::CapsBlock.is_break());
        assert_eq!(
            rule_between("DAS OBRIGAÇÕES", "o contratante deverá pagar", 2.5),
            BreakRule::CapsBlockEnd
        );
    }

    #[test]
    fn unsorted_input_is_read_top_down() {
        let lines = vec![
            line(1, "second half of the sentence", 72.0, 112.0, 300.0),
            line(0, "first half of the sentence and", 72.0, 100.0, 300.0),
        ];
        let paragraphs = segment_page(1, &lines);
        assert_eq!(
            texts(&paragraphs),
            vec!["first half of the sentence and second half of the sentence"]
        );
    }

    #[test]
    fn empty_page_has_no_paragraphs() {
        assert!(segment_page(3, &[]).is_empty());
    }
}
