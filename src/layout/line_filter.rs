use std::collections::HashMap;

use tracing::debug;

use crate::core::model::Line;
use crate::core::text::{alphanumeric_word_count, strip_digits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDrop {
    /// No alphanumeric word survives.
    Blank,
    /// The digit-free text occurs more than once in the document.
    Repeated,
}

/// Why a line would be dropped, or `None` when it is kept.
pub fn classify_lines(lines: &[Line]) -> Vec<Option<LineDrop>> {
    let without_digits: Vec<String> = lines.iter().map(|line| strip_digits(&line.text)).collect();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for text in &without_digits {
        *occurrences.entry(text.as_str()).or_default() += 1;
    }

    lines
        .iter()
        .zip(&without_digits)
        .map(|(line, text)| {
            if alphanumeric_word_count(&line.text) == 0 {
                Some(LineDrop::Blank)
            } else if occurrences[text.as_str()] > 1 {
                Some(LineDrop::Repeated)
            } else {
                None
            }
        })
        .collect()
}

/// Drop blank lines and every occurrence of a repeated line, such as running
/// headers, footers and page numbers.
pub fn filter_lines(lines: Vec<Line>) -> Vec<Line> {
    let verdicts = classify_lines(&lines);
    let before = lines.len();
    let kept: Vec<Line> = lines
        .into_iter()
        .zip(verdicts)
        .filter_map(|(line, verdict)| verdict.is_none().then_some(line))
        .collect();
    debug!(lines = before, kept = kept.len(), "filtered lines");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use pretty_assertions::assert_eq;

    fn line(page: u32, text: &str) -> Line {
        Line {
            page,
            line_index: 0,
            text: text.to_string(),
            bbox: BBox::new(0.0, 0.0, 100.0, 10.0),
            token_count: text.split_whitespace().count(),
            width: 100.025,
            height: 10.025,
            font_size: 10.0,
        }
    }

    #[test]
    fn removes_every_copy_of_running_headers() {
        let lines = vec![
            line(1, "ACME Supply Agreement"),
            line(1, "Page 1"),
            line(1, "The supplier shall deliver the goods."),
            line(2, "ACME Supply Agreement"),
            line(2, "Page 2"),
            line(2, "Payment is due within thirty days."),
        ];
        let kept = filter_lines(lines);
        let texts: Vec<&str> = kept.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "The supplier shall deliver the goods.",
                "Payment is due within thirty days."
            ]
        );
    }

    #[test]
    fn classifies_blank_before_repeated() {
        let lines = vec![line(1, "- -"), line(2, "- -"), line(1, "Unique text")];
        assert_eq!(
            classify_lines(&lines),
            vec![Some(LineDrop::Blank), Some(LineDrop::Blank), None]
        );
    }
}
