use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::ReaderConfig;
use crate::core::geometry::BBox;
use crate::core::model::{EvidenceMatch, Line};
use crate::core::similarity::partial_ratio;
use crate::core::text::normalize_for_match;

/// Snippets shorter than this after normalization never match.
const MIN_SNIPPET_CHARS: usize = 3;
/// Widest run of consecutive lines a snippet may span.
const MAX_WINDOW_LINES: usize = 4;

/// A snippet to locate, with the paragraph it was quoted from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceQuery {
    /// Full paragraph text; context only.
    pub paragraph_text: String,
    pub snippet: String,
    pub page: u32,
    /// Box of the source paragraph. Without it every line of the page is a
    /// candidate.
    pub paragraph_bbox: Option<BBox>,
}

impl EvidenceQuery {
    pub fn new(page: u32, snippet: impl Into<String>) -> Self {
        Self {
            page,
            snippet: snippet.into(),
            ..Self::default()
        }
    }

    pub fn within(mut self, paragraph_text: impl Into<String>, bbox: BBox) -> Self {
        self.paragraph_text = paragraph_text.into();
        self.paragraph_bbox = Some(bbox);
        self
    }
}

/// Filtered lines grouped by page, with their match form precomputed.
#[derive(Debug, Clone, Default)]
pub struct LineTable<'a> {
    pages: BTreeMap<u32, Vec<IndexedLine<'a>>>,
}

#[derive(Debug, Clone)]
struct IndexedLine<'a> {
    line: &'a Line,
    normalized: String,
}

impl<'a> LineTable<'a> {
    pub fn new(lines: &'a [Line]) -> Self {
        let mut pages: BTreeMap<u32, Vec<IndexedLine<'a>>> = BTreeMap::new();
        for line in lines {
            pages.entry(line.page).or_default().push(IndexedLine {
                line,
                normalized: normalize_for_match(&line.text),
            });
        }
        for page in pages.values_mut() {
            page.sort_by(|a, b| {
                a.line
                    .bbox
                    .y0
                    .total_cmp(&b.line.bbox.y0)
                    .then(a.line.bbox.x0.total_cmp(&b.line.bbox.x0))
            });
        }
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, page: u32) -> &[IndexedLine<'a>] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Read-only lookup over a [`LineTable`]; safe to share between threads.
#[derive(Debug, Clone)]
pub struct EvidenceLocator<'a> {
    table: LineTable<'a>,
    padding: f32,
    threshold: u8,
}

impl<'a> EvidenceLocator<'a> {
    pub fn new(lines: &'a [Line], config: &ReaderConfig) -> Self {
        Self {
            table: LineTable::new(lines),
            padding: config.evidence_bbox_padding,
            threshold: config.fuzzy_threshold,
        }
    }

    pub fn table(&self) -> &LineTable<'a> {
        &self.table
    }

    /// Smallest box on the query page containing or best matching the
    /// snippet. `None` is an ordinary outcome.
    pub fn locate(&self, query: &EvidenceQuery) -> Option<EvidenceMatch> {
        let snippet = normalize_for_match(&query.snippet);
        if snippet.chars().count() < MIN_SNIPPET_CHARS {
            debug!(page = query.page, "snippet too short to locate");
            return None;
        }

        let candidates: Vec<&IndexedLine<'a>> = match query.paragraph_bbox {
            Some(bbox) => {
                let scope = bbox.padded(self.padding);
                self.table
                    .page(query.page)
                    .iter()
                    .filter(|entry| entry.line.bbox.intersects(&scope))
                    .collect()
            }
            None => self.table.page(query.page).iter().collect(),
        };

        let found = self
            .containing_lines(&snippet, &candidates)
            .or_else(|| self.line_window(&snippet, &candidates))
            .or_else(|| self.best_partial(&snippet, &candidates));

        match &found {
            Some(bbox) => info!(page = query.page, ?bbox, "located evidence"),
            None => info!(
                page = query.page,
                candidates = candidates.len(),
                "evidence not located"
            ),
        }
        found.map(|bbox| EvidenceMatch {
            bbox,
            page: query.page,
        })
    }

    /// Union of every line that contains the snippet, is contained by it, or
    /// fuzzily matches it.
    fn containing_lines(&self, snippet: &str, candidates: &[&IndexedLine<'a>]) -> Option<BBox> {
        BBox::union_all(
            candidates
                .iter()
                .filter(|entry| {
                    let text = entry.normalized.as_str();
                    !text.is_empty()
                        && (snippet.contains(text)
                            || text.contains(snippet)
                            || partial_ratio(text, snippet) > self.threshold)
                })
                .map(|entry| &entry.line.bbox),
        )
    }

    /// First single line, then first run of 2 to 4 consecutive lines, whose
    /// joined text contains the snippet.
    fn line_window(&self, snippet: &str, candidates: &[&IndexedLine<'a>]) -> Option<BBox> {
        (1..=MAX_WINDOW_LINES).find_map(|size| {
            candidates.windows(size).find_map(|window| {
                let joined = window
                    .iter()
                    .map(|entry| entry.normalized.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.contains(snippet) {
                    BBox::union_all(window.iter().map(|entry| &entry.line.bbox))
                } else {
                    None
                }
            })
        })
    }

    fn best_partial(&self, snippet: &str, candidates: &[&IndexedLine<'a>]) -> Option<BBox> {
        candidates
            .iter()
            .map(|entry| (partial_ratio(&entry.normalized, snippet), entry))
            .max_by_key(|(score, _)| *score)
            .filter(|(score, _)| *score >= self.threshold)
            .map(|(_, entry)| entry.line.bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::text::word_count;
    use pretty_assertions::assert_eq;

    fn line(page: u32, text: &str, bbox: BBox) -> Line {
        Line {
            page,
            line_index: 0,
            text: text.to_string(),
            bbox,
            token_count: word_count(text),
            width: bbox.width(),
            height: bbox.height(),
            font_size: 10.0,
        }
    }

    fn contract() -> Vec<Line> {
        vec![
            line(1, "1. Term", BBox::new(72.0, 80.0, 120.0, 90.0)),
            line(
                1,
                "This Agreement shall terminate on",
                BBox::new(72.0, 100.0, 300.0, 110.0),
            ),
            line(1, "December 31, 2025.", BBox::new(72.0, 112.0, 180.0, 122.0)),
            line(
                1,
                "Payment is due within thirty days of each invoice.",
                BBox::new(72.0, 160.0, 420.0, 170.0),
            ),
            line(2, "December 31, 2025.", BBox::new(72.0, 100.0, 180.0, 110.0)),
        ]
    }

    #[test]
    fn snippet_across_two_lines_returns_their_union() {
        let lines = contract();
        let locator = EvidenceLocator::new(&lines, &ReaderConfig::default());
        let found = locator.locate(&EvidenceQuery::new(1, "shall terminate on December 31"));
        assert_eq!(
            found,
            Some(EvidenceMatch {
                bbox: BBox::new(72.0, 100.0, 300.0, 122.0),
                page: 1,
            })
        );
    }

    #[test]
    fn short_or_empty_snippets_fail() {
        let lines = contract();
        let locator = EvidenceLocator::new(&lines, &ReaderConfig::default());
        assert_eq!(locator.locate(&EvidenceQuery::new(1, "")), None);
        assert_eq!(locator.locate(&EvidenceQuery::new(1, "  a  ")), None);
    }

    #[test]
    fn substring_of_a_single_line() {
        let lines = contract();
        let locator = EvidenceLocator::new(&lines, &ReaderConfig::default());
        let found = locator.locate(&EvidenceQuery::new(1, "due within  THIRTY days"));
        assert_eq!(found.map(|m| m.bbox), Some(BBox::new(72.0, 160.0, 420.0, 170.0)));
    }

    #[test]
    fn paragraph_box_scopes_the_search() {
        let lines = contract();
        let locator = EvidenceLocator::new(&lines, &ReaderConfig::default());
        let query = EvidenceQuery::new(1, "Payment is due within thirty days").within(
            "This Agreement shall terminate on December 31, 2025.",
            BBox::new(72.0, 100.0, 300.0, 122.0),
        );
        assert_eq!(locator.locate(&query), None);
    }

    #[test]
    fn page_is_respected() {
        let lines = contract();
        let locator = EvidenceLocator::new(&lines, &ReaderConfig::default());
        let found = locator.locate(&EvidenceQuery::new(2, "december 31, 2025"));
        assert_eq!(
            found,
            Some(EvidenceMatch {
                bbox: BBox::new(72.0, 100.0, 180.0, 110.0),
                page: 2,
            })
        );
        assert_eq!(locator.locate(&EvidenceQuery::new(9, "december 31")), None);
    }

    #[test]
    fn unrelated_text_is_not_found() {
        let lines = contract();
        let locator = EvidenceLocator::new(&lines, &ReaderConfig::default());
        assert_eq!(
            locator.locate(&EvidenceQuery::new(1, "indemnification of third parties")),
            None
        );
        assert_eq!(locator.table().page_count(), 2);
    }
}
