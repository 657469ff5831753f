use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;

/// Padding added to line and paragraph extents so that degenerate boxes
/// still have a positive width and height.
pub const EXTENT_EPSILON: f32 = 0.025;

/// Normalized RGB fill colour, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Unpack a `0xRRGGBB` integer colour.
    pub fn from_packed(color: u32) -> Self {
        let r = (color >> 16) & 255;
        let g = (color >> 8) & 255;
        let b = color & 255;
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

/// One run of text with uniform font and colour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Span {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
    pub bbox: BBox,
    pub font: String,
    pub font_size: f32,
    pub color: Rgb,
    pub token_count: usize,
}

impl Span {
    pub fn new(page: u32, text: impl Into<String>, bbox: BBox) -> Self {
        let text = text.into().trim().to_string();
        let token_count = text.split_whitespace().count();
        Self {
            page,
            text,
            bbox,
            font: String::new(),
            font_size: bbox.height(),
            color: Rgb::default(),
            token_count,
        }
    }

    pub fn with_font(mut self, font: impl Into<String>, font_size: f32) -> Self {
        self.font = font.into();
        self.font_size = font_size;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

/// Spans sharing a baseline, merged into one text unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    pub page: u32,
    /// 0-based position of the line on its page, assigned before filtering.
    pub line_index: usize,
    pub text: String,
    pub bbox: BBox,
    pub token_count: usize,
    pub width: f32,
    pub height: f32,
    /// Mean font size of the member spans.
    pub font_size: f32,
}

/// A block of consecutive lines grouped by the segmenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    pub page: u32,
    /// 0-based, dense and monotonic within a page.
    pub paragraph_index: usize,
    pub raw_text: String,
    pub clean_text: String,
    pub bbox: BBox,
    pub token_count: usize,
    pub width: f32,
    pub height: f32,
    pub duplicate_flag: bool,
    /// Document position of the paragraph whose similarity set last covered this one.
    pub repeated_with: Option<usize>,
    pub repetition_count: usize,
}

impl Paragraph {
    /// Text handed to downstream consumers: the cleaned text when present.
    pub fn text(&self) -> &str {
        if self.clean_text.is_empty() {
            &self.raw_text
        } else {
            &self.clean_text
        }
    }
}

/// A located evidence snippet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EvidenceMatch {
    pub bbox: BBox,
    pub page: u32,
}

/// Output of one document-processing pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub page_count: usize,
    pub paragraphs: Vec<Paragraph>,
    /// Filtered line table, queried by the evidence locator.
    pub lines: Vec<Line>,
}

impl DocumentLayout {
    pub fn paragraphs_on_page(&self, page: u32) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs.iter().filter(move |p| p.page == page)
    }

    pub fn lines_on_page(&self, page: u32) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(move |line| line.page == page)
    }
}

/// Width and height of a box plus [`EXTENT_EPSILON`].
pub fn padded_extent(bbox: &BBox) -> (f32, f32) {
    (
        bbox.x1 - bbox.x0 + EXTENT_EPSILON,
        bbox.y1 - bbox.y0 + EXTENT_EPSILON,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unpacks_integer_colour() {
        let color = Rgb::from_packed(0xFF8000);
        assert_eq!(color.r, 1.0);
        assert!((color.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.b, 0.0);
    }

    #[test]
    fn span_counts_tokens_after_trimming() {
        let span = Span::new(1, "  shall   terminate ", BBox::new(0.0, 0.0, 10.0, 12.0));
        assert_eq!(span.text, "shall   terminate");
        assert_eq!(span.token_count, 2);
        assert_eq!(span.font_size, 12.0);
    }

    #[test]
    fn extent_tolerates_zero_area() {
        let (w, h) = padded_extent(&BBox::new(4.0, 4.0, 4.0, 4.0));
        assert_eq!(w, 0.025);
        assert_eq!(h, 0.025);
    }
}
