use crate::core::geometry::BBox;
use crate::core::model::{padded_extent, Line, Span};
use crate::core::text::{collapse_whitespace, word_count};

/// Merge one page's spans into visual lines.
///
/// Spans are visited in `(y0, x0)` order. A span joins the current line when
/// its `y0` is within `y_tolerance` of the `y0` of the span that opened it.
pub fn assemble_page_lines(page: u32, spans: &[Span], y_tolerance: f32) -> Vec<Line> {
    let mut ordered: Vec<&Span> = spans.iter().filter(|s| s.token_count > 0).collect();
    ordered.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines = Vec::new();
    let mut current: Vec<&Span> = Vec::new();
    let mut reference_y: Option<f32> = None;

    for span in ordered {
        let starts_line = match reference_y {
            None => true,
            Some(y) => (span.bbox.y0 - y).abs() > y_tolerance,
        };
        if starts_line {
            if !current.is_empty() {
                lines.push(flush_line(page, lines.len(), &current));
                current.clear();
            }
            reference_y = Some(span.bbox.y0);
        }
        current.push(span);
    }
    if !current.is_empty() {
        lines.push(flush_line(page, lines.len(), &current));
    }

    lines
}

fn flush_line(page: u32, line_index: usize, spans: &[&Span]) -> Line {
    let joined = spans
        .iter()
        .map(|span| span.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let text = collapse_whitespace(&joined);
    let bbox = BBox::union_all(spans.iter().map(|span| &span.bbox))
        .unwrap_or_else(|| BBox::new(0.0, 0.0, 0.0, 0.0));
    let (width, height) = padded_extent(&bbox);
    let font_size = spans.iter().map(|span| span.font_size).sum::<f32>() / spans.len() as f32;

    Line {
        page,
        line_index,
        token_count: word_count(&text),
        text,
        bbox,
        width,
        height,
        font_size,
    }
}
