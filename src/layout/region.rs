use serde::Serialize;

use crate::core::geometry::BBox;
use crate::core::model::Line;
use crate::core::text::collapse_whitespace;

/// Text of every line fully inside a region, merged into one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionText {
    pub page: u32,
    pub text: String,
    pub clean_text: String,
}

/// Merge the lines of `page` that lie entirely inside `region`.
pub fn lines_in_region(lines: &[Line], page: u32, region: &BBox) -> RegionText {
    let inside: Vec<&Line> = lines
        .iter()
        .filter(|line| line.page == page && region.contains(&line.bbox))
        .collect();
    RegionText {
        page,
        text: inside
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        clean_text: inside
            .iter()
            .map(|line| collapse_whitespace(&line.text))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
