//! Spans to lines to paragraphs.
//!
//! Line assembly and paragraph segmentation only look at one page at a time.
//! Line de-duplication and paragraph filtering compare the whole document.

pub mod cues;
pub mod line_builder;
pub mod line_filter;
pub mod page_stats;
pub mod paragraph_filter;
pub mod region;
pub mod segmenter;

use std::collections::BTreeMap;

/// Group items by page number, keeping their relative order.
pub fn group_by_page<T, F>(items: Vec<T>, page_of: F) -> BTreeMap<u32, Vec<T>>
where
    F: Fn(&T) -> u32,
{
    let mut pages: BTreeMap<u32, Vec<T>> = BTreeMap::new();
    for item in items {
        pages.entry(page_of(&item)).or_default().push(item);
    }
    pages
}
