//! Maps evidence snippets back onto page coordinates.

pub mod locator;

pub use locator::{EvidenceLocator, EvidenceQuery, LineTable};
