pub mod pdf_reader;
pub mod text_extractor;

pub use pdf_reader::PdfReader;

use crate::core::config::ReaderConfig;
use crate::core::model::Span;
use crate::error::Result;

/// Anything that can produce positioned text runs for a document.
pub trait SpanSource {
    fn page_count(&self) -> usize;

    /// Every kept span of the document, sorted by `(page, y0, x0)`.
    fn extract_spans(&self, config: &ReaderConfig) -> Result<Vec<Span>>;
}
