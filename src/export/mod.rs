pub mod json_export;
pub mod overlay;
pub mod text_export;
pub mod watermark;

use anyhow::Result;

use crate::core::model::DocumentLayout;

pub use json_export::JsonExporter;
pub use overlay::draw_boxes;
pub use text_export::TextExporter;
pub use watermark::strip_watermarks;

pub trait Exporter {
    fn export(&self, document: &DocumentLayout) -> Result<()>;
}
