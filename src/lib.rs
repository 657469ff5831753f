pub mod catalog;
pub mod core;
pub mod error;
pub mod evidence;
pub mod export;
pub mod layout;
pub mod parser;
pub mod pipeline;

pub use crate::core::config::ReaderConfig;
pub use crate::core::geometry::BBox;
pub use crate::core::model::{DocumentLayout, EvidenceMatch, Line, Paragraph, Span};
pub use error::LayoutError;
pub use evidence::{EvidenceLocator, EvidenceQuery};
pub use pipeline::LayoutPipeline;
