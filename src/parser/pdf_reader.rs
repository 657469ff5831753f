use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::core::config::ReaderConfig;
use crate::core::geometry::BBox;
use crate::core::model::Span;
use crate::error::{LayoutError, Result};
use crate::parser::text_extractor::{extract_page_runs, runs_to_spans, sort_spans};
use crate::parser::SpanSource;

/// US Letter, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

pub struct PdfReader {
    path: Option<PathBuf>,
    doc: Document,
}

impl PdfReader {
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = Self::from_bytes(&data)?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(LayoutError::Encrypted);
        }
        Ok(Self { path: None, doc })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// 1-based page number to page object id.
    pub fn pages(&self) -> BTreeMap<u32, ObjectId> {
        self.doc.get_pages()
    }

    /// Page box as `[llx, lly, urx, ury]`, inherited from the page tree.
    pub fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let Ok(page) = self.doc.get_dictionary(page_id) else {
            return DEFAULT_MEDIA_BOX;
        };
        let Some(Object::Array(values)) = inherited_entry(&self.doc, page, b"MediaBox") else {
            return DEFAULT_MEDIA_BOX;
        };
        let nums: Vec<f32> = values
            .iter()
            .filter_map(|obj| resolve(&self.doc, obj).and_then(number))
            .collect();
        match nums.as_slice() {
            [x0, y0, x1, y1] => [x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)],
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    /// Page box converted to the top-left origin used everywhere else.
    pub fn page_bbox(&self, page_id: ObjectId) -> BBox {
        let [llx, lly, urx, ury] = self.media_box(page_id);
        BBox::new(0.0, 0.0, urx - llx, ury - lly)
    }
}

impl SpanSource for PdfReader {
    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn extract_spans(&self, config: &ReaderConfig) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        for (page_num, page_id) in self.pages() {
            let media_box = self.media_box(page_id);
            let runs = match extract_page_runs(&self.doc, page_id, media_box) {
                Ok(runs) => runs,
                Err(err) => {
                    warn!(page = page_num, error = %err, "skipping page with unreadable content");
                    continue;
                }
            };
            let run_count = runs.len();
            let page_spans = runs_to_spans(page_num, runs, config);
            debug!(
                page = page_num,
                runs = run_count,
                kept = page_spans.len(),
                "extracted text runs"
            );
            spans.extend(page_spans);
        }
        sort_spans(&mut spans);
        Ok(spans)
    }
}

/// Resolve a possibly indirect object.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up `key` on a page dictionary, walking up `Parent` links for
/// inheritable attributes such as `Resources` and `MediaBox`.
pub(crate) fn inherited_entry<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dict;
    // Page trees are shallow; the bound only guards against reference cycles.
    for _ in 0..32 {
        if let Ok(obj) = current.get(key) {
            return resolve(doc, obj);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}
