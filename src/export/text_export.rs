use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::DocumentLayout;
use crate::export::Exporter;

/// Plain-text dump of the kept paragraphs, grouped by page.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn render(document: &DocumentLayout) -> String {
        let mut text = String::new();
        let mut current_page = None;
        for paragraph in &document.paragraphs {
            if current_page != Some(paragraph.page) {
                if current_page.is_some() {
                    text.push('\n');
                }
                let _ = writeln!(text, "=== Page {} ===\n", paragraph.page);
                current_page = Some(paragraph.page);
            }
            let bbox = paragraph.bbox;
            let _ = writeln!(
                text,
                "[{}] ({:.1}, {:.1}, {:.1}, {:.1})\n{}\n",
                paragraph.paragraph_index,
                bbox.x0,
                bbox.y0,
                bbox.x1,
                bbox.y1,
                paragraph.text()
            );
        }
        text
    }
}

impl Exporter for TextExporter {
    fn export(&self, document: &DocumentLayout) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("paragraphs.txt");
        fs::write(&path, Self::render(document))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
