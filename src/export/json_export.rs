use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::geometry::BBox;
use crate::core::model::{DocumentLayout, Paragraph};
use crate::export::Exporter;

/// The record the relation builder consumes for every paragraph.
#[derive(Debug, Serialize)]
struct ParagraphRecord<'a> {
    page: u32,
    paragraph_index: usize,
    text: &'a str,
    bbox: BBox,
    width: f32,
    height: f32,
}

impl<'a> From<&'a Paragraph> for ParagraphRecord<'a> {
    fn from(paragraph: &'a Paragraph) -> Self {
        Self {
            page: paragraph.page,
            paragraph_index: paragraph.paragraph_index,
            text: paragraph.text(),
            bbox: paragraph.bbox,
            width: paragraph.width,
            height: paragraph.height,
        }
    }
}

/// Writes `paragraphs.json` and the filtered line table as `lines.json`.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, document: &DocumentLayout) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        let records: Vec<ParagraphRecord<'_>> =
            document.paragraphs.iter().map(ParagraphRecord::from).collect();
        let path = self.out_dir.join("paragraphs.json");
        fs::write(&path, serde_json::to_string_pretty(&records)?)
            .with_context(|| format!("failed to write {}", path.display()))?;

        let path = self.out_dir.join("lines.json");
        fs::write(&path, serde_json::to_string_pretty(&document.lines)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
