use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;

use crate::core::config::ReaderConfig;
use crate::core::model::{DocumentLayout, EvidenceMatch, Line, Paragraph, Span};
use crate::evidence::{EvidenceLocator, EvidenceQuery};
use crate::export::json_export::JsonExporter;
use crate::export::text_export::TextExporter;
use crate::export::Exporter;
use crate::layout::line_builder::assemble_page_lines;
use crate::layout::line_filter::filter_lines;
use crate::layout::paragraph_filter::filter_paragraphs;
use crate::layout::segmenter::segment_page;
use crate::layout::group_by_page;
use crate::parser::{PdfReader, SpanSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub reader: ReaderConfig,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, reader: ReaderConfig) -> Self {
        Self {
            input,
            output,
            reader,
        }
    }
}

/// Span extraction through paragraph filtering for one document.
#[derive(Debug, Clone)]
pub struct LayoutPipeline {
    config: ReaderConfig,
}

impl LayoutPipeline {
    /// Rejects invalid configuration before any document is touched.
    pub fn new(config: ReaderConfig) -> crate::error::Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn process_file(&self, path: &Path) -> Result<DocumentLayout> {
        let reader = PdfReader::open(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.process(&reader)
    }

    pub fn process<S: SpanSource + ?Sized>(&self, source: &S) -> Result<DocumentLayout> {
        let spans = source
            .extract_spans(&self.config)
            .context("failed to extract text spans")?;
        Ok(self.process_spans(source.page_count(), spans))
    }

    /// Pages are assembled and segmented in parallel; line and paragraph
    /// de-duplication compare the whole document and run once.
    pub fn process_spans(&self, page_count: usize, spans: Vec<Span>) -> DocumentLayout {
        let span_count = spans.len();
        let tolerance = self.config.line_y_tolerance;
        let lines = per_page(group_by_page(spans, |span| span.page), |page, spans| {
            assemble_page_lines(page, &spans, tolerance)
        });
        let line_count = lines.len();
        let lines = filter_lines(lines);

        let paragraphs = per_page(
            group_by_page(lines.clone(), |line| line.page),
            |page, lines: Vec<Line>| segment_page(page, &lines),
        );
        let segmented = paragraphs.len();
        let outcome = filter_paragraphs(paragraphs, &self.config);

        info!(
            pages = page_count,
            spans = span_count,
            lines = line_count,
            kept_lines = lines.len(),
            paragraphs = segmented,
            kept_paragraphs = outcome.kept.len(),
            "layout reconstructed"
        );
        DocumentLayout {
            page_count,
            paragraphs: outcome.kept,
            lines,
        }
    }

    pub fn locate(&self, layout: &DocumentLayout, query: &EvidenceQuery) -> Option<EvidenceMatch> {
        EvidenceLocator::new(&layout.lines, &self.config).locate(query)
    }

    /// Paragraph-scoped lookup: the snippet is searched inside the box of
    /// the paragraph it was quoted from.
    pub fn locate_in_paragraph(
        &self,
        layout: &DocumentLayout,
        paragraph: &Paragraph,
        snippet: &str,
    ) -> Option<EvidenceMatch> {
        let query =
            EvidenceQuery::new(paragraph.page, snippet).within(paragraph.text(), paragraph.bbox);
        self.locate(layout, &query)
    }
}

/// Run `stage` on every page in parallel and flatten the results back into
/// page order.
fn per_page<T, U, F>(pages: BTreeMap<u32, Vec<T>>, stage: F) -> Vec<U>
where
    T: Send,
    U: Send,
    F: Fn(u32, Vec<T>) -> Vec<U> + Sync,
{
    let mut results: Vec<(u32, Vec<U>)> = pages
        .into_par_iter()
        .map(|(page, items)| (page, stage(page, items)))
        .collect();
    results.sort_by_key(|(page, _)| *page);
    results.into_iter().flat_map(|(_, items)| items).collect()
}

pub fn build_document(config: &PipelineConfig) -> Result<DocumentLayout> {
    let pipeline = LayoutPipeline::new(config.reader.clone())?;
    pipeline.process_file(&config.input)
}

pub fn export_document(
    document: &DocumentLayout,
    output: &Path,
    formats: &[ExportFormat],
) -> Result<()> {
    for format in formats {
        match format {
            ExportFormat::Json => JsonExporter::new(output.to_path_buf()).export(document)?,
            ExportFormat::Text => TextExporter::new(output.to_path_buf()).export(document)?,
        }
    }
    Ok(())
}
