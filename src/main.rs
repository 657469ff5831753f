use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use parabox::catalog::DocumentCatalog;
use parabox::export::watermark::default_clean_path;
use parabox::export::{draw_boxes, strip_watermarks};
use parabox::layout::region::lines_in_region;
use parabox::parser::{PdfReader, SpanSource};
use parabox::pipeline::{export_document, ExportFormat, LayoutPipeline};
use parabox::{BBox, EvidenceQuery, ReaderConfig};

#[derive(Parser, Debug)]
#[command(name = "parabox")]
#[command(version, about = "Paragraph reconstruction and evidence location for text-layer PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconstruct paragraphs and export them
    Paragraphs {
        /// Input PDF file path
        input: PathBuf,

        /// Output directory (default: ./<input_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format(s) to generate
        #[arg(short, long, value_enum, default_values_t = vec![Format::Json])]
        format: Vec<Format>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Find the box of an evidence snippet on a page
    Locate {
        input: PathBuf,

        /// 1-based page number
        #[arg(long)]
        page: u32,

        /// Text to locate
        #[arg(long)]
        snippet: String,

        /// Paragraph the snippet was quoted from
        #[arg(long)]
        paragraph_text: Option<String>,

        /// Paragraph box as x0,y0,x1,y1 to scope the search
        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<BBox>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Merge the lines inside a region into one text record
    Region {
        input: PathBuf,

        #[arg(long)]
        page: u32,

        /// Region as x,y,width,height
        #[arg(long, value_parser = parse_region)]
        bbox: BBox,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Draw paragraph boxes onto a copy of the PDF
    Overlay {
        input: PathBuf,

        /// Output PDF path
        #[arg(short, long)]
        output: PathBuf,

        /// Draw line boxes instead of paragraph boxes
        #[arg(long)]
        lines: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Write a copy of the PDF without its watermark text
    Clean {
        input: PathBuf,

        /// Output PDF path (default: <input_stem>_wo_watermarks.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Show information about a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,
    },

    /// List the PDF documents under a directory
    Catalog {
        root: PathBuf,
    },
}

#[derive(Args, Debug)]
struct Tuning {
    /// JSON file with reader settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    min_words: Option<usize>,

    #[arg(long)]
    max_repetitions: Option<usize>,

    #[arg(long)]
    line_tolerance: Option<f32>,
}

impl Tuning {
    fn reader_config(&self) -> Result<ReaderConfig> {
        let mut config = match &self.config {
            Some(path) => ReaderConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => ReaderConfig::default(),
        };
        if let Some(min_words) = self.min_words {
            config.min_words_per_paragraph = min_words;
        }
        if let Some(max_repetitions) = self.max_repetitions {
            config.max_paragraph_repetitions = max_repetitions;
        }
        if let Some(tolerance) = self.line_tolerance {
            config.line_y_tolerance = tolerance;
        }
        Ok(config)
    }

    fn pipeline(&self) -> Result<LayoutPipeline> {
        Ok(LayoutPipeline::new(self.reader_config()?)?)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Json,
    Text,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Text => ExportFormat::Text,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Paragraphs {
            input,
            output,
            format,
            tuning,
        } => run_paragraphs(input, output, format, &tuning),
        Commands::Locate {
            input,
            page,
            snippet,
            paragraph_text,
            bbox,
            tuning,
        } => {
            let query = EvidenceQuery {
                paragraph_text: paragraph_text.unwrap_or_default(),
                snippet,
                page,
                paragraph_bbox: bbox,
            };
            run_locate(&input, &query, &tuning)
        }
        Commands::Region {
            input,
            page,
            bbox,
            tuning,
        } => run_region(&input, page, &bbox, &tuning),
        Commands::Overlay {
            input,
            output,
            lines,
            tuning,
        } => run_overlay(&input, &output, lines, &tuning),
        Commands::Clean {
            input,
            output,
            tuning,
        } => run_clean(&input, output, &tuning),
        Commands::Info { input } => show_info(&input),
        Commands::Catalog { root } => list_catalog(root),
    }
}

fn require_file(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    Ok(())
}

fn run_paragraphs(
    input: PathBuf,
    output: Option<PathBuf>,
    formats: Vec<Format>,
    tuning: &Tuning,
) -> Result<()> {
    require_file(&input)?;
    let output_dir = match output {
        Some(dir) => dir,
        None => {
            let stem = input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            PathBuf::from(format!("{stem}_output"))
        }
    };

    println!("[*] Processing: {}", input.display());
    println!("[*] Output: {}", output_dir.display());

    let layout = tuning
        .pipeline()?
        .process_file(&input)
        .with_context(|| format!("Failed to process PDF: {}", input.display()))?;

    println!(
        "[+] {} paragraph(s), {} line(s) over {} page(s)",
        layout.paragraphs.len(),
        layout.lines.len(),
        layout.page_count
    );

    let formats: Vec<ExportFormat> = formats.into_iter().map(ExportFormat::from).collect();
    export_document(&layout, &output_dir, &formats)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    println!("[✓] Done! Results saved to: {}", output_dir.display());
    Ok(())
}

fn run_locate(input: &Path, query: &EvidenceQuery, tuning: &Tuning) -> Result<()> {
    require_file(input)?;
    let pipeline = tuning.pipeline()?;
    let layout = pipeline
        .process_file(input)
        .with_context(|| format!("Failed to process PDF: {}", input.display()))?;
    let found = pipeline.locate(&layout, query);
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

fn run_region(input: &Path, page: u32, region: &BBox, tuning: &Tuning) -> Result<()> {
    require_file(input)?;
    let layout = tuning
        .pipeline()?
        .process_file(input)
        .with_context(|| format!("Failed to process PDF: {}", input.display()))?;
    let merged = lines_in_region(&layout.lines, page, region);
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

fn run_overlay(input: &Path, output: &Path, lines: bool, tuning: &Tuning) -> Result<()> {
    require_file(input)?;
    let layout = tuning
        .pipeline()?
        .process_file(input)
        .with_context(|| format!("Failed to process PDF: {}", input.display()))?;
    let boxes: Vec<(u32, BBox)> = if lines {
        layout.lines.iter().map(|line| (line.page, line.bbox)).collect()
    } else {
        layout
            .paragraphs
            .iter()
            .map(|paragraph| (paragraph.page, paragraph.bbox))
            .collect()
    };
    let drawn = draw_boxes(input, &boxes, output)?;
    println!("[✓] Drew {drawn} box(es) into {}", output.display());
    Ok(())
}

fn run_clean(input: &Path, output: Option<PathBuf>, tuning: &Tuning) -> Result<()> {
    require_file(input)?;
    let config = tuning.reader_config()?.validated()?;
    let output = output.unwrap_or_else(|| default_clean_path(input));
    println!("[*] Removing watermarks from {}", input.display());
    let removed = strip_watermarks(input, &output, &config)?;
    println!("[✓] Removed {removed} watermark run(s), wrote {}", output.display());
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    require_file(input)?;
    let reader =
        PdfReader::open(input).with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", reader.page_count());
    Ok(())
}

fn list_catalog(root: PathBuf) -> Result<()> {
    let mut catalog = DocumentCatalog::new(root);
    catalog
        .initialize()
        .with_context(|| format!("Failed to scan: {}", catalog.root().display()))?;
    if !catalog.is_initialized() {
        anyhow::bail!("Document root does not exist: {}", catalog.root().display());
    }
    for id in catalog.documents() {
        if let Some(path) = catalog.path(id) {
            println!("{id}\t{}", path.display());
        }
    }
    println!("[*] {} document(s)", catalog.len());
    Ok(())
}

fn parse_floats<const N: usize>(value: &str) -> Result<[f32; N], String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|err| format!("invalid number: {err}"))?;
    parts
        .try_into()
        .map_err(|_| format!("expected {N} comma-separated numbers"))
}

fn parse_bbox(value: &str) -> Result<BBox, String> {
    let [x0, y0, x1, y1] = parse_floats::<4>(value)?;
    Ok(BBox::new(x0, y0, x1, y1))
}

fn parse_region(value: &str) -> Result<BBox, String> {
    let [x, y, width, height] = parse_floats::<4>(value)?;
    Ok(BBox::from_region(x, y, width, height))
}
