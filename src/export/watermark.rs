//! Writes a copy of a PDF with its watermark text removed.
//!
//! Watermarks are detected with the same rule the span reader uses, so the
//! cleaned copy drops exactly the runs that never reach layout. Only the
//! showing operators are removed; images, vector graphics and the rest of
//! the text stay untouched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use tracing::{debug, info, warn};

use crate::core::config::ReaderConfig;
use crate::parser::text_extractor::extract_page_runs;
use crate::parser::PdfReader;

const CLEAN_SUFFIX: &str = "_wo_watermarks";

/// `<dir>/<stem>_wo_watermarks.pdf` next to `input`.
pub fn default_clean_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}{CLEAN_SUFFIX}.pdf"))
}

/// Remove every watermark run from `input` and save the result to `output`.
/// Returns the number of runs removed.
pub fn strip_watermarks(input: &Path, output: &Path, config: &ReaderConfig) -> Result<usize> {
    let reader =
        PdfReader::open(input).with_context(|| format!("failed to open {}", input.display()))?;

    let mut rewrites: Vec<(ObjectId, Vec<u8>)> = Vec::new();
    let mut removed = 0;
    for (page, page_id) in reader.pages() {
        let doc = reader.document();
        let runs = match extract_page_runs(doc, page_id, reader.media_box(page_id)) {
            Ok(runs) => runs,
            Err(err) => {
                warn!(page, "page content left as is: {err}");
                continue;
            }
        };
        let marked: HashSet<usize> = runs
            .iter()
            .filter(|run| run.is_watermark(config))
            .map(|run| run.op_index)
            .collect();
        if marked.is_empty() {
            continue;
        }

        let content = Content::decode(&doc.get_page_content(page_id)?)?;
        let operations: Vec<_> = content
            .operations
            .into_iter()
            .enumerate()
            .flat_map(|(index, op)| {
                if marked.contains(&index) {
                    without_text(op)
                } else {
                    vec![op]
                }
            })
            .collect();
        debug!(page, runs = marked.len(), "watermark runs removed");
        removed += marked.len();
        rewrites.push((page_id, Content { operations }.encode()?));
    }

    let mut doc = reader.into_document();
    for (page_id, content) in rewrites {
        let stream = doc.add_object(Stream::new(Dictionary::new(), content));
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Reference(stream));
    }
    doc.prune_objects();

    doc.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(removed, output = %output.display(), "watermark-free copy written");
    Ok(removed)
}

/// Replace a showing operator with the line moves it implies.
fn without_text(op: Operation) -> Vec<Operation> {
    match op.operator.as_str() {
        "'" => vec![Operation::new("T*", vec![])],
        "\"" => match op.operands.as_slice() {
            [aw, ac, _] => vec![
                Operation::new("Tw", vec![aw.clone()]),
                Operation::new("Tc", vec![ac.clone()]),
                Operation::new("T*", vec![]),
            ],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_path_sits_next_to_input() {
        assert_eq!(
            default_clean_path(Path::new("/data/lease.pdf")),
            PathBuf::from("/data/lease_wo_watermarks.pdf")
        );
    }

    #[test]
    fn quote_operators_keep_their_line_move() {
        let op = Operation::new(
            "\"",
            vec![
                Object::Integer(2),
                Object::Integer(1),
                Object::string_literal("DRAFT"),
            ],
        );
        let names: Vec<String> = without_text(op).into_iter().map(|op| op.operator).collect();
        assert_eq!(names, vec!["Tw", "Tc", "T*"]);

        let op = Operation::new("'", vec![Object::string_literal("DRAFT")]);
        assert_eq!(without_text(op).len(), 1);
        assert!(without_text(Operation::new("Tj", vec![])).is_empty());
    }
}
