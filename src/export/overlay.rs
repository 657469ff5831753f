//! Draws layout boxes onto a copy of the source PDF for visual review.

use std::path::Path;

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use tracing::{info, warn};

use crate::core::geometry::BBox;
use crate::parser::PdfReader;

const STROKE_WIDTH: f32 = 0.7;

/// Stroke every `(page, bbox)` pair as a red rectangle and save the result to
/// `output`. Boxes are in top-left page space. Returns the number of boxes
/// drawn.
pub fn draw_boxes(input: &Path, boxes: &[(u32, BBox)], output: &Path) -> Result<usize> {
    let reader =
        PdfReader::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let pages = reader.pages();
    let mut targets: Vec<(ObjectId, [f32; 4], Vec<BBox>)> = Vec::new();
    for (page, page_id) in &pages {
        let page_boxes: Vec<BBox> = boxes
            .iter()
            .filter(|(p, _)| p == page)
            .map(|(_, bbox)| *bbox)
            .collect();
        if !page_boxes.is_empty() {
            targets.push((*page_id, reader.media_box(*page_id), page_boxes));
        }
    }
    let skipped = boxes
        .iter()
        .filter(|(page, _)| !pages.contains_key(page))
        .count();
    if skipped > 0 {
        warn!(skipped, "boxes reference pages missing from the document");
    }

    let mut doc = reader.into_document();
    let mut drawn = 0;
    for (page_id, media_box, page_boxes) in targets {
        let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let overlay = Content {
            operations: rectangle_ops(&page_boxes, media_box),
        };
        let overlay = doc.add_object(Stream::new(Dictionary::new(), overlay.encode()?));
        append_contents(&mut doc, page_id, save, overlay)?;
        drawn += page_boxes.len();
    }

    doc.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(drawn, output = %output.display(), "overlay written");
    Ok(drawn)
}

fn rectangle_ops(boxes: &[BBox], media_box: [f32; 4]) -> Vec<Operation> {
    let [llx, _, _, ury] = media_box;
    let mut ops = vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new("RG", vec![Object::Real(1.0), Object::Real(0.0), Object::Real(0.0)]),
        Operation::new("w", vec![Object::Real(STROKE_WIDTH)]),
    ];
    for bbox in boxes {
        ops.push(Operation::new(
            "re",
            vec![
                Object::Real(bbox.x0 + llx),
                Object::Real(ury - bbox.y1),
                Object::Real(bbox.width()),
                Object::Real(bbox.height()),
            ],
        ));
        ops.push(Operation::new("S", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Wrap the page's existing content in `q`/`Q` and append the overlay, so a
/// transform left active by the page cannot move the boxes.
fn append_contents(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    save: ObjectId,
    overlay: ObjectId,
) -> Result<()> {
    let mut contents = vec![Object::Reference(save)];
    contents.extend(existing_contents(doc, page_id)?);
    contents.push(Object::Reference(overlay));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// The page's content streams as a flat list of entries. `/Contents` may
/// point at an array object instead of holding the array inline.
fn existing_contents(doc: &lopdf::Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let contents = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rectangles_are_flipped_back_to_pdf_space() {
        let boxes = [BBox::new(72.0, 100.0, 300.0, 122.0)];
        let ops = rectangle_ops(&boxes, [0.0, 0.0, 612.0, 792.0]);
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, vec!["Q", "q", "RG", "w", "re", "S", "Q"]);

        let operands: Vec<f32> = ops[4]
            .operands
            .iter()
            .filter_map(|obj| obj.as_float().ok())
            .collect();
        assert_eq!(operands, vec![72.0, 670.0, 228.0, 22.0]);
    }

    #[test]
    fn referenced_contents_array_is_spliced() {
        use lopdf::{dictionary, Document};

        let mut doc = Document::with_version("1.5");
        let first = doc.add_object(Stream::new(Dictionary::new(), b"BT ET".to_vec()));
        let second = doc.add_object(Stream::new(Dictionary::new(), b"BT ET".to_vec()));
        let array = doc.add_object(Object::Array(vec![
            Object::Reference(first),
            Object::Reference(second),
        ]));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Contents" => array,
        });
        let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let overlay = doc.add_object(Stream::new(Dictionary::new(), b"Q".to_vec()));

        append_contents(&mut doc, page_id, save, overlay).unwrap();
        let contents = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(
            contents,
            vec![
                Object::Reference(save),
                Object::Reference(first),
                Object::Reference(second),
                Object::Reference(overlay),
            ]
        );
        assert_eq!(doc.get_page_contents(page_id), vec![save, first, second, overlay]);
    }
}
