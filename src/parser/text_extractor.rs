//! Walks a page content stream and emits positioned text runs.
//!
//! Glyph widths are not read from font programs; a run's width is estimated
//! from its character count and effective font size.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Document, Encoding, Object, ObjectId};
use tracing::debug;

use crate::core::config::ReaderConfig;
use crate::core::geometry::BBox;
use crate::core::model::{Rgb, Span};
use crate::error::Result;
use crate::parser::pdf_reader::{inherited_entry, number, resolve};

const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;
const ASCENT_RATIO: f32 = 0.8;
const DESCENT_RATIO: f32 = 0.2;
const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Stray tokens that extraction produces around punctuation and bullets.
const NOISE_TOKENS: &[&str] = &[",", "\"", ".", "o"];

/// A text run as drawn, before watermark and noise filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRun {
    pub text: String,
    pub bbox: BBox,
    pub font: String,
    pub font_size: f32,
    pub color: Rgb,
    pub opacity: f32,
    /// Index of the showing operator in the page's decoded content.
    pub op_index: usize,
}

impl RawRun {
    pub fn is_watermark(&self, config: &ReaderConfig) -> bool {
        self.opacity < 1.0 || self.font_size > config.watermark_font_size
    }
}

/// Drop watermark-like runs and extraction noise, turning the rest into spans.
pub fn runs_to_spans(page: u32, runs: Vec<RawRun>, config: &ReaderConfig) -> Vec<Span> {
    runs.into_iter()
        .filter(|run| !run.is_watermark(config))
        .filter_map(|run| {
            let text = run.text.trim();
            if text.is_empty() || NOISE_TOKENS.contains(&text) {
                return None;
            }
            Some(
                Span::new(page, text, run.bbox)
                    .with_font(run.font, run.font_size)
                    .with_color(run.color),
            )
        })
        .collect()
}

pub fn sort_spans(spans: &mut [Span]) {
    spans.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.bbox.y0.total_cmp(&b.bbox.y0))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: [f32; 6],
    fill: Rgb,
    opacity: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            fill: Rgb::default(),
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn advance(&mut self, text: &str) {
        let mut dx = 0.0;
        for ch in text.chars() {
            dx += self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale + self.char_spacing;
            if ch == ' ' {
                dx += self.word_spacing;
            }
        }
        self.shift(dx);
    }

    fn shift(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }
}

/// Per-font lookups for one page. Text is decoded through the font's
/// `Encoding` or `ToUnicode` map when lopdf can build one; fonts it cannot
/// map fall back to byte heuristics.
struct PageFonts<'a> {
    base_names: HashMap<Vec<u8>, String>,
    encodings: HashMap<Vec<u8>, Encoding<'a>>,
    identity_encoded: HashMap<Vec<u8>, bool>,
}

impl<'a> PageFonts<'a> {
    fn load(doc: &'a Document, page_id: ObjectId) -> Self {
        let mut base_names = HashMap::new();
        let mut encodings = HashMap::new();
        let mut identity_encoded = HashMap::new();
        if let Ok(fonts) = doc.get_page_fonts(page_id) {
            for (key, dict) in fonts {
                let base = dict
                    .get(b"BaseFont")
                    .ok()
                    .and_then(|obj| obj.as_name().ok())
                    .map(|name| String::from_utf8_lossy(name).into_owned())
                    .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
                let identity = matches!(
                    dict.get(b"Encoding"),
                    Ok(Object::Name(name)) if name.starts_with(b"Identity")
                );
                match dict.get_font_encoding(doc) {
                    Ok(encoding) => {
                        encodings.insert(key.clone(), encoding);
                    }
                    Err(err) => debug!(font = %base, "no usable font encoding: {err}"),
                }
                base_names.insert(key.clone(), base);
                identity_encoded.insert(key, identity);
            }
        }
        Self {
            base_names,
            encodings,
            identity_encoded,
        }
    }

    fn decode(&self, font_key: &[u8], bytes: &[u8]) -> String {
        if let Some(encoding) = self.encodings.get(font_key) {
            if let Ok(text) = Document::decode_text(encoding, bytes) {
                return text;
            }
        }
        let identity = self
            .identity_encoded
            .get(font_key)
            .copied()
            .unwrap_or(false);
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }
        decode_text_simple(bytes)
    }
}

/// Decode PDF string bytes: UTF-16BE with BOM, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Fill opacity (`ca`) of every named ExtGState in the page resources.
fn page_opacities(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, f32> {
    let mut opacities = HashMap::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return opacities;
    };
    let Some(Object::Dictionary(resources)) = inherited_entry(doc, page, b"Resources") else {
        return opacities;
    };
    let Some(Object::Dictionary(states)) = resources
        .get(b"ExtGState")
        .ok()
        .and_then(|obj| resolve(doc, obj))
    else {
        return opacities;
    };
    for (name, obj) in states.iter() {
        if let Some(Object::Dictionary(state)) = resolve(doc, obj) {
            if let Some(alpha) = state.get(b"ca").ok().and_then(number) {
                opacities.insert(name.clone(), alpha);
            }
        }
    }
    opacities
}

fn multiply(m: [f32; 6], n: [f32; 6]) -> [f32; 6] {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).collect()
}

fn fill_from_components(components: &[f32]) -> Option<Rgb> {
    match components {
        [gray] => Some(Rgb::new(*gray, *gray, *gray)),
        [r, g, b] => Some(Rgb::new(*r, *g, *b)),
        [c, m, y, k] => Some(Rgb::new(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )),
        _ => None,
    }
}

struct RunEmitter<'a> {
    fonts: &'a PageFonts<'a>,
    media_box: [f32; 4],
    op_index: usize,
    runs: Vec<RawRun>,
}

impl RunEmitter<'_> {
    fn emit(&mut self, text: &str, origin: [f32; 6], state: &TextState, gfx: &GraphicsState) {
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return;
        }
        let rendering = multiply(origin, gfx.ctm);
        let scale_y = (rendering[2].powi(2) + rendering[3].powi(2)).sqrt();
        let scale_x = (rendering[0].powi(2) + rendering[1].powi(2)).sqrt();
        let font_size = (state.font_size * scale_y).abs();
        let width = trimmed.chars().count() as f32
            * state.font_size
            * APPROX_CHAR_WIDTH_RATIO
            * state.horiz_scale
            * scale_x;

        let baseline_x = rendering[4];
        let baseline_y = rendering[5] + state.rise * scale_y;
        let [llx, _, _, ury] = self.media_box;
        let bbox = BBox::new(
            baseline_x - llx,
            ury - (baseline_y + font_size * ASCENT_RATIO),
            baseline_x - llx + width.abs(),
            ury - (baseline_y - font_size * DESCENT_RATIO),
        );

        self.runs.push(RawRun {
            text: trimmed.to_string(),
            bbox,
            font: state.font_name.clone(),
            font_size,
            color: gfx.fill,
            opacity: gfx.opacity,
            op_index: self.op_index,
        });
    }

    fn show_string(&mut self, bytes: &[u8], state: &mut TextState, gfx: &GraphicsState) {
        let text = self.fonts.decode(&state.font_key, bytes);
        let origin = state.text_matrix;
        self.emit(&text, origin, state, gfx);
        state.advance(&text);
    }

    fn show_array(&mut self, items: &[Object], state: &mut TextState, gfx: &GraphicsState) {
        let mut buf = String::new();
        let mut origin = state.text_matrix;
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let fragment = self.fonts.decode(&state.font_key, bytes);
                    if buf.is_empty() {
                        origin = state.text_matrix;
                    }
                    buf.push_str(&fragment);
                    state.advance(&fragment);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        let dx = -adjust / 1000.0 * state.font_size * state.horiz_scale;
                        let gap = state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
                        if dx > gap && !buf.is_empty() && !buf.ends_with(' ') {
                            buf.push(' ');
                        }
                        state.shift(dx);
                    }
                }
            }
        }
        self.emit(&buf, origin, state, gfx);
    }
}

/// Every text run drawn on one page, in content-stream order.
pub fn extract_page_runs(
    doc: &Document,
    page_id: ObjectId,
    media_box: [f32; 4],
) -> Result<Vec<RawRun>> {
    let data = doc.get_page_content(page_id)?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let content = Content::decode(&data)?;
    let fonts = PageFonts::load(doc, page_id);
    let opacities = page_opacities(doc, page_id);

    let mut emitter = RunEmitter {
        fonts: &fonts,
        media_box,
        op_index: 0,
        runs: Vec::new(),
    };
    let mut gfx = GraphicsState::default();
    let mut saved: Vec<GraphicsState> = Vec::new();
    let mut state = TextState::default();

    for (index, op) in content.operations.iter().enumerate() {
        emitter.op_index = index;
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => saved.push(gfx.clone()),
            "Q" => {
                if let Some(previous) = saved.pop() {
                    gfx = previous;
                }
            }
            "cm" => {
                if let &[a, b, c, d, e, f] = numbers(operands).as_slice() {
                    gfx.ctm = multiply([a, b, c, d, e, f], gfx.ctm);
                }
            }
            "gs" => {
                if let Some(Ok(name)) = operands.first().map(Object::as_name) {
                    if let Some(alpha) = opacities.get(name) {
                        gfx.opacity = *alpha;
                    }
                }
            }
            "rg" | "g" | "k" | "sc" | "scn" => {
                if let Some(fill) = fill_from_components(&numbers(operands)) {
                    gfx.fill = fill;
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let [Object::Name(key), size, ..] = operands {
                    state.font_size = number(size).unwrap_or(0.0);
                    state.font_name = fonts
                        .base_names
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| String::from_utf8_lossy(key).into_owned());
                    state.font_key = key.clone();
                }
            }
            "Tm" => {
                if let &[a, b, c, d, e, f] = numbers(operands).as_slice() {
                    state.text_matrix = [a, b, c, d, e, f];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" => {
                if let &[tx, ty] = numbers(operands).as_slice() {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let &[tx, ty] = numbers(operands).as_slice() {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.translate_line(0.0, -state.leading),
            "TL" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.rise = v;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    emitter.show_string(bytes, &mut state, &gfx);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    emitter.show_array(items, &mut state, &gfx);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    emitter.show_string(bytes, &mut state, &gfx);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _)] = operands {
                    state.word_spacing = number(aw).unwrap_or(state.word_spacing);
                    state.char_spacing = number(ac).unwrap_or(state.char_spacing);
                    state.translate_line(0.0, -state.leading);
                    emitter.show_string(bytes, &mut state, &gfx);
                }
            }
            _ => {}
        }
    }

    Ok(emitter.runs)
}
