//! Content stream interpretation.
//!
//! Executes page operators against a graphics state and records what a page
//! paints: image placements, vector paths with their paint, and positioned
//! text spans. Everything is emitted in page space (top-left origin).

use std::collections::{HashMap, HashSet};

use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::geometry::{Matrix, PathSegment, Point};
use crate::model::{Color, FillRule, ObjectId, Paint, RasterImage, VectorPrimitive};

use super::backend::{
    ContentOp, FontMetrics, PageId, PdfBackend, PdfValue, ResourceScope, XObjectRef,
};
use super::layout::{is_spaceless_script_char, TextSpan};

/// Nesting limit for form XObjects.
const MAX_FORM_DEPTH: usize = 12;

/// TJ adjustments (thousandths of an em) wide enough to read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Approximate ascent and descent as fractions of the font size.
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

/// What a content stream painted.
#[derive(Debug, Default)]
pub struct PageContent {
    pub images: Vec<RasterImage>,
    pub drawings: Vec<VectorPrimitive>,
    pub spans: Vec<TextSpan>,
}

#[derive(Debug, Clone)]
struct TextParams {
    font: Option<Vec<u8>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Color,
    stroke: Color,
    line_width: f64,
    text: TextParams,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            text: TextParams::default(),
        }
    }
}

/// Path under construction, already in page space.
#[derive(Debug, Default)]
struct PathBuilder {
    segments: Vec<PathSegment>,
    current: Option<Point>,
    start: Option<Point>,
}

impl PathBuilder {
    fn move_to(&mut self, p: Point) {
        self.segments.push(PathSegment::MoveTo(p));
        self.current = Some(p);
        self.start = Some(p);
    }

    fn line_to(&mut self, p: Point) {
        if self.current.is_none() {
            self.move_to(p);
            return;
        }
        self.segments.push(PathSegment::LineTo(p));
        self.current = Some(p);
    }

    fn curve_to(&mut self, c1: Point, c2: Point, p: Point) {
        if self.current.is_none() {
            self.move_to(c1);
        }
        self.segments.push(PathSegment::CurveTo(c1, c2, p));
        self.current = Some(p);
    }

    fn close(&mut self) {
        if self.current.is_some() {
            self.segments.push(PathSegment::Close);
            self.current = self.start;
        }
    }

    fn take(&mut self) -> Vec<PathSegment> {
        self.current = None;
        self.start = None;
        std::mem::take(&mut self.segments)
    }
}

/// Interprets the content of one page.
pub struct ContentInterpreter<'a, B: PdfBackend> {
    backend: &'a B,
    scope: ResourceScope,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    path: PathBuilder,
    text_matrix: Matrix,
    line_matrix: Matrix,
    fonts: HashMap<(Vec<ObjectId>, Vec<u8>), FontMetrics>,
    seen_images: HashSet<ObjectId>,
    out: PageContent,
}

impl<'a, B: PdfBackend> ContentInterpreter<'a, B> {
    /// Create an interpreter for a page whose media box is
    /// `[llx, lly, urx, ury]`.
    pub fn new(backend: &'a B, page: PageId, media_box: [f64; 4]) -> Self {
        let [llx, _, _, ury] = media_box;
        // PDF user space to page space: y flipped about the top edge
        let flip = Matrix::new(1.0, 0.0, 0.0, -1.0, -llx, ury);
        Self {
            backend,
            scope: ResourceScope::page(page),
            state: GraphicsState::new(flip),
            stack: Vec::new(),
            path: PathBuilder::default(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            fonts: HashMap::new(),
            seen_images: HashSet::new(),
            out: PageContent::default(),
        }
    }

    /// Run the page's content stream and return what it painted.
    pub fn run(mut self, content: &[u8]) -> Result<PageContent> {
        let ops = self.backend.decode_content(content)?;
        self.execute(&ops);
        Ok(self.out)
    }

    fn execute(&mut self, ops: &[ContentOp]) {
        for op in ops {
            self.apply(op);
        }
    }

    fn apply(&mut self, op: &ContentOp) {
        let n = op.numbers();
        match op.operator.as_str() {
            // Graphics state
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" if n.len() == 6 => {
                let m = Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]);
                self.state.ctm = m.then(&self.state.ctm);
            }
            "w" if !n.is_empty() => self.state.line_width = n[0],

            // Colour
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(c) = color_from(&n) {
                    self.state.fill = c;
                }
            }
            "G" | "RG" | "K" | "SC" | "SCN" => {
                if let Some(c) = color_from(&n) {
                    self.state.stroke = c;
                }
            }
            "cs" => self.state.fill = Color::BLACK,
            "CS" => self.state.stroke = Color::BLACK,

            // Path construction
            "m" if n.len() >= 2 => {
                let p = self.state.ctm.apply(n[0], n[1]);
                self.path.move_to(p);
            }
            "l" if n.len() >= 2 => {
                let p = self.state.ctm.apply(n[0], n[1]);
                self.path.line_to(p);
            }
            "c" if n.len() >= 6 => {
                let ctm = self.state.ctm;
                self.path.curve_to(
                    ctm.apply(n[0], n[1]),
                    ctm.apply(n[2], n[3]),
                    ctm.apply(n[4], n[5]),
                );
            }
            "v" if n.len() >= 4 => {
                let ctm = self.state.ctm;
                let c1 = self.path.current.unwrap_or_else(|| ctm.apply(n[0], n[1]));
                self.path
                    .curve_to(c1, ctm.apply(n[0], n[1]), ctm.apply(n[2], n[3]));
            }
            "y" if n.len() >= 4 => {
                let ctm = self.state.ctm;
                let end = ctm.apply(n[2], n[3]);
                self.path.curve_to(ctm.apply(n[0], n[1]), end, end);
            }
            "h" => self.path.close(),
            "re" if n.len() >= 4 => {
                let (x, y, w, h) = (n[0], n[1], n[2], n[3]);
                let ctm = self.state.ctm;
                self.path.move_to(ctm.apply(x, y));
                self.path.line_to(ctm.apply(x + w, y));
                self.path.line_to(ctm.apply(x + w, y + h));
                self.path.line_to(ctm.apply(x, y + h));
                self.path.close();
            }

            // Path painting
            "S" => self.paint(false, None, true),
            "s" => self.paint(true, None, true),
            "f" | "F" => self.paint(false, Some(FillRule::NonZero), false),
            "f*" => self.paint(false, Some(FillRule::EvenOdd), false),
            "B" => self.paint(false, Some(FillRule::NonZero), true),
            "B*" => self.paint(false, Some(FillRule::EvenOdd), true),
            "b" => self.paint(true, Some(FillRule::NonZero), true),
            "b*" => self.paint(true, Some(FillRule::EvenOdd), true),
            "n" => {
                self.path.take();
            }

            // XObjects
            "Do" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.invoke_xobject(name);
                }
            }

            // Text objects and state
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(PdfValue::Name(font)) = op.operands.first() {
                    self.state.text.font = Some(font.clone());
                }
                if let Some(size) = op.number(1) {
                    self.state.text.size = size;
                }
            }
            "Tc" if !n.is_empty() => self.state.text.char_spacing = n[0],
            "Tw" if !n.is_empty() => self.state.text.word_spacing = n[0],
            "Tz" if !n.is_empty() => self.state.text.horizontal_scale = n[0] / 100.0,
            "TL" if !n.is_empty() => self.state.text.leading = n[0],
            "Ts" if !n.is_empty() => self.state.text.rise = n[0],
            "Td" if n.len() >= 2 => self.move_text(n[0], n[1]),
            "TD" if n.len() >= 2 => {
                self.state.text.leading = -n[1];
                self.move_text(n[0], n[1]);
            }
            "Tm" if n.len() == 6 => {
                let m = Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]);
                self.text_matrix = m;
                self.line_matrix = m;
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show_text(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show_text(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show_text(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "\"" => {
                if n.len() >= 2 {
                    self.state.text.word_spacing = n[0];
                    self.state.text.char_spacing = n[1];
                }
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show_text(&[PdfValue::Str(bytes.clone())]);
                }
            }
            _ => {}
        }
    }

    fn paint(&mut self, close: bool, fill: Option<FillRule>, stroke: bool) {
        if close {
            self.path.close();
        }
        let segments = self.path.take();
        if segments.is_empty() {
            return;
        }
        let paint = Paint {
            fill: fill.map(|rule| (self.state.fill, rule)),
            stroke: stroke.then(|| {
                let width = self.state.line_width * self.state.ctm.scale_factor();
                (self.state.stroke, width)
            }),
        };
        self.out.drawings.push(VectorPrimitive::new(segments, paint));
    }

    fn invoke_xobject(&mut self, name: &[u8]) {
        match self.backend.xobject(&self.scope, name) {
            Some(XObjectRef::Image(id)) => self.place_image(id),
            Some(XObjectRef::Form(id)) => self.run_form(id),
            None => log::debug!("Unknown XObject /{}", String::from_utf8_lossy(name)),
        }
    }

    /// Record the first placement of an image.
    fn place_image(&mut self, id: ObjectId) {
        if !self.seen_images.insert(id) {
            return;
        }
        match self.backend.image(id) {
            Ok(data) => {
                let bbox = self.state.ctm.transform_rect(0.0, 0.0, 1.0, 1.0);
                self.out.images.push(RasterImage {
                    object_id: id,
                    bbox,
                    data,
                });
            }
            Err(e) => log::warn!("Skipping image {} {} R: {}", id.0, id.1, e),
        }
    }

    fn run_form(&mut self, id: ObjectId) {
        if self.scope.forms.len() >= MAX_FORM_DEPTH || self.scope.forms.contains(&id) {
            log::debug!("Not entering form {} {} R (depth or cycle)", id.0, id.1);
            return;
        }
        let form = match self.backend.form(id) {
            Ok(form) => form,
            Err(e) => {
                log::warn!("Skipping form {} {} R: {}", id.0, id.1, e);
                return;
            }
        };
        let ops = match self.backend.decode_content(&form.content) {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("Skipping form {} {} R: {}", id.0, id.1, e);
                return;
            }
        };

        let saved_state = self.state.clone();
        let saved_depth = self.stack.len();
        let saved_text = (self.text_matrix, self.line_matrix);
        self.state.ctm = form.matrix.then(&self.state.ctm);
        self.scope.forms.push(id);

        self.execute(&ops);

        self.scope.forms.pop();
        self.stack.truncate(saved_depth);
        self.state = saved_state;
        (self.text_matrix, self.line_matrix) = saved_text;
    }

    fn move_text(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_text(0.0, -leading);
    }

    fn metrics(&mut self) -> FontMetrics {
        let Some(font) = self.state.text.font.clone() else {
            return FontMetrics::fallback();
        };
        let key = (self.scope.forms.clone(), font);
        if let Some(m) = self.fonts.get(&key) {
            return m.clone();
        }
        let metrics = self
            .backend
            .font_metrics(&self.scope, &key.1)
            .unwrap_or_else(FontMetrics::fallback);
        self.fonts.insert(key, metrics.clone());
        metrics
    }

    /// Show a `TJ`-style sequence of strings and adjustments as one span.
    fn show_text(&mut self, items: &[PdfValue]) {
        let params = self.state.text.clone();
        let metrics = self.metrics();
        let start = self.text_matrix;
        let mut text = String::new();
        let mut advance = 0.0;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = match &params.font {
                        Some(font) => self.backend.decode_text(&self.scope, font, bytes),
                        None => super::backend::decode_text_simple(bytes),
                    };
                    text.push_str(&decoded);
                    for code in metrics.codes(bytes) {
                        let mut w = metrics.width(code) / 1000.0 * params.size
                            + params.char_spacing;
                        if code == 32 && metrics.bytes_per_code == 1 {
                            w += params.word_spacing;
                        }
                        advance += w * params.horizontal_scale;
                    }
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = super::backend::get_number_from_value(item).unwrap_or(0.0);
                    advance -= adjustment / 1000.0 * params.size * params.horizontal_scale;
                    if -adjustment > TJ_SPACE_THRESHOLD
                        && text
                            .chars()
                            .last()
                            .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c))
                    {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }

        self.text_matrix = Matrix::translate(advance, 0.0).then(&self.text_matrix);

        let text: String = text.nfkc().collect();
        if text.trim().is_empty() {
            return;
        }

        let to_page = start.then(&self.state.ctm);
        let size = params.size;
        let rise = params.rise;
        let Some(bbox) = to_page.transform_rect(
            0.0,
            rise - DESCENT * size,
            advance,
            rise + ASCENT * size,
        ) else {
            return;
        };
        let baseline = to_page.apply(0.0, rise).y;
        let vertical_scale = (to_page.c * to_page.c + to_page.d * to_page.d).sqrt();

        self.out
            .spans
            .push(TextSpan::new(text, bbox, baseline, size * vertical_scale));
    }
}

/// Colour from operands: 1 = gray, 3 = RGB, 4 = CMYK.
fn color_from(n: &[f64]) -> Option<Color> {
    match n.len() {
        1 => Some(Color::gray(n[0] as f32)),
        3 => Some(Color::rgb(n[0] as f32, n[1] as f32, n[2] as f32)),
        4 => Some(Color::cmyk(n[0] as f32, n[1] as f32, n[2] as f32, n[3] as f32)),
        _ => None,
    }
}
