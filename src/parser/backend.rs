//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from content interpretation.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::model::{ImageData, ObjectId};

use super::image::decode_image_stream;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Maximum number of `/Parent` hops when resolving inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Operand `i` as a number.
    pub fn number(&self, i: usize) -> Option<f64> {
        self.operands.get(i).and_then(get_number_from_value)
    }

    /// All leading numeric operands, stopping at the first non-number.
    pub fn numbers(&self) -> Vec<f64> {
        self.operands
            .iter()
            .map_while(get_number_from_value)
            .collect()
    }
}

/// Where resource names are looked up: the page, plus the chain of form
/// XObjects currently being executed (innermost last).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceScope {
    pub page: PageId,
    pub forms: Vec<ObjectId>,
}

impl ResourceScope {
    pub fn page(page: PageId) -> Self {
        Self {
            page,
            forms: Vec::new(),
        }
    }
}

/// An XObject named in a resource dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XObjectRef {
    Image(ObjectId),
    Form(ObjectId),
}

/// A form XObject ready to execute.
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub matrix: Matrix,
    pub content: Vec<u8>,
}

/// Glyph widths of a font, in thousandths of text space.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    pub first_char: u32,
    pub widths: Vec<f64>,
    pub missing_width: f64,
    /// 2 for composite (Type0) fonts, 1 otherwise
    pub bytes_per_code: usize,
}

impl FontMetrics {
    /// Half an em per glyph, used when a font carries no widths.
    pub fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            missing_width: 500.0,
            bytes_per_code: 1,
        }
    }

    /// Width of a character code.
    pub fn width(&self, code: u32) -> f64 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }

    /// Split a string operand into character codes.
    pub fn codes<'b>(&self, bytes: &'b [u8]) -> impl Iterator<Item = u32> + 'b {
        let step = self.bytes_per_code.max(1);
        bytes.chunks(step).map(|chunk| {
            chunk
                .iter()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
        })
    }
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, resource lookup, content
/// stream decoding, and text decoding without exposing any concrete PDF
/// library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId), numbered from 1.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Inherited `/MediaBox` as `[llx, lly, urx, ury]`.
    fn media_box(&self, page: PageId) -> Option<[f64; 4]>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Look up a named XObject.
    fn xobject(&self, scope: &ResourceScope, name: &[u8]) -> Option<XObjectRef>;

    /// Decode an image XObject into encoded bytes.
    fn image(&self, id: ObjectId) -> Result<ImageData>;

    /// Load a form XObject.
    fn form(&self, id: ObjectId) -> Result<FormXObject>;

    /// Widths of a named font, `None` if the font is unknown.
    fn font_metrics(&self, scope: &ResourceScope, font_name: &[u8]) -> Option<FontMetrics>;

    /// Decode a text byte sequence using the named font's encoding.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, scope: &ResourceScope, font_name: &[u8], bytes: &[u8]) -> String;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self { doc })
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Walk the page tree upwards until `key` is found.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Resource dictionaries in lookup order: innermost form first, page last.
    fn resource_dicts(&self, scope: &ResourceScope) -> Vec<&Dictionary> {
        let mut dicts = Vec::with_capacity(scope.forms.len() + 1);
        for id in scope.forms.iter().rev() {
            if let Ok(Object::Stream(form)) = self.doc.get_object(*id) {
                if let Some(res) = form
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| self.resolve_dict(r))
                {
                    dicts.push(res);
                }
            }
        }
        if let Some(res) = self
            .inherited(scope.page, b"Resources")
            .and_then(|r| self.resolve_dict(r))
        {
            dicts.push(res);
        }
        dicts
    }

    /// Raw entry `name` of resource category `category` (`Font`, `XObject`).
    fn lookup_resource(
        &self,
        scope: &ResourceScope,
        category: &[u8],
        name: &[u8],
    ) -> Option<&Object> {
        self.resource_dicts(scope).into_iter().find_map(|res| {
            let entries = self.resolve_dict(res.get(category).ok()?)?;
            entries.get(name).ok()
        })
    }

    fn font_dict(&self, scope: &ResourceScope, font_name: &[u8]) -> Option<&Dictionary> {
        let entry = self.lookup_resource(scope, b"Font", font_name)?;
        self.resolve_dict(entry)
    }

    fn number(&self, obj: &Object) -> Option<f64> {
        match self.resolve(obj)? {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(f64::from(*r)),
            _ => None,
        }
    }

    fn stream(&self, id: ObjectId) -> Result<&Stream> {
        match self.doc.get_object(id)? {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::MissingObject(format!("stream {} {} R", id.0, id.1))),
        }
    }
}

/// Content bytes of a stream with its filters removed.
///
/// Streams without a `/Filter` are returned as stored.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| Error::PdfParse(e.to_string()))
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> Option<[f64; 4]> {
        let array = self.resolve(self.inherited(page, b"MediaBox")?)?.as_array().ok()?;
        if array.len() < 4 {
            return None;
        }
        let mut values = [0.0; 4];
        for (slot, obj) in values.iter_mut().zip(array) {
            *slot = self.number(obj)?;
        }
        let [x0, y0, x1, y1] = values;
        Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        // Pages without contents are blank
        let contents = match page_dict.get(b"Contents") {
            Ok(c) => c,
            Err(_) => return Ok(Vec::new()),
        };

        match self.resolve(contents) {
            Some(Object::Stream(s)) => stream_bytes(s),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Some(Object::Stream(s)) = self.resolve(obj) {
                        match stream_bytes(s) {
                            Ok(data) => {
                                content.extend_from_slice(&data);
                                content.push(b' ');
                            }
                            Err(e) => log::debug!("Skipping content stream part: {}", e),
                        }
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn xobject(&self, scope: &ResourceScope, name: &[u8]) -> Option<XObjectRef> {
        let id = self
            .lookup_resource(scope, b"XObject", name)?
            .as_reference()
            .ok()?;
        let stream = self.stream(id).ok()?;
        match stream.dict.get(b"Subtype").ok()?.as_name().ok()? {
            b"Image" => Some(XObjectRef::Image(id)),
            b"Form" => Some(XObjectRef::Form(id)),
            _ => None,
        }
    }

    fn image(&self, id: ObjectId) -> Result<ImageData> {
        let stream = self.stream(id)?;
        Ok(decode_image_stream(&self.doc, stream))
    }

    fn form(&self, id: ObjectId) -> Result<FormXObject> {
        let stream = self.stream(id)?;
        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| self.resolve(m))
            .and_then(|m| m.as_array().ok())
            .and_then(|arr| {
                let v: Vec<f64> = arr.iter().filter_map(|o| self.number(o)).collect();
                (v.len() == 6).then(|| Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
            })
            .unwrap_or(Matrix::IDENTITY);
        Ok(FormXObject {
            matrix,
            content: stream_bytes(stream)?,
        })
    }

    fn font_metrics(&self, scope: &ResourceScope, font_name: &[u8]) -> Option<FontMetrics> {
        let font = self.font_dict(scope, font_name)?;
        let subtype = font.get(b"Subtype").ok().and_then(|s| s.as_name().ok());

        if subtype == Some(b"Type0".as_slice()) {
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .and_then(|d| self.resolve(d))
                .and_then(|d| d.as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|d| self.resolve_dict(d));
            let default_width = descendant
                .and_then(|d| d.get(b"DW").ok())
                .and_then(|w| self.number(w))
                .unwrap_or(1000.0);
            return Some(FontMetrics {
                first_char: 0,
                widths: Vec::new(),
                missing_width: default_width,
                bytes_per_code: 2,
            });
        }

        let widths: Vec<f64> = font
            .get(b"Widths")
            .ok()
            .and_then(|w| self.resolve(w))
            .and_then(|w| w.as_array().ok())
            .map(|arr| arr.iter().map(|o| self.number(o).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        if widths.is_empty() {
            return Some(FontMetrics::fallback());
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|f| self.number(f))
            .unwrap_or(0.0)
            .max(0.0) as u32;
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| self.resolve_dict(d))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|w| self.number(w))
            .unwrap_or(0.0);

        Some(FontMetrics {
            first_char,
            widths,
            missing_width,
            bytes_per_code: 1,
        })
    }

    fn decode_text(&self, scope: &ResourceScope, font_name: &[u8], bytes: &[u8]) -> String {
        if let Some(font_dict) = self.font_dict(scope, font_name) {
            if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f64> {
    match val {
        PdfValue::Integer(i) => Some(*i as f64),
        PdfValue::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}
