//! PDF parsing module.

mod backend;
mod content;
mod image;
mod layout;
mod pdf_parser;

pub use backend::{
    decode_text_simple, ContentOp, FontMetrics, FormXObject, LopdfBackend, PageId, PdfBackend,
    PdfValue, ResourceScope, XObjectRef,
};
pub use content::{ContentInterpreter, PageContent};
pub use layout::{LayoutAnalyzer, TextBlock, TextLine, TextSpan};
pub use pdf_parser::{check_header, PdfParser};
