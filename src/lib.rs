//! # pdfgfx
//!
//! Extraction of images and vector figures from PDF documents, with
//! caption association and content-addressed naming.
//!
//! Every asset gets a name of the form
//! `doc<DOC>_page<PAGE>_<img|fig><IDX>_hash<H8>.png`. Names are handed to a
//! downstream text generator through a per-document catalog; names found in
//! the generated text are resolved back to the same assets and exported.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfgfx::{export_referenced, scan_file, DocumentSource};
//!
//! fn main() -> pdfgfx::Result<()> {
//!     // Build the catalog
//!     let catalog = scan_file("paper.pdf")?;
//!     println!("{}", catalog.images_passage());
//!
//!     // Later, export what the generated text refers to
//!     let generated = std::fs::read_to_string("answer.md")?;
//!     let sources = vec![DocumentSource::from_path("paper.pdf")];
//!     let report = export_referenced(&generated, &sources, "work")?;
//!     println!("{} files written", report.written.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Raster images**: JPEG/JPEG 2000 streams kept verbatim, others re-encoded as PNG
//! - **Vector figures**: drawings grouped by proximity and rasterized
//! - **Captions**: `Figure N:` labels preferred over nearby text
//! - **Parallel processing**: Uses Rayon across pages and documents

pub mod error;
pub mod export;
pub mod extract;
pub mod geometry;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod reference;
pub mod render;
pub mod spatial;

// Re-export commonly used types
pub use error::{Error, Result};
pub use export::{DocumentFailure, ExportReport, Exporter};
pub use extract::{
    AssetExtractor, CaptionOptions, ErrorMode, ExtractMode, ExtractOptions, ExtractedAsset,
    GroupingParams, Pass,
};
pub use geometry::BoundingBox;
pub use model::{
    AssetDescriptor, AssetKind, AssetName, Caption, CatalogMetadata, DocumentCatalog, DocumentId,
    GraphicAsset, Orientation, Page,
};
pub use parser::PdfParser;
pub use pipeline::{AssetPipeline, DocumentOutcome, DocumentSource};
pub use reference::{resolve_references, select_referenced, AssetReference, ReferenceResolver};
pub use render::{FigureRenderer, VectorRasterizer};

use std::path::Path;

/// Scan a PDF file into its asset catalog.
///
/// The document id is the file stem with every character outside
/// `[A-Za-z0-9_]` replaced by `_`.
///
/// # Example
///
/// ```no_run
/// let catalog = pdfgfx::scan_file("reports/Q3 results.pdf").unwrap();
/// assert_eq!(catalog.document_id.as_str(), "Q3_results");
/// ```
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<DocumentCatalog> {
    AssetPipeline::new().scan_file(path)
}

/// Scan a PDF file with custom options.
pub fn scan_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<DocumentCatalog> {
    AssetPipeline::with_options(options).scan_file(path)
}

/// Scan PDF bytes under the given document id.
///
/// # Example
///
/// ```no_run
/// use pdfgfx::{scan_bytes, DocumentId};
///
/// let data = std::fs::read("paper.pdf").unwrap();
/// let catalog = scan_bytes(DocumentId::new("paper").unwrap(), &data).unwrap();
/// println!("{} assets", catalog.num_images());
/// ```
pub fn scan_bytes(document_id: DocumentId, data: &[u8]) -> Result<DocumentCatalog> {
    AssetPipeline::new().scan_bytes(document_id, data)
}

/// Export the assets named in `text` into `<work_dir>/gfx`.
pub fn export_referenced<P: AsRef<Path>>(
    text: &str,
    sources: &[DocumentSource],
    work_dir: P,
) -> Result<ExportReport> {
    AssetPipeline::new().export_referenced(text, sources, work_dir)
}
