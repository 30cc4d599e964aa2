//! Document-level pipeline: sources in, catalogs and exported files out.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::export::{ExportReport, Exporter};
use crate::extract::{AssetExtractor, ExtractOptions};
use crate::model::{DocumentCatalog, DocumentId};
use crate::parser::PdfParser;
use crate::reference::{AssetReference, ReferenceResolver};
use crate::render::FigureRenderer;

/// Where a document's bytes come from.
#[derive(Clone)]
enum SourceData {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// A document to scan or export from, with the id its assets are named by.
#[derive(Clone)]
pub struct DocumentSource {
    pub document_id: DocumentId,
    data: SourceData,
}

impl DocumentSource {
    /// A file on disk; the id is the sanitized file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            document_id: DocumentId::from_path(&path),
            data: SourceData::Path(path),
        }
    }

    /// In-memory PDF bytes.
    pub fn from_bytes(document_id: DocumentId, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            document_id,
            data: SourceData::Bytes(bytes.into()),
        }
    }

    /// Override the document id.
    pub fn with_id(mut self, document_id: DocumentId) -> Self {
        self.document_id = document_id;
        self
    }

    /// Source path, for file sources.
    pub fn path(&self) -> Option<&Path> {
        match &self.data {
            SourceData::Path(p) => Some(p),
            SourceData::Bytes(_) => None,
        }
    }

    /// Open the document.
    pub fn open(&self) -> Result<PdfParser> {
        match &self.data {
            SourceData::Path(p) => PdfParser::open(p),
            SourceData::Bytes(b) => PdfParser::from_bytes(b),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            SourceData::Path(p) => write!(f, "{}", p.display()),
            SourceData::Bytes(b) => write!(f, "<{} bytes as {}>", b.len(), self.document_id),
        }
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSource")
            .field("document_id", &self.document_id)
            .field("source", &self.to_string())
            .finish()
    }
}

/// Result of scanning one document of a batch.
#[derive(Debug)]
pub struct DocumentOutcome {
    /// Display form of the source
    pub source: String,
    pub result: Result<DocumentCatalog>,
}

impl DocumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Builder tying extraction, reference resolution and export together.
///
/// # Example
///
/// ```no_run
/// use pdfgfx::{AssetPipeline, DocumentSource};
///
/// let pipeline = AssetPipeline::new().lenient();
/// let sources = vec![DocumentSource::from_path("paper.pdf")];
/// for outcome in pipeline.scan_many(&sources) {
///     match outcome.result {
///         Ok(catalog) => println!("{}", catalog.images_passage()),
///         Err(e) => eprintln!("{}: {}", outcome.source, e),
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssetPipeline {
    extractor: AssetExtractor,
    resolver: ReferenceResolver,
}

impl AssetPipeline {
    /// Create a pipeline with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with the given options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self {
            extractor: AssetExtractor::new(options),
            resolver: ReferenceResolver::new(),
        }
    }

    /// Skip failing pages instead of failing the document.
    pub fn lenient(self) -> Self {
        let options = self.extractor.options().clone().lenient();
        self.rebuild(options)
    }

    /// Process documents and pages one at a time.
    pub fn sequential(self) -> Self {
        let options = self.extractor.options().clone().sequential();
        self.rebuild(options)
    }

    /// Render figures with a custom renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn FigureRenderer>) -> Self {
        self.extractor = self.extractor.with_renderer(renderer);
        self
    }

    fn rebuild(self, options: ExtractOptions) -> Self {
        let renderer = self.extractor.renderer();
        Self {
            extractor: AssetExtractor::new(options).with_renderer(renderer),
            resolver: self.resolver,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        self.extractor.options()
    }

    pub fn extractor(&self) -> &AssetExtractor {
        &self.extractor
    }

    /// Scan one document into its catalog.
    pub fn scan(&self, source: &DocumentSource) -> Result<DocumentCatalog> {
        let parser = source.open()?;
        self.extractor.scan(
            &parser,
            source.document_id.clone(),
            source.path().map(Path::to_path_buf),
        )
    }

    /// Scan a PDF file.
    pub fn scan_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentCatalog> {
        self.scan(&DocumentSource::from_path(path.as_ref()))
    }

    /// Scan PDF bytes under the given id.
    pub fn scan_bytes(&self, document_id: DocumentId, data: &[u8]) -> Result<DocumentCatalog> {
        let parser = PdfParser::from_bytes(data)?;
        self.extractor.scan(&parser, document_id, None)
    }

    /// Scan several documents; a failing document does not stop the others.
    pub fn scan_many(&self, sources: &[DocumentSource]) -> Vec<DocumentOutcome> {
        let scan = |source: &DocumentSource| {
            let result = self.scan(source);
            if let Err(e) = &result {
                log::warn!("Failed to scan {}: {}", source, e);
            }
            DocumentOutcome {
                source: source.to_string(),
                result,
            }
        };
        if self.options().parallel {
            sources.par_iter().map(scan).collect()
        } else {
            sources.iter().map(scan).collect()
        }
    }

    /// Asset names occurring in `text`.
    pub fn resolve(&self, text: &str) -> Vec<AssetReference> {
        self.resolver.resolve(text)
    }

    /// Export the assets named in `text` into `out_dir`.
    pub fn export<P: AsRef<Path>>(
        &self,
        text: &str,
        sources: &[DocumentSource],
        out_dir: P,
    ) -> Result<ExportReport> {
        let references = self.resolve(text);
        Exporter::new(self.extractor.clone()).export(&references, sources, out_dir.as_ref())
    }

    /// Export the assets named in `text` into `<work_dir>/<asset_prefix>`,
    /// the directory the catalog paths point into.
    pub fn export_referenced<P: AsRef<Path>>(
        &self,
        text: &str,
        sources: &[DocumentSource],
        work_dir: P,
    ) -> Result<ExportReport> {
        let out_dir = work_dir.as_ref().join(&self.options().asset_prefix);
        self.export(text, sources, out_dir)
    }
}
