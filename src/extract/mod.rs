//! Asset extraction: raster images and vector figures per page.
//!
//! Pages are read into owned [`Page`] models first and extracted afterwards,
//! in parallel when enabled. Results are gathered in page order, so the
//! catalog never depends on scheduling.
//!
//! # Example
//!
//! ```no_run
//! use pdfgfx::extract::{AssetExtractor, ExtractOptions};
//! use pdfgfx::model::DocumentId;
//! use pdfgfx::PdfParser;
//!
//! fn main() -> pdfgfx::Result<()> {
//!     let parser = PdfParser::open("paper.pdf")?;
//!     let extractor = AssetExtractor::new(ExtractOptions::default());
//!     let catalog = extractor.scan(&parser, DocumentId::new("paper")?, None)?;
//!     println!("{}", catalog.images_passage());
//!     Ok(())
//! }
//! ```

mod caption;
mod grouping;
mod options;
mod raster;
mod vector;

pub use caption::CaptionResolver;
pub use grouping::{group_boxes, group_primitives, Cluster};
pub use options::{CaptionOptions, ErrorMode, ExtractMode, ExtractOptions, GroupingParams, Pass};

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::model::{AssetKind, AssetName, DocumentCatalog, DocumentId, GraphicAsset, Page};
use crate::parser::PdfParser;
use crate::render::{FigureRenderer, VectorRasterizer};

/// An asset together with the bytes its hash was computed over.
///
/// Image bytes are borrowed from the page; figure bytes are owned because
/// they only exist once the region is rasterized.
#[derive(Debug, Clone)]
pub struct ExtractedAsset<'a> {
    pub asset: GraphicAsset,
    pub bytes: Cow<'a, [u8]>,
}

impl ExtractedAsset<'_> {
    pub fn name(&self) -> AssetName {
        self.asset.name()
    }

    /// Detach from the page the bytes were borrowed from.
    pub fn into_owned(self) -> ExtractedAsset<'static> {
        ExtractedAsset {
            asset: self.asset,
            bytes: Cow::Owned(self.bytes.into_owned()),
        }
    }
}

/// Extracts graphic assets from pages.
#[derive(Clone)]
pub struct AssetExtractor {
    options: ExtractOptions,
    captions: CaptionResolver,
    renderer: Arc<dyn FigureRenderer>,
}

impl AssetExtractor {
    /// Create an extractor rendering figures with [`VectorRasterizer`].
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            captions: CaptionResolver::new(options.caption),
            options,
            renderer: Arc::new(VectorRasterizer::new()),
        }
    }

    /// Use a different figure renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn FigureRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// The renderer used for figures.
    pub fn renderer(&self) -> Arc<dyn FigureRenderer> {
        Arc::clone(&self.renderer)
    }

    /// Extract every asset of a page.
    pub fn extract_page<'p>(
        &self,
        page: &'p Page,
        document_id: &DocumentId,
        pass: Pass,
    ) -> Result<Vec<ExtractedAsset<'p>>> {
        self.extract_page_matching(page, document_id, pass, |_, _| true)
    }

    /// Extract the assets of a page whose `(kind, local_index)` pass `wanted`.
    ///
    /// Unwanted candidates are neither hashed nor rendered, but still take
    /// up their local index. In lenient mode a failing figure step leaves
    /// the page's images in place.
    pub fn extract_page_matching<'p, F>(
        &self,
        page: &'p Page,
        document_id: &DocumentId,
        pass: Pass,
        wanted: F,
    ) -> Result<Vec<ExtractedAsset<'p>>>
    where
        F: Fn(AssetKind, u32) -> bool,
    {
        let mut assets = Vec::new();
        if self.options.mode.images() {
            assets.extend(raster::extract_images(page, document_id, &self.captions, |i| {
                wanted(AssetKind::Image, i)
            }));
        }
        if self.options.mode.figures() {
            let figures = vector::extract_figures(
                page,
                document_id,
                &self.options,
                pass,
                &self.captions,
                &*self.renderer,
                |i| wanted(AssetKind::Figure, i),
            );
            match figures {
                Ok(figures) => assets.extend(figures),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping figures of page {}: {}", page.index, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(assets)
    }

    /// Extract all pages, in page order.
    ///
    /// A failing page fails the call in strict mode and is skipped with a
    /// warning in lenient mode.
    pub fn extract_pages<'p>(
        &self,
        pages: &'p [Page],
        document_id: &DocumentId,
        pass: Pass,
    ) -> Result<Vec<ExtractedAsset<'p>>> {
        let extract = |page: &'p Page| self.extract_page(page, document_id, pass);
        let results: Vec<Result<Vec<ExtractedAsset<'p>>>> = if self.options.parallel {
            pages.par_iter().map(extract).collect()
        } else {
            pages.iter().map(extract).collect()
        };

        let mut assets = Vec::new();
        for (page, result) in pages.iter().zip(results) {
            match result {
                Ok(found) => assets.extend(found),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping assets of page {}: {}", page.index, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(assets)
    }

    /// Read the given pages, honouring the error mode.
    pub fn read_pages<I>(&self, parser: &PdfParser, indices: I) -> Result<Vec<Page>>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut pages = Vec::new();
        for index in indices {
            match parser.parse_page(index) {
                Ok(page) => pages.push(page),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping unreadable page {}: {}", index, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(pages)
    }

    /// Build the catalog of a document.
    pub fn scan(
        &self,
        parser: &PdfParser,
        document_id: DocumentId,
        source: Option<PathBuf>,
    ) -> Result<DocumentCatalog> {
        let pages = self.read_pages(parser, 0..parser.page_count())?;
        let assets: Vec<GraphicAsset> = self
            .extract_pages(&pages, &document_id, Pass::Scan)?
            .into_iter()
            .map(|e| e.asset)
            .collect();

        let text = pages
            .iter()
            .map(Page::plain_text)
            .collect::<Vec<_>>()
            .join(" ");

        log::debug!(
            "Document {}: {} assets on {} pages",
            document_id,
            assets.len(),
            parser.page_count()
        );
        Ok(DocumentCatalog::new(
            document_id,
            source,
            parser.page_count(),
            self.options.asset_prefix.clone(),
            assets,
        )
        .with_text(text))
    }
}

impl Default for AssetExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl std::fmt::Debug for AssetExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetExtractor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::geometry::BoundingBox;
    use crate::model::{Color, ImageData, RasterImage, VectorPrimitive};

    struct FailingRenderer;

    impl FigureRenderer for FailingRenderer {
        fn render(&self, _page: &Page, _clip: &BoundingBox, _zoom: f64) -> Result<Vec<u8>> {
            Err(Error::Render("no backend".to_string()))
        }
    }

    fn page(index: u32) -> Page {
        let mut page = Page::letter(index);
        page.images.push(RasterImage {
            object_id: (10 + index, 0),
            bbox: Some(BoundingBox::new(100.0, 100.0, 400.0, 300.0)),
            data: ImageData::new(format!("image on page {}", index).into_bytes(), 3, 2),
        });
        page.drawings.push(VectorPrimitive::filled_rect(
            BoundingBox::new(100.0, 400.0, 400.0, 600.0),
            Color::gray(0.5),
        ));
        page
    }

    fn doc_id() -> DocumentId {
        DocumentId::new("doc").unwrap()
    }

    #[test]
    fn test_page_yields_image_and_figure() {
        let extractor = AssetExtractor::default();
        let page = page(0);
        let assets = extractor.extract_page(&page, &doc_id(), Pass::Scan).unwrap();
        let kinds: Vec<AssetKind> = assets.iter().map(|a| a.asset.kind).collect();
        assert_eq!(kinds, vec![AssetKind::Image, AssetKind::Figure]);
        assert_eq!(&assets[1].bytes[..4], b"\x89PNG");
    }

    #[test]
    fn test_mode_filters_kinds() {
        let page = page(0);
        let images = AssetExtractor::new(ExtractOptions::new().images_only())
            .extract_page(&page, &doc_id(), Pass::Scan)
            .unwrap();
        assert!(images.iter().all(|a| a.asset.kind == AssetKind::Image));

        let figures = AssetExtractor::new(ExtractOptions::new().figures_only())
            .extract_page(&page, &doc_id(), Pass::Scan)
            .unwrap();
        assert!(figures.iter().all(|a| a.asset.kind == AssetKind::Figure));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let pages: Vec<Page> = (0..6).map(page).collect();
        let names = |options: ExtractOptions| -> Vec<String> {
            AssetExtractor::new(options)
                .extract_pages(&pages, &doc_id(), Pass::Scan)
                .unwrap()
                .iter()
                .map(|a| a.name().to_string())
                .collect()
        };
        let parallel = names(ExtractOptions::new());
        assert_eq!(parallel.len(), 12);
        assert_eq!(parallel, names(ExtractOptions::new().sequential()));
    }

    #[test]
    fn test_error_mode_for_render_failures() {
        let pages = vec![page(0)];
        let strict = AssetExtractor::default().with_renderer(Arc::new(FailingRenderer));
        assert!(matches!(
            strict.extract_pages(&pages, &doc_id(), Pass::Scan),
            Err(Error::Render(_))
        ));

        let lenient = AssetExtractor::new(ExtractOptions::new().lenient())
            .with_renderer(Arc::new(FailingRenderer));
        let kept = lenient.extract_pages(&pages, &doc_id(), Pass::Scan).unwrap();
        let kinds: Vec<AssetKind> = kept.iter().map(|a| a.asset.kind).collect();
        assert_eq!(kinds, vec![AssetKind::Image]);
    }

    #[test]
    fn test_matching_skips_unwanted() {
        let page = page(0);
        let assets = AssetExtractor::default()
            .extract_page_matching(&page, &doc_id(), Pass::Export, |kind, _| {
                kind == AssetKind::Figure
            })
            .unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].asset.kind, AssetKind::Figure);
    }
}
