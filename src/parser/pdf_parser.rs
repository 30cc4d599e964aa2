//! PDF document parser using lopdf.

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Page;

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::content::ContentInterpreter;
use super::layout::LayoutAnalyzer;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// The header may be preceded by junk, but only within the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// US Letter, used when a page has no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Check the `%PDF-x.y` header and return the version string.
pub fn check_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version = data
        .get(start + PDF_MAGIC.len()..start + PDF_MAGIC.len() + 3)
        .ok_or(Error::UnknownFormat)?;
    let valid = version[0].is_ascii_digit() && version[1] == b'.' && version[2].is_ascii_digit();
    let version = String::from_utf8_lossy(version).into_owned();
    if !valid {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(version)
}

/// PDF document parser.
///
/// Reads pages into owned [`Page`] models; the parser itself is only needed
/// while pages are being read.
pub struct PdfParser {
    backend: LopdfBackend,
    pages: Vec<PageId>,
    layout: LayoutAnalyzer,
}

impl PdfParser {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = check_header(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        let pages: Vec<PageId> = backend.pages().into_values().collect();
        log::debug!("Loaded PDF {} with {} pages", version, pages.len());
        Ok(Self {
            backend,
            pages,
            layout: LayoutAnalyzer::new(),
        })
    }

    /// Parse a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get PDF version.
    pub fn version(&self) -> String {
        self.backend.version()
    }

    fn page_id(&self, index: u32) -> Result<PageId> {
        self.pages
            .get(index as usize)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.page_count()))
    }

    /// Page width and height in points.
    pub fn page_size(&self, index: u32) -> Result<(f64, f64)> {
        let [x0, y0, x1, y1] = self.media_box(self.page_id(index)?);
        Ok((x1 - x0, y1 - y0))
    }

    fn media_box(&self, page: PageId) -> [f64; 4] {
        self.backend
            .media_box(page)
            .filter(|[x0, y0, x1, y1]| x1 > x0 && y1 > y0)
            .unwrap_or(DEFAULT_MEDIA_BOX)
    }

    /// Read one page (0-based index).
    pub fn parse_page(&self, index: u32) -> Result<Page> {
        let page_id = self.page_id(index)?;
        let media_box = self.media_box(page_id);
        let [x0, y0, x1, y1] = media_box;

        let content = self.backend.page_content(page_id)?;
        let painted = ContentInterpreter::new(&self.backend, page_id, media_box).run(&content)?;

        let mut page = Page::new(index, x1 - x0, y1 - y0);
        page.images = painted.images;
        page.drawings = painted.drawings;
        page.text_blocks = self.layout.analyze(painted.spans);

        log::debug!(
            "Page {}: {} images, {} drawings, {} text blocks",
            index,
            page.images.len(),
            page.drawings.len(),
            page.text_blocks.len()
        );
        Ok(page)
    }

    /// Read the given pages, failing on the first error.
    pub fn parse_pages(&self, indices: &[u32]) -> Result<Vec<Page>> {
        indices.iter().map(|&i| self.parse_page(i)).collect()
    }

    /// Read every page.
    pub fn parse_all(&self) -> Result<Vec<Page>> {
        (0..self.page_count()).map(|i| self.parse_page(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_header() {
        assert_eq!(check_header(b"%PDF-1.7\n%...").unwrap(), "1.7");
        assert_eq!(check_header(b"\r\n  %PDF-2.0\n").unwrap(), "2.0");
        assert!(matches!(
            check_header(b"PK\x03\x04 not a pdf"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(
            check_header(b"%PDF-x.y"),
            Err(Error::UnsupportedVersion(_))
        ));
        assert!(matches!(check_header(b"%PDF-"), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        assert!(matches!(
            PdfParser::from_bytes(b"hello world"),
            Err(Error::UnknownFormat)
        ));
    }
}
