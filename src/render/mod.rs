//! Rendering of page regions into PNG bytes.
//!
//! Figure assets are content-addressed over a rasterization of their
//! region, so a renderer must be deterministic: the same page and clip
//! must always produce the same bytes.

mod rasterizer;

pub use rasterizer::{VectorRasterizer, MAX_PIXMAP_DIMENSION};

use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::model::Page;

/// Rasterizes a region of a page.
pub trait FigureRenderer: Send + Sync {
    /// Render `clip` (page coordinates) at `zoom` pixels per point and
    /// return PNG-encoded bytes.
    fn render(&self, page: &Page, clip: &BoundingBox, zoom: f64) -> Result<Vec<u8>>;
}
