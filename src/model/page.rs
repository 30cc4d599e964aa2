//! Page-level types: what a page holds once its content stream is read.

use crate::geometry::{BoundingBox, PathSegment};
use crate::parser::TextBlock;

use super::ImageData;

/// PDF object id (object number, generation).
pub type ObjectId = (u32, u16);

/// A single page of a document.
///
/// Built once by the parser and never mutated afterwards; extraction only
/// borrows it, which lets pages be processed on different threads.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page index (0-based)
    pub index: u32,

    /// Page width in points
    pub width: f64,

    /// Page height in points
    pub height: f64,

    /// Embedded raster images, in order of first placement
    pub images: Vec<RasterImage>,

    /// Painted vector paths, in content-stream order
    pub drawings: Vec<VectorPrimitive>,

    /// Positioned text blocks, in reading order
    pub text_blocks: Vec<TextBlock>,
}

impl Page {
    /// Create an empty page with the given dimensions.
    pub fn new(index: u32, width: f64, height: f64) -> Self {
        Self {
            index,
            width,
            height,
            images: Vec::new(),
            drawings: Vec::new(),
            text_blocks: Vec::new(),
        }
    }

    /// Create an empty US Letter page.
    pub fn letter(index: u32) -> Self {
        Self::new(index, 612.0, 792.0)
    }

    /// Page area in square points.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Page bounds as a box anchored at the origin.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Plain text of the page, blocks joined by newlines.
    pub fn plain_text(&self) -> String {
        self.text_blocks
            .iter()
            .map(|b| b.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An image XObject placed on a page.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Object id of the image stream
    pub object_id: ObjectId,

    /// Placed bounds on the page; `None` when the placement could not be
    /// resolved to finite coordinates
    pub bbox: Option<BoundingBox>,

    /// Encoded image bytes
    pub data: ImageData,
}

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn gray(level: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Naive CMYK conversion, good enough for rasterizing figures.
    pub fn cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::rgb(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }
}

/// Fill rule for filled paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// How a path was painted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Paint {
    /// Fill colour and rule, when the path was filled
    pub fill: Option<(Color, FillRule)>,

    /// Stroke colour and page-space line width, when the path was stroked
    pub stroke: Option<(Color, f64)>,
}

/// One painted path from the page's drawing list.
#[derive(Debug, Clone)]
pub struct VectorPrimitive {
    /// Bounds of the path; `None` for paths without usable points
    pub rect: Option<BoundingBox>,

    /// Path geometry in page space
    pub segments: Vec<PathSegment>,

    /// Paint applied to the path
    pub paint: Paint,
}

impl VectorPrimitive {
    /// Build a primitive, deriving its rectangle from the segments.
    pub fn new(segments: Vec<PathSegment>, paint: Paint) -> Self {
        let rect = BoundingBox::from_points(segments.iter().flat_map(|s| s.points()));
        Self {
            rect,
            segments,
            paint,
        }
    }

    /// Filled axis-aligned rectangle, handy for building pages by hand.
    pub fn filled_rect(bbox: BoundingBox, color: Color) -> Self {
        use crate::geometry::Point;
        Self::new(
            vec![
                PathSegment::MoveTo(Point::new(bbox.x0, bbox.y0)),
                PathSegment::LineTo(Point::new(bbox.x1, bbox.y0)),
                PathSegment::LineTo(Point::new(bbox.x1, bbox.y1)),
                PathSegment::LineTo(Point::new(bbox.x0, bbox.y1)),
                PathSegment::Close,
            ],
            Paint {
                fill: Some((color, FillRule::NonZero)),
                stroke: None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_area() {
        let page = Page::letter(0);
        assert_eq!(page.area(), 612.0 * 792.0);
        assert_eq!(page.bounds(), BoundingBox::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn test_primitive_rect_from_segments() {
        let prim = VectorPrimitive::filled_rect(
            BoundingBox::new(10.0, 20.0, 30.0, 50.0),
            Color::BLACK,
        );
        assert_eq!(prim.rect, Some(BoundingBox::new(10.0, 20.0, 30.0, 50.0)));

        let empty = VectorPrimitive::new(vec![PathSegment::Close], Paint::default());
        assert!(empty.rect.is_none());
    }

    #[test]
    fn test_cmyk_conversion() {
        assert_eq!(Color::cmyk(0.0, 0.0, 0.0, 1.0), Color::BLACK);
        assert_eq!(Color::cmyk(0.0, 0.0, 0.0, 0.0), Color::rgb(1.0, 1.0, 1.0));
    }
}
