//! Vector rasterizer backed by tiny-skia.

use tiny_skia::{
    Color as SkColor, FillRule as SkFillRule, Paint as SkPaint, PathBuilder, Pixmap, Stroke,
    Transform,
};

use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, PathSegment};
use crate::model::{Color, FillRule, Page, VectorPrimitive};

use super::FigureRenderer;

/// Largest pixmap side we are willing to allocate.
pub const MAX_PIXMAP_DIMENSION: u32 = 16_384;

/// Paints the page's vector drawings that intersect the clip onto a white
/// background. Text and raster images are not painted.
#[derive(Debug, Clone, Copy)]
pub struct VectorRasterizer {
    anti_alias: bool,
}

impl VectorRasterizer {
    pub fn new() -> Self {
        Self { anti_alias: true }
    }

    /// Toggle anti-aliasing.
    pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }

    fn pixmap_size(clip: &BoundingBox, zoom: f64) -> Result<(u32, u32)> {
        if !(zoom.is_finite() && zoom > 0.0) || !clip.is_finite() {
            return Err(Error::Render(format!("invalid zoom {} or clip {:?}", zoom, clip)));
        }
        let width = (clip.width() * zoom).ceil().max(1.0);
        let height = (clip.height() * zoom).ceil().max(1.0);
        let max = MAX_PIXMAP_DIMENSION as f64;
        if width > max || height > max {
            return Err(Error::Render(format!(
                "region {}x{} px exceeds {} px",
                width, height, MAX_PIXMAP_DIMENSION
            )));
        }
        Ok((width as u32, height as u32))
    }

    fn paint_primitive(&self, pixmap: &mut Pixmap, prim: &VectorPrimitive, transform: Transform) {
        let Some(path) = build_path(&prim.segments) else {
            return;
        };

        if let Some((color, rule)) = prim.paint.fill {
            let paint = self.sk_paint(color);
            let rule = match rule {
                FillRule::NonZero => SkFillRule::Winding,
                FillRule::EvenOdd => SkFillRule::EvenOdd,
            };
            pixmap.fill_path(&path, &paint, rule, transform, None);
        }

        if let Some((color, width)) = prim.paint.stroke {
            let paint = self.sk_paint(color);
            let stroke = Stroke {
                width: width.max(0.0) as f32,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }

    fn sk_paint(&self, color: Color) -> SkPaint<'static> {
        let mut paint = SkPaint::default();
        paint.set_color_rgba8(channel(color.r), channel(color.g), channel(color.b), 255);
        paint.anti_alias = self.anti_alias;
        paint
    }
}

impl Default for VectorRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FigureRenderer for VectorRasterizer {
    fn render(&self, page: &Page, clip: &BoundingBox, zoom: f64) -> Result<Vec<u8>> {
        let (width, height) = Self::pixmap_size(clip, zoom)?;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("cannot allocate {}x{} pixmap", width, height)))?;
        pixmap.fill(SkColor::WHITE);

        let zoom32 = zoom as f32;
        let transform = Transform::from_row(
            zoom32,
            0.0,
            0.0,
            zoom32,
            (-clip.x0 * zoom) as f32,
            (-clip.y0 * zoom) as f32,
        );

        let mut painted = 0usize;
        for prim in &page.drawings {
            if prim.rect.is_some_and(|r| r.intersects(clip)) {
                self.paint_primitive(&mut pixmap, prim, transform);
                painted += 1;
            }
        }
        log::debug!(
            "Rasterized {} drawings of page {} into {}x{} px",
            painted,
            page.index,
            width,
            height
        );

        pixmap
            .encode_png()
            .map_err(|e| Error::Render(e.to_string()))
    }
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn build_path(segments: &[PathSegment]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for seg in segments {
        match *seg {
            PathSegment::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathSegment::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathSegment::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathSegment::Close => pb.close(),
        }
    }
    pb.finish()
}
