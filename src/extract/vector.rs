//! Vector figures: grouped drawings promoted to assets.

use std::borrow::Cow;

use crate::error::Result;
use crate::geometry::merge_boxes;
use crate::model::{content_hash, AssetKind, DocumentId, GraphicAsset, Orientation, Page};
use crate::render::FigureRenderer;

use super::caption::CaptionResolver;
use super::grouping::group_primitives;
use super::options::{ExtractOptions, Pass};
use super::ExtractedAsset;

/// Group a page's drawings and turn the qualifying groups into figures.
///
/// Each group's box is widened by the text blocks around it, then kept only
/// when its area lies strictly inside the configured window and its ratio is
/// acceptable. Kept regions are rasterized and hashed. The local index is
/// the group's position in grouping order, rejected groups included.
pub(crate) fn extract_figures<'p, F>(
    page: &'p Page,
    document_id: &DocumentId,
    options: &ExtractOptions,
    pass: Pass,
    captions: &CaptionResolver,
    renderer: &dyn FigureRenderer,
    keep: F,
) -> Result<Vec<ExtractedAsset<'p>>>
where
    F: Fn(u32) -> bool,
{
    let params = options.grouping(pass);
    let clusters = group_primitives(&page.drawings, params);
    log::debug!(
        "Page {}: {} drawings grouped into {} clusters ({:?} pass)",
        page.index,
        page.drawings.len(),
        clusters.len(),
        pass
    );

    let page_area = page.area();
    let min_area = page_area * options.min_area_fraction;
    let max_area = page_area * options.max_area_fraction;

    let mut assets = Vec::new();
    for (index, cluster) in clusters.iter().enumerate() {
        let local_index = index as u32;
        if !keep(local_index) {
            continue;
        }

        let search = cluster.bbox.expand(params.proximity);
        let surrounding = page
            .text_blocks
            .iter()
            .map(|b| &b.bbox)
            .filter(|b| b.intersects(&search));
        let figure_box = merge_boxes(std::iter::once(&cluster.bbox).chain(surrounding))
            .unwrap_or(cluster.bbox);

        let area = figure_box.area();
        if !(min_area < area && area < max_area) {
            continue;
        }
        let Some(orientation) = Orientation::of_box(&figure_box) else {
            continue;
        };

        let png = renderer.render(page, &figure_box, options.zoom)?;
        assets.push(ExtractedAsset {
            asset: GraphicAsset {
                document_id: document_id.clone(),
                page_index: page.index,
                local_index,
                kind: AssetKind::Figure,
                content_hash: content_hash(&png),
                bounding_box: figure_box,
                orientation,
                caption: captions.resolve(&figure_box, &page.text_blocks),
            },
            bytes: Cow::Owned(png),
        });
    }

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::model::{Color, VectorPrimitive};
    use crate::parser::{TextBlock, TextLine, TextSpan};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Encodes the clip instead of drawing it, so tests can see what was rendered.
    struct ClipRecorder {
        calls: AtomicUsize,
    }

    impl FigureRenderer for ClipRecorder {
        fn render(&self, _page: &Page, clip: &BoundingBox, zoom: f64) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{:?}@{}", clip, zoom).into_bytes())
        }
    }

    fn recorder() -> ClipRecorder {
        ClipRecorder {
            calls: AtomicUsize::new(0),
        }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> VectorPrimitive {
        VectorPrimitive::filled_rect(BoundingBox::new(x0, y0, x1, y1), Color::BLACK)
    }

    fn block(text: &str, bbox: BoundingBox) -> TextBlock {
        let line = TextLine::from_spans(vec![TextSpan::new(text, bbox, bbox.y1 - 2.0, 10.0)]).unwrap();
        TextBlock::new(line)
    }

    fn extract_with<'p>(
        page: &'p Page,
        options: &ExtractOptions,
        renderer: &dyn FigureRenderer,
    ) -> Vec<ExtractedAsset<'p>> {
        let id = DocumentId::new("doc").unwrap();
        extract_figures(
            page,
            &id,
            options,
            Pass::Export,
            &CaptionResolver::default(),
            renderer,
            |_| true,
        )
        .unwrap()
    }

    fn extract<'p>(page: &'p Page, renderer: &dyn FigureRenderer) -> Vec<ExtractedAsset<'p>> {
        extract_with(page, &ExtractOptions::default(), renderer)
    }

    #[test]
    fn test_chart_becomes_figure_with_caption() {
        // A 300x150 chart made of bars and an axis
        let mut page = Page::letter(0);
        page.drawings = vec![
            rect(100.0, 100.0, 102.0, 250.0),
            rect(100.0, 248.0, 400.0, 250.0),
            rect(120.0, 150.0, 160.0, 248.0),
            rect(200.0, 120.0, 240.0, 248.0),
        ];
        page.text_blocks = vec![block(
            "Figure 2: Monthly totals",
            BoundingBox::new(180.0, 270.0, 320.0, 280.0),
        )];

        let renderer = recorder();
        let assets = extract(&page, &renderer);
        assert_eq!(assets.len(), 1);
        let fig = &assets[0].asset;
        assert_eq!(fig.kind, AssetKind::Figure);
        assert_eq!(fig.local_index, 0);
        assert_eq!(fig.bounding_box, BoundingBox::new(100.0, 100.0, 400.0, 250.0));
        assert_eq!(fig.orientation, Orientation::Horizontal);
        assert_eq!(fig.caption.as_ref().map(|c| c.text.as_str()), Some("Monthly totals"));
        assert_eq!(fig.content_hash, content_hash(&assets[0].bytes));
    }

    #[test]
    fn test_surrounding_text_widens_box() {
        let mut page = Page::letter(0);
        page.drawings = vec![rect(100.0, 100.0, 400.0, 300.0)];
        // Axis label just left of the plot, within the 5pt margin
        page.text_blocks = vec![block("Revenue", BoundingBox::new(60.0, 180.0, 97.0, 190.0))];

        let assets = extract(&page, &recorder());
        assert_eq!(
            assets[0].asset.bounding_box,
            BoundingBox::new(60.0, 100.0, 400.0, 300.0)
        );
    }

    #[test]
    fn test_area_window_is_strict() {
        // 1000x1000 page: window is (62500, 250000)
        let options = ExtractOptions::new().with_area_fractions(0.0625, 0.25);
        let mut page = Page::new(0, 1000.0, 1000.0);

        page.drawings = vec![rect(0.0, 0.0, 250.0, 250.0)];
        let renderer = recorder();
        assert!(extract_with(&page, &options, &renderer).is_empty());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);

        page.drawings = vec![rect(0.0, 0.0, 250.0, 250.5)];
        assert_eq!(extract_with(&page, &options, &recorder()).len(), 1);

        page.drawings = vec![rect(0.0, 0.0, 500.0, 500.0)];
        assert!(extract_with(&page, &options, &recorder()).is_empty());
    }

    #[test]
    fn test_rejected_clusters_keep_indices() {
        let mut page = Page::letter(0);
        page.drawings = vec![
            // tiny ornament, rejected by area
            rect(10.0, 10.0, 20.0, 20.0),
            // real figure far away
            rect(100.0, 300.0, 400.0, 500.0),
        ];
        let assets = extract(&page, &recorder());
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].asset.local_index, 1);
    }

    #[test]
    fn test_extreme_ratio_rejected() {
        let mut page = Page::letter(0);
        // 600 x 50: area passes the window, ratio 12 does not
        page.drawings = vec![rect(6.0, 100.0, 606.0, 150.0)];
        assert!(extract(&page, &recorder()).is_empty());
    }
}
