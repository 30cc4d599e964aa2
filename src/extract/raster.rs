//! Embedded raster images as assets.

use std::borrow::Cow;

use crate::model::{content_hash, AssetKind, DocumentId, GraphicAsset, Orientation, Page};

use super::caption::CaptionResolver;
use super::ExtractedAsset;

/// Turn the images placed on a page into assets.
///
/// Every placed image consumes a local index, including images whose
/// placement is unknown or whose shape is rejected, so indices line up
/// between runs regardless of filtering. `keep` is asked before any
/// hashing or caption work.
pub(crate) fn extract_images<'p, F>(
    page: &'p Page,
    document_id: &DocumentId,
    captions: &CaptionResolver,
    keep: F,
) -> Vec<ExtractedAsset<'p>>
where
    F: Fn(u32) -> bool,
{
    let mut assets = Vec::new();

    for (index, image) in page.images.iter().enumerate() {
        let local_index = index as u32;
        if !keep(local_index) {
            continue;
        }
        let Some(bbox) = image.bbox else {
            log::debug!(
                "Page {}: image {} has no placement, skipped",
                page.index,
                local_index
            );
            continue;
        };
        let Some(orientation) = Orientation::of_box(&bbox) else {
            log::debug!(
                "Page {}: image {} rejected, ratio {:.2}",
                page.index,
                local_index,
                bbox.aspect_ratio()
            );
            continue;
        };

        let bytes = image.data.bytes.as_slice();
        assets.push(ExtractedAsset {
            asset: GraphicAsset {
                document_id: document_id.clone(),
                page_index: page.index,
                local_index,
                kind: AssetKind::Image,
                content_hash: content_hash(bytes),
                bounding_box: bbox,
                orientation,
                caption: captions.resolve(&bbox, &page.text_blocks),
            },
            bytes: Cow::Borrowed(bytes),
        });
    }

    assets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::model::{ImageData, RasterImage};

    fn image(id: u32, bbox: Option<BoundingBox>, bytes: &[u8]) -> RasterImage {
        RasterImage {
            object_id: (id, 0),
            bbox,
            data: ImageData::new(bytes.to_vec(), 10, 10),
        }
    }

    fn page() -> Page {
        let mut page = Page::letter(2);
        page.images = vec![
            image(5, Some(BoundingBox::new(0.0, 0.0, 300.0, 200.0)), b"first"),
            image(6, None, b"unplaced"),
            image(7, Some(BoundingBox::new(0.0, 300.0, 500.0, 310.0)), b"banner"),
            image(8, Some(BoundingBox::new(0.0, 400.0, 100.0, 300.0 + 400.0)), b"tall"),
        ];
        page
    }

    #[test]
    fn test_indices_survive_rejections() {
        let page = page();
        let id = DocumentId::new("doc").unwrap();
        let assets = extract_images(&page, &id, &CaptionResolver::default(), |_| true);

        let found: Vec<(u32, Orientation)> = assets
            .iter()
            .map(|a| (a.asset.local_index, a.asset.orientation))
            .collect();
        assert_eq!(
            found,
            vec![(0, Orientation::Horizontal), (3, Orientation::Vertical)]
        );
        assert_eq!(assets[0].asset.page_index, 2);
        assert_eq!(assets[0].asset.content_hash, content_hash(b"first"));
        assert_eq!(&*assets[0].bytes, b"first");
        assert!(matches!(assets[0].bytes, Cow::Borrowed(_)));
    }

    #[test]
    fn test_keep_filter() {
        let page = page();
        let id = DocumentId::new("doc").unwrap();
        let assets = extract_images(&page, &id, &CaptionResolver::default(), |i| i == 3);
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].asset.local_index, 3);
    }
}
