//! Per-document asset catalog and its handoff formats.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{AssetKind, AssetName, DocumentId, GraphicAsset, Orientation};

/// Caption value handed out for assets without a caption.
pub const NO_CAPTION: &str = "None";

/// Assets registered for one document, in (page, kind, index) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCatalog {
    pub document_id: DocumentId,

    /// Source file, when the document was read from disk
    pub source: Option<PathBuf>,

    pub page_count: u32,

    /// Directory prefix used in descriptor paths (`gfx`)
    pub asset_prefix: String,

    /// Extracted plain text, pages joined by a space
    pub text: String,

    assets: Vec<GraphicAsset>,
}

impl DocumentCatalog {
    /// Build a catalog; assets are put into canonical order.
    pub fn new(
        document_id: DocumentId,
        source: Option<PathBuf>,
        page_count: u32,
        asset_prefix: impl Into<String>,
        mut assets: Vec<GraphicAsset>,
    ) -> Self {
        assets.sort_by_key(|a| (a.page_index, a.kind, a.local_index));
        Self {
            document_id,
            source,
            page_count,
            asset_prefix: asset_prefix.into(),
            text: String::new(),
            assets,
        }
    }

    /// Attach the document text.
    pub fn with_text(mut self, text: String) -> Self {
        self.text = text;
        self
    }

    pub fn assets(&self) -> &[GraphicAsset] {
        &self.assets
    }

    /// Number of registered assets, images and figures alike.
    pub fn num_images(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Canonical names, in catalog order.
    pub fn names(&self) -> Vec<AssetName> {
        self.assets.iter().map(GraphicAsset::name).collect()
    }

    /// Asset at a position on a page.
    pub fn find(&self, kind: AssetKind, page_index: u32, local_index: u32) -> Option<&GraphicAsset> {
        self.assets
            .iter()
            .find(|a| a.kind == kind && a.page_index == page_index && a.local_index == local_index)
    }

    /// Asset registered under `name`.
    pub fn get(&self, name: &AssetName) -> Option<&GraphicAsset> {
        if name.document_id != self.document_id {
            return None;
        }
        self.find(name.kind, name.page_index, name.local_index)
            .filter(|a| a.hash_prefix() == name.hash_prefix)
    }

    /// Descriptor for one asset.
    pub fn descriptor(&self, asset: &GraphicAsset) -> AssetDescriptor {
        AssetDescriptor {
            path: format!("{}/{}", self.asset_prefix, asset.name()),
            caption: asset
                .caption
                .as_ref()
                .map(|c| c.text.clone())
                .unwrap_or_else(|| NO_CAPTION.to_string()),
            orientation: asset.orientation,
        }
    }

    /// Descriptors handed to the generator, in catalog order.
    pub fn descriptors(&self) -> Vec<AssetDescriptor> {
        self.assets.iter().map(|a| self.descriptor(a)).collect()
    }

    /// One JSON object per asset, newline separated.
    pub fn images_passage(&self) -> String {
        self.assets
            .iter()
            .map(|a| self.descriptor(a).passage_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Metadata record stored next to the document text.
    pub fn metadata(&self) -> CatalogMetadata {
        CatalogMetadata {
            num_images: self.num_images(),
            pdf_path: self
                .source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            images_passage: self.images_passage(),
        }
    }
}

/// What the generator sees of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// `<asset_prefix>/<name>`
    pub path: String,

    /// Caption body, or `"None"`
    pub caption: String,

    pub orientation: Orientation,
}

impl AssetDescriptor {
    /// `{"path": "...", "caption": "...", "orientation": "..."}`
    pub fn passage_line(&self) -> String {
        format!(
            "{{\"path\": {}, \"caption\": {}, \"orientation\": {}}}",
            json_string(&self.path),
            json_string(&self.caption),
            json_string(self.orientation.as_str())
        )
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Metadata of a scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub num_images: usize,
    pub pdf_path: String,
    pub images_passage: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::model::Caption;

    fn asset(page: u32, kind: AssetKind, index: u32, caption: Option<&str>) -> GraphicAsset {
        GraphicAsset {
            document_id: DocumentId::new("paper").unwrap(),
            page_index: page,
            local_index: index,
            kind,
            content_hash: format!("{:08x}{}", page * 100 + index, "0".repeat(24)),
            bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            orientation: Orientation::Square,
            caption: caption.map(|t| Caption {
                label: None,
                text: t.to_string(),
            }),
        }
    }

    fn catalog() -> DocumentCatalog {
        DocumentCatalog::new(
            DocumentId::new("paper").unwrap(),
            Some(PathBuf::from("papers/paper.pdf")),
            3,
            "gfx",
            vec![
                asset(1, AssetKind::Figure, 0, None),
                asset(1, AssetKind::Image, 2, Some("Growth \"by\" region")),
                asset(0, AssetKind::Image, 0, Some("Results")),
            ],
        )
    }

    #[test]
    fn test_canonical_order() {
        let kinds: Vec<(u32, AssetKind, u32)> = catalog()
            .assets()
            .iter()
            .map(|a| (a.page_index, a.kind, a.local_index))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (0, AssetKind::Image, 0),
                (1, AssetKind::Image, 2),
                (1, AssetKind::Figure, 0),
            ]
        );
    }

    #[test]
    fn test_images_passage_format() {
        let passage = catalog().images_passage();
        let lines: Vec<&str> = passage.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            r#"{"path": "gfx/docpaper_page0_img0_hash00000000.png", "caption": "Results", "orientation": "square"}"#
        );
        assert!(lines[1].contains(r#""caption": "Growth \"by\" region""#));
        assert!(lines[2].contains(r#""caption": "None""#));

        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["path"].as_str().unwrap().starts_with("gfx/doc"));
        }
    }

    #[test]
    fn test_metadata() {
        let meta = catalog().metadata();
        assert_eq!(meta.num_images, 3);
        assert_eq!(meta.pdf_path, "papers/paper.pdf");
        assert_eq!(meta.images_passage.lines().count(), 3);
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = catalog();
        let name = catalog.assets()[1].name();
        assert_eq!(catalog.get(&name).map(|a| a.local_index), Some(2));

        let mut wrong_hash = name.clone();
        wrong_hash.hash_prefix = "ffffffff".to_string();
        assert!(catalog.get(&wrong_hash).is_none());
    }
}
