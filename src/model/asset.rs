//! Graphic assets and their content-addressed names.

use std::fmt;
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

/// Aspect ratio at or above which an asset is horizontal.
pub const HORIZONTAL_MIN_RATIO: f64 = 1.5;

/// Aspect ratio at or below which an asset is vertical.
pub const VERTICAL_MAX_RATIO: f64 = 0.67;

/// Assets with a ratio below this are slivers and are dropped.
pub const MIN_ACCEPTED_RATIO: f64 = 0.1;

/// Assets with a ratio above this are slivers and are dropped.
pub const MAX_ACCEPTED_RATIO: f64 = 10.0;

/// Number of hex digits of the content hash carried in asset names.
pub const HASH_PREFIX_LEN: usize = 8;

/// Lowercase hex MD5 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Identifier of a source document, restricted to `[A-Za-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate an id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if !id.is_empty() && id.chars().all(is_id_char) {
            Ok(Self(id))
        } else {
            Err(Error::InvalidDocumentId(id))
        }
    }

    /// Build an id from arbitrary text, replacing every disallowed character
    /// with `_`.
    pub fn sanitized(raw: &str) -> Self {
        let id: String = raw
            .chars()
            .map(|c| if is_id_char(c) { c } else { '_' })
            .collect();
        if id.is_empty() {
            Self("document".to_string())
        } else {
            Self(id)
        }
    }

    /// Id derived from a file's stem (`reports/Q3 results.pdf` -> `Q3_results`).
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::sanitized(&stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Kind of graphic asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Embedded raster image
    Image,
    /// Rasterized cluster of vector drawings
    Figure,
}

impl AssetKind {
    /// Tag used in asset names.
    pub fn tag(&self) -> &'static str {
        match self {
            AssetKind::Image => "img",
            AssetKind::Figure => "fig",
        }
    }

    /// Inverse of [`AssetKind::tag`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "img" => Some(AssetKind::Image),
            "fig" => Some(AssetKind::Figure),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Figure => write!(f, "figure"),
        }
    }
}

/// Coarse aspect-ratio classification used for layout decisions downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
    Square,
}

impl Orientation {
    /// Classify a width/height ratio.
    ///
    /// Returns `None` for ratios outside `[0.1, 10]` (and NaN); such assets
    /// are rejected rather than registered.
    pub fn classify(ratio: f64) -> Option<Self> {
        if !(MIN_ACCEPTED_RATIO..=MAX_ACCEPTED_RATIO).contains(&ratio) {
            return None;
        }
        Some(if ratio >= HORIZONTAL_MIN_RATIO {
            Orientation::Horizontal
        } else if ratio <= VERTICAL_MAX_RATIO {
            Orientation::Vertical
        } else {
            Orientation::Square
        })
    }

    /// Classify a box by its aspect ratio.
    pub fn of_box(bbox: &BoundingBox) -> Option<Self> {
        Self::classify(bbox.aspect_ratio())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
            Orientation::Square => "square",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    /// Figure label when the caption starts with one (`Figure 3`, `Fig. 2`)
    pub label: Option<String>,

    /// Caption body with the label removed
    pub text: String,
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An extracted image or figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicAsset {
    pub document_id: DocumentId,

    /// Page index (0-based)
    pub page_index: u32,

    /// Position among same-kind candidates on the page
    pub local_index: u32,

    pub kind: AssetKind,

    /// Lowercase hex digest of the encoded bytes
    pub content_hash: String,

    pub bounding_box: BoundingBox,

    pub orientation: Orientation,

    pub caption: Option<Caption>,
}

impl GraphicAsset {
    /// Canonical name of the asset.
    pub fn name(&self) -> AssetName {
        AssetName {
            document_id: self.document_id.clone(),
            page_index: self.page_index,
            kind: self.kind,
            local_index: self.local_index,
            hash_prefix: self.hash_prefix().to_string(),
        }
    }

    /// First eight hex digits of the content hash.
    pub fn hash_prefix(&self) -> &str {
        let end = HASH_PREFIX_LEN.min(self.content_hash.len());
        &self.content_hash[..end]
    }
}

/// Canonical, content-addressed name of an asset:
/// `doc<DOC>_page<PAGE>_<img|fig><IDX>_hash<H8>.png`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetName {
    pub document_id: DocumentId,
    pub page_index: u32,
    pub kind: AssetKind,
    pub local_index: u32,
    pub hash_prefix: String,
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "doc{}_page{}_{}{}_hash{}.png",
            self.document_id,
            self.page_index,
            self.kind.tag(),
            self.local_index,
            self.hash_prefix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(kind: AssetKind, hash: &str) -> GraphicAsset {
        GraphicAsset {
            document_id: DocumentId::new("report_2024").unwrap(),
            page_index: 3,
            local_index: 1,
            kind,
            content_hash: hash.to_string(),
            bounding_box: BoundingBox::new(0.0, 0.0, 300.0, 200.0),
            orientation: Orientation::Horizontal,
            caption: None,
        }
    }

    #[test]
    fn test_asset_name_format() {
        let a = asset(AssetKind::Image, "0123456789abcdef0123456789abcdef");
        assert_eq!(
            a.name().to_string(),
            "docreport_2024_page3_img1_hash01234567.png"
        );
        let f = asset(AssetKind::Figure, "fedcba9876543210fedcba9876543210");
        assert_eq!(
            f.name().to_string(),
            "docreport_2024_page3_fig1_hashfedcba98.png"
        );
    }

    #[test]
    fn test_content_hash_is_md5_hex() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(content_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_ne!(content_hash(b"abc")[..8], content_hash(b"abd")[..8]);
    }

    #[test]
    fn test_orientation_boundaries() {
        assert_eq!(Orientation::classify(1.5), Some(Orientation::Horizontal));
        assert_eq!(Orientation::classify(0.67), Some(Orientation::Vertical));
        assert_eq!(Orientation::classify(1.0), Some(Orientation::Square));
        assert_eq!(Orientation::classify(1.49), Some(Orientation::Square));
        assert_eq!(Orientation::classify(0.671), Some(Orientation::Square));
        assert_eq!(Orientation::classify(0.09), None);
        assert_eq!(Orientation::classify(10.5), None);
        assert_eq!(Orientation::classify(f64::NAN), None);
    }

    #[test]
    fn test_orientation_total_over_open_interval() {
        let mut ratio = 0.1001;
        while ratio < 10.0 {
            assert!(Orientation::classify(ratio).is_some(), "gap at {}", ratio);
            ratio += 0.0137;
        }
    }

    #[test]
    fn test_degenerate_box_rejected() {
        let flat = BoundingBox::new(0.0, 5.0, 50.0, 5.0);
        assert_eq!(Orientation::of_box(&flat), None);
    }

    #[test]
    fn test_document_id_rules() {
        assert!(DocumentId::new("paper_v2").is_ok());
        assert!(DocumentId::new("paper-v2").is_err());
        assert!(DocumentId::new("").is_err());
        assert_eq!(DocumentId::sanitized("paper-v2.final").as_str(), "paper_v2_final");
        assert_eq!(
            DocumentId::from_path(Path::new("/tmp/Q3 results.pdf")).as_str(),
            "Q3_results"
        );
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(AssetKind::from_tag("img"), Some(AssetKind::Image));
        assert_eq!(AssetKind::from_tag(AssetKind::Figure.tag()), Some(AssetKind::Figure));
        assert_eq!(AssetKind::from_tag("tab"), None);
    }
}
