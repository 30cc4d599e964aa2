//! Recovering asset references from generated text.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{AssetKind, AssetName, DocumentCatalog, DocumentId, GraphicAsset};

const NAME_PATTERN: &str = r"doc(?P<doc>[A-Za-z0-9_]+)_page(?P<page>\d+)_(?P<kind>img|fig)(?P<idx>\d+)_hash(?P<hash>[a-fA-F0-9]{8})\.png";

/// An asset name found in text.
///
/// The hash prefix is kept as written, so a prefix in upper case only
/// matches an asset whose digest has no letters in those positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetReference {
    pub document_id: DocumentId,
    pub page_index: u32,
    pub kind: AssetKind,
    pub local_index: u32,
    pub hash_prefix: String,
}

impl AssetReference {
    /// Whether `asset` is the one this reference names.
    pub fn matches(&self, asset: &GraphicAsset) -> bool {
        asset.document_id == self.document_id
            && asset.page_index == self.page_index
            && asset.kind == self.kind
            && asset.local_index == self.local_index
            && asset.content_hash.starts_with(&self.hash_prefix)
    }

    fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        // Numbers too large for u32 cannot name a page or an index.
        Some(Self {
            document_id: DocumentId::new(&caps["doc"]).ok()?,
            page_index: caps["page"].parse().ok()?,
            kind: AssetKind::from_tag(&caps["kind"])?,
            local_index: caps["idx"].parse().ok()?,
            hash_prefix: caps["hash"].to_string(),
        })
    }
}

impl From<AssetName> for AssetReference {
    fn from(name: AssetName) -> Self {
        Self {
            document_id: name.document_id,
            page_index: name.page_index,
            kind: name.kind,
            local_index: name.local_index,
            hash_prefix: name.hash_prefix,
        }
    }
}

impl fmt::Display for AssetReference {
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

impl FromStr for AssetReference {
    type Err = Error;

    /// Parse a complete asset name.
    fn from_str(s: &str) -> Result<Self> {
        static FULL_NAME: OnceLock<Regex> = OnceLock::new();
        FULL_NAME
            .get_or_init(|| Regex::new(&format!("^{}$", NAME_PATTERN)).unwrap())
            .captures(s)
            .and_then(|caps| Self::from_captures(&caps))
            .ok_or_else(|| Error::InvalidAssetName(s.to_string()))
    }
}

/// Finds asset names in free text.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    pattern: Regex,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(NAME_PATTERN).unwrap(),
        }
    }

    /// Every name occurring in `text`, in order of appearance, duplicates kept.
    pub fn resolve(&self, text: &str) -> Vec<AssetReference> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| AssetReference::from_captures(&caps))
            .collect()
    }

    /// Catalog assets named in `text`, in order of appearance.
    ///
    /// References that match nothing are dropped.
    pub fn select<'c>(
        &self,
        text: &str,
        catalogs: &'c [DocumentCatalog],
    ) -> Vec<&'c GraphicAsset> {
        self.resolve(text)
            .iter()
            .filter_map(|reference| {
                let found = catalogs
                    .iter()
                    .filter(|c| c.document_id == reference.document_id)
                    .flat_map(|c| c.assets())
                    .find(|a| reference.matches(a));
                if found.is_none() {
                    log::debug!("Reference {} matches no registered asset", reference);
                }
                found
            })
            .collect()
    }
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the asset names occurring in `text`.
pub fn resolve_references(text: &str) -> Vec<AssetReference> {
    ReferenceResolver::new().resolve(text)
}

/// Catalog assets named in `text`.
pub fn select_referenced<'c>(text: &str, catalogs: &'c [DocumentCatalog]) -> Vec<&'c GraphicAsset> {
    ReferenceResolver::new().select(text, catalogs)
}
