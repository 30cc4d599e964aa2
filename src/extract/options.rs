//! Extraction options and configuration.

use serde::{Deserialize, Deserializer, Serialize};

/// Proximity grouping parameters for vector drawings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingParams {
    /// Margin, in points, added around each drawing before testing adjacency
    pub proximity: f64,

    /// Drawing count above which grouping runs in chunks
    pub chunk_size: usize,
}

impl GroupingParams {
    pub fn new(proximity: f64, chunk_size: usize) -> Self {
        Self {
            proximity,
            chunk_size,
        }
    }

    /// Parameters used while scanning documents for the catalog.
    pub fn scan() -> Self {
        Self::new(50.0, 800)
    }

    /// Parameters used while re-deriving figures for export.
    pub fn export() -> Self {
        Self::new(5.0, 1000)
    }
}

/// Grouping parameters as written in a config file; missing fields come
/// from the profile the field belongs to.
#[derive(Deserialize)]
struct PartialGrouping {
    proximity: Option<f64>,
    chunk_size: Option<usize>,
}

impl PartialGrouping {
    fn over(self, profile: GroupingParams) -> GroupingParams {
        GroupingParams {
            proximity: self.proximity.unwrap_or(profile.proximity),
            chunk_size: self.chunk_size.unwrap_or(profile.chunk_size),
        }
    }
}

fn scan_profile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GroupingParams, D::Error> {
    Ok(PartialGrouping::deserialize(deserializer)?.over(GroupingParams::scan()))
}

fn export_profile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GroupingParams, D::Error> {
    Ok(PartialGrouping::deserialize(deserializer)?.over(GroupingParams::export()))
}

/// Caption matching parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionOptions {
    /// Largest vertical distance, in points, between asset and caption
    pub max_distance: f64,

    /// Captions must be longer than this many characters
    pub min_length: usize,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            min_length: 10,
        }
    }
}

/// Options for extracting graphic assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Which asset kinds to extract
    pub mode: ExtractMode,

    /// Error handling mode for page-level failures
    pub error_mode: ErrorMode,

    /// Grouping used when building catalogs
    #[serde(deserialize_with = "scan_profile")]
    pub scan_grouping: GroupingParams,

    /// Grouping used when exporting referenced figures
    #[serde(deserialize_with = "export_profile")]
    pub export_grouping: GroupingParams,

    /// Figures must cover more than this fraction of the page
    pub min_area_fraction: f64,

    /// Figures must cover less than this fraction of the page
    pub max_area_fraction: f64,

    /// Rasterization scale for figures
    pub zoom: f64,

    pub caption: CaptionOptions,

    /// Directory prefix for asset paths in catalogs and exports
    pub asset_prefix: String,

    /// Whether to use parallel processing
    pub parallel: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set extract mode.
    pub fn with_mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    /// Extract embedded images only.
    pub fn images_only(mut self) -> Self {
        self.mode = ExtractMode::ImagesOnly;
        self
    }

    /// Extract vector figures only.
    pub fn figures_only(mut self) -> Self {
        self.mode = ExtractMode::FiguresOnly;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip failing pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    pub fn with_scan_grouping(mut self, params: GroupingParams) -> Self {
        self.scan_grouping = params;
        self
    }

    pub fn with_export_grouping(mut self, params: GroupingParams) -> Self {
        self.export_grouping = params;
        self
    }

    /// Use the scan grouping for export too, so every figure name
    /// re-derives to the same asset.
    pub fn consistent_grouping(mut self) -> Self {
        self.export_grouping = self.scan_grouping;
        self
    }

    /// Set the figure area window as fractions of the page area.
    pub fn with_area_fractions(mut self, min: f64, max: f64) -> Self {
        self.min_area_fraction = min;
        self.max_area_fraction = max;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_caption(mut self, caption: CaptionOptions) -> Self {
        self.caption = caption;
        self
    }

    pub fn with_asset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asset_prefix = prefix.into();
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Grouping parameters for a pass.
    pub fn grouping(&self, pass: Pass) -> GroupingParams {
        match pass {
            Pass::Scan => self.scan_grouping,
            Pass::Export => self.export_grouping,
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            mode: ExtractMode::All,
            error_mode: ErrorMode::Strict,
            scan_grouping: GroupingParams::scan(),
            export_grouping: GroupingParams::export(),
            min_area_fraction: 0.05,
            max_area_fraction: 0.30,
            zoom: 4.0,
            caption: CaptionOptions::default(),
            asset_prefix: "gfx".to_string(),
            parallel: true,
        }
    }
}

/// Which extraction a page goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Building the catalog
    Scan,
    /// Re-deriving referenced assets
    Export,
}

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// A failing page fails the whole document
    #[default]
    Strict,
    /// Skip failing pages with a warning; a page whose figures fail to
    /// render keeps its images
    Lenient,
}

/// What to extract from each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Embedded images and vector figures
    #[default]
    All,
    /// Embedded images only
    ImagesOnly,
    /// Vector figures only
    FiguresOnly,
}

impl ExtractMode {
    pub fn images(&self) -> bool {
        matches!(self, ExtractMode::All | ExtractMode::ImagesOnly)
    }

    pub fn figures(&self) -> bool {
        matches!(self, ExtractMode::All | ExtractMode::FiguresOnly)
    }
}
