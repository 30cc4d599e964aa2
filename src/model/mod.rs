//! Data model: pages as read from a document, and the graphic assets
//! extracted from them.

mod asset;
mod catalog;
mod image;
mod page;

pub use asset::{
    content_hash, AssetKind, AssetName, Caption, DocumentId, GraphicAsset, Orientation,
    HASH_PREFIX_LEN, HORIZONTAL_MIN_RATIO, MAX_ACCEPTED_RATIO, MIN_ACCEPTED_RATIO,
    VERTICAL_MAX_RATIO,
};
pub use catalog::{AssetDescriptor, CatalogMetadata, DocumentCatalog, NO_CAPTION};
pub use image::ImageData;
pub use page::{Color, FillRule, ObjectId, Page, Paint, RasterImage, VectorPrimitive};
