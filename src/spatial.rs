//! R-tree overlap index over page-space boxes.
//!
//! Boxes live in a caller-owned arena and are referred to by integer id; the
//! index only stores `(id, envelope)` pairs.

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::BoundingBox;

#[derive(Debug, Clone, PartialEq)]
struct IndexedBox {
    id: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.x0, bbox.y0], [bbox.x1, bbox.y1])
}

/// Spatial index answering "which boxes overlap this one".
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedBox>,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index where box `i` of the slice gets id `i`.
    pub fn bulk_load(boxes: &[BoundingBox]) -> Self {
        let items = boxes
            .iter()
            .enumerate()
            .map(|(id, bbox)| IndexedBox {
                id,
                envelope: to_aabb(bbox),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Add a box under `id`.
    pub fn insert(&mut self, id: usize, bbox: &BoundingBox) {
        self.tree.insert(IndexedBox {
            id,
            envelope: to_aabb(bbox),
        });
    }

    /// Ids of every box whose envelope intersects `bbox`, touching included.
    ///
    /// Sorted ascending so callers get the same adjacency order on every run.
    pub fn query_overlaps(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(bbox))
            .map(|item| item.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
