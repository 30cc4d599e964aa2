//! Proximity grouping of vector drawings into figure candidates.
//!
//! Every drawing box is grown by the proximity margin; two drawings are
//! adjacent when their grown boxes overlap, and each connected component
//! becomes one candidate. Large inputs are grouped chunk by chunk and the
//! chunk results grouped once more, which can miss merges a single pass
//! would make across chunk borders.

use crate::geometry::{merge_boxes, BoundingBox};
use crate::model::VectorPrimitive;
use crate::spatial::SpatialIndex;

use super::options::GroupingParams;

/// A connected group of drawings.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Union of the members' raw boxes
    pub bbox: BoundingBox,

    /// Indices into the grouped input, ascending
    pub members: Vec<usize>,
}

/// Group the drawings of a page. Drawings without a box are skipped.
pub fn group_primitives(primitives: &[VectorPrimitive], params: GroupingParams) -> Vec<Cluster> {
    let boxes: Vec<Option<BoundingBox>> = primitives.iter().map(|p| p.rect).collect();
    group_boxes(&boxes, params)
}

/// Group boxes into connected components, ordered by lowest member index.
pub fn group_boxes(boxes: &[Option<BoundingBox>], params: GroupingParams) -> Vec<Cluster> {
    let items: Vec<Cluster> = boxes
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| {
            b.filter(BoundingBox::is_finite).map(|bbox| Cluster {
                bbox,
                members: vec![i],
            })
        })
        .collect();

    if params.chunk_size == 0 || items.len() <= params.chunk_size {
        return connected_components(&items, params.proximity);
    }

    log::debug!(
        "Grouping {} drawings in chunks of {}",
        items.len(),
        params.chunk_size
    );
    let partial: Vec<Cluster> = items
        .chunks(params.chunk_size)
        .flat_map(|chunk| connected_components(chunk, params.proximity))
        .collect();
    connected_components(&partial, params.proximity)
}

/// Merge items whose grown boxes overlap, transitively.
fn connected_components(items: &[Cluster], proximity: f64) -> Vec<Cluster> {
    let expanded: Vec<BoundingBox> = items.iter().map(|c| c.bbox.expand(proximity)).collect();
    let index = SpatialIndex::bulk_load(&expanded);

    let mut visited = vec![false; items.len()];
    let mut clusters = Vec::new();
    let mut stack = Vec::new();

    for start in 0..items.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let mut component = Vec::new();
        while let Some(node) = stack.pop() {
            component.push(node);
            for neighbor in index.query_overlaps(&expanded[node]) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }

        let Some(bbox) = merge_boxes(component.iter().map(|&i| &items[i].bbox)) else {
            continue;
        };
        let mut members: Vec<usize> = component
            .iter()
            .flat_map(|&i| items[i].members.iter().copied())
            .collect();
        members.sort_unstable();
        clusters.push(Cluster { bbox, members });
    }

    clusters.sort_by_key(|c| c.members.first().copied().unwrap_or(usize::MAX));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Option<BoundingBox> {
        Some(BoundingBox::new(x, y, x + size, y + size))
    }

    fn members(clusters: &[Cluster]) -> Vec<Vec<usize>> {
        clusters.iter().map(|c| c.members.clone()).collect()
    }

    fn assert_partition(clusters: &[Cluster], boxes: &[Option<BoundingBox>]) {
        let mut seen: Vec<usize> = clusters.iter().flat_map(|c| c.members.clone()).collect();
        seen.sort_unstable();
        let expected: Vec<usize> = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_nearby_boxes_merge() {
        let boxes = vec![
            square(0.0, 0.0, 10.0),
            square(18.0, 0.0, 10.0),
            square(200.0, 200.0, 10.0),
        ];
        let clusters = group_boxes(&boxes, GroupingParams::new(5.0, 1000));
        assert_eq!(members(&clusters), vec![vec![0, 1], vec![2]]);
        assert_eq!(clusters[0].bbox, BoundingBox::new(0.0, 0.0, 28.0, 10.0));
    }

    #[test]
    fn test_chain_is_transitive() {
        let boxes: Vec<_> = (0..6).map(|i| square(i as f64 * 12.0, 0.0, 10.0)).collect();
        let clusters = group_boxes(&boxes, GroupingParams::new(1.0, 1000));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_threshold_changes_grouping() {
        let boxes = vec![square(0.0, 0.0, 10.0), square(40.0, 0.0, 10.0)];
        assert_eq!(group_boxes(&boxes, GroupingParams::scan()).len(), 1);
        assert_eq!(group_boxes(&boxes, GroupingParams::export()).len(), 2);
    }

    #[test]
    fn test_missing_rects_skipped() {
        let boxes = vec![None, square(0.0, 0.0, 10.0), None];
        let clusters = group_boxes(&boxes, GroupingParams::export());
        assert_eq!(members(&clusters), vec![vec![1]]);
        assert!(group_boxes(&[], GroupingParams::export()).is_empty());
    }

    #[test]
    fn test_partition_holds_for_scattered_input() {
        let boxes: Vec<_> = (0..300)
            .map(|i| {
                if i % 17 == 0 {
                    None
                } else {
                    square((i * 37 % 500) as f64, (i * 91 % 700) as f64, 6.0)
                }
            })
            .collect();
        for params in [
            GroupingParams::new(5.0, 1000),
            GroupingParams::new(5.0, 64),
            GroupingParams::new(50.0, 800),
        ] {
            let clusters = group_boxes(&boxes, params);
            assert_partition(&clusters, &boxes);
            let firsts: Vec<usize> = clusters.iter().map(|c| c.members[0]).collect();
            let mut sorted = firsts.clone();
            sorted.sort_unstable();
            assert_eq!(firsts, sorted);
        }
    }

    #[test]
    fn test_chunked_matches_unchunked_for_separated_groups() {
        // Ten tight groups of five, far apart from each other
        let boxes: Vec<_> = (0..50)
            .map(|i| square((i / 5) as f64 * 100.0 + (i % 5) as f64 * 3.0, 0.0, 2.0))
            .collect();
        let whole = group_boxes(&boxes, GroupingParams::new(2.0, 1000));
        let chunked = group_boxes(&boxes, GroupingParams::new(2.0, 7));
        assert_eq!(whole.len(), 10);
        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_below_chunk_size_is_single_pass() {
        let boxes: Vec<_> = (0..20).map(|i| square(i as f64 * 30.0, 0.0, 5.0)).collect();
        assert_eq!(
            group_boxes(&boxes, GroupingParams::new(5.0, 20)),
            group_boxes(&boxes, GroupingParams::new(5.0, 0))
        );
    }
}
