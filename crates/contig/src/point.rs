//! Point contiguity: two areas are neighbors when any of their boundary
//! vertices coincide within a small threshold.
//!
//! All ring vertices are flattened into one R-tree tagged by owning area.
//! Each vertex then gathers every other vertex within the threshold through
//! an adaptive nearest-neighbor search: the candidate count starts from a
//! running average of earlier hits and doubles until the within-threshold
//! prefix comes back smaller than the request, proving the index exhausted
//! the coincident set rather than the count limit. The doubling is capped at
//! the total point count so the loop terminates on any input.

use ahash::{AHashMap, AHashSet};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::rings::Ring;
use crate::rook::pair_key;

/// Distance (in source coordinate units) within which two vertices are
/// considered the same location.
pub(crate) const COINCIDENT_THRESHOLD: f64 = 1e-5;

type VertexPoint = GeomWithData<[f64; 2], u32>;

/// Unordered area-index pairs with at least one coincident vertex.
pub(crate) fn point_pairs(rings: &[Ring]) -> Vec<(u32, u32)> {
    let points: Vec<VertexPoint> = rings
        .iter()
        .flat_map(|ring| ring.points.iter().map(|p| VertexPoint::new([p.x, p.y], ring.area)))
        .collect();

    let total = points.len();
    let tree = RTree::bulk_load(points.clone());
    let threshold_sq = COINCIDENT_THRESHOLD * COINCIDENT_THRESHOLD;

    let mut overlaps: AHashMap<u32, AHashSet<u32>> = AHashMap::new();
    let mut start_n: usize = 2;

    for (i, point) in points.iter().enumerate() {
        let coincident = overlaps.entry(point.data).or_default();

        let mut search_n = start_n.max(2);
        loop {
            let within: Vec<u32> = tree
                .nearest_neighbor_iter_with_distance_2(point.geom())
                .take(search_n)
                .take_while(|(_, distance_sq)| *distance_sq <= threshold_sq)
                .map(|(neighbor, _)| neighbor.data)
                .collect();

            if within.len() < search_n || search_n >= total {
                coincident.extend(within.into_iter().filter(|&area| area != point.data));
                break;
            }
            search_n *= 2;
        }

        // Seed the next vertex's search from a running average of hits so
        // dense meshes do not restart from 2 every time.
        let size = coincident.len() as f64;
        let next = (start_n as f64 + (size - start_n as f64) / (i + 1) as f64).ceil();
        start_n = (next as usize).max(1);
    }

    let mut pairs: AHashSet<(u32, u32)> = AHashSet::new();
    for (area, coincident) in &overlaps {
        for &other in coincident {
            pairs.insert(pair_key(*area, other));
        }
    }
    pairs.into_iter().collect()
}
