//! Rook contiguity: two areas are adjacent when any pair of their boundary
//! segments shares a collinear overlap of positive length.
//!
//! Candidate ring pairs are pruned with an R-tree over per-ring bounding
//! boxes before the O(segments²) overlap test runs; the prune is what keeps
//! the otherwise O(n²) pair scan tractable for real area counts.

use ahash::AHashSet;
use geo::Rect;
use rstar::{AABB, RTree, RTreeObject};

use crate::rings::Ring;
use crate::segment::{COLLINEAR_TOLERANCE, Segment, rects_overlap, segments_overlap};

/// Fixed margin (in source coordinate units) applied to bounding boxes
/// before the overlap pre-filter, absorbing floating-point boundary noise.
pub(crate) const BBOX_MARGIN: f64 = 5.0;

/// A ring's bounding box in the R-tree, associated with the ring by index.
#[derive(Debug, Clone)]
struct RingBox {
    idx: usize,
    bbox: Rect<f64>,
}

impl RTreeObject for RingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Unordered area-index pairs adjacent under rook contiguity.
pub(crate) fn rook_pairs(rings: &[Ring]) -> Vec<(u32, u32)> {
    let arcs: Vec<Vec<Segment>> = rings.iter().map(Ring::segments).collect();

    let rtree = RTree::bulk_load(
        rings.iter().enumerate().map(|(idx, ring)| RingBox { idx, bbox: ring.bbox }).collect(),
    );

    let mut pairs: AHashSet<(u32, u32)> = AHashSet::new();

    for (i, ring) in rings.iter().enumerate() {
        let search = AABB::from_corners(
            [ring.bbox.min().x - BBOX_MARGIN, ring.bbox.min().y - BBOX_MARGIN],
            [ring.bbox.max().x + BBOX_MARGIN, ring.bbox.max().y + BBOX_MARGIN],
        );

        for cand in rtree.locate_in_envelope_intersecting(&search) {
            let j = cand.idx;
            if j <= i {
                continue; // check each unordered ring pair once
            }
            let other = &rings[j];
            if other.area == ring.area {
                continue;
            }
            let key = pair_key(ring.area, other.area);
            if pairs.contains(&key) {
                continue;
            }
            if !rects_overlap(&ring.bbox, &other.bbox, BBOX_MARGIN) {
                continue;
            }
            if arcs_overlap(&arcs[i], &arcs[j]) {
                pairs.insert(key);
            }
        }
    }

    pairs.into_iter().collect()
}

#[inline]
pub(crate) fn pair_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// True if any cross-product of the two segment lists overlaps beyond the
/// zero threshold.
fn arcs_overlap(a: &[Segment], b: &[Segment]) -> bool {
    a.iter().any(|seg_a| {
        b.iter().any(|seg_b| segments_overlap(seg_a, seg_b, COLLINEAR_TOLERANCE) > 0.0)
    })
}
