use ahash::AHashMap;
use anyhow::Result;
use contig::{AreaId, Method, NeighborPair};
use smallvec::SmallVec;

use crate::area::{Area, compute_neighbors};

/// One area's outgoing weights, in insertion order.
type Row = SmallVec<[(AreaId, f64); 8]>;

/// Sparse, row-keyed spatial weight matrix.
///
/// Rows map an area to its neighbors and are created lazily on first write.
/// When built from a neighbor pair list the rows are standardized: every
/// non-empty row's weights sum to 1. Each row keeps insertion order so that
/// downstream floating-point accumulation is deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct WeightMatrix {
    rows: AHashMap<AreaId, Row>,
}

impl WeightMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row-standardized matrix from an unordered neighbor pair list.
    ///
    /// Pairs are symmetrized first (each unordered pair contributes a
    /// directed edge both ways) so adjacency is queryable from either
    /// endpoint. Grouping by source then assigns every neighbor `1/degree`.
    pub fn from_pairs(pairs: &[NeighborPair]) -> Self {
        let mut degree: AHashMap<&AreaId, usize> = AHashMap::new();
        for pair in pairs {
            *degree.entry(pair.a()).or_insert(0) += 1;
            *degree.entry(pair.b()).or_insert(0) += 1;
        }

        let mut matrix = Self::new();
        for pair in pairs {
            matrix.set(pair.a().clone(), pair.b().clone(), 1.0 / degree[pair.a()] as f64);
            matrix.set(pair.b().clone(), pair.a().clone(), 1.0 / degree[pair.b()] as f64);
        }
        matrix
    }

    /// Set a single weight, creating the source's row if needed. An existing
    /// entry for the same neighbor is overwritten in place.
    pub fn set(&mut self, source: AreaId, neighbor: AreaId, weight: f64) {
        let row = self.rows.entry(source).or_default();
        match row.iter_mut().find(|(id, _)| *id == neighbor) {
            Some(entry) => entry.1 = weight,
            None => row.push((neighbor, weight)),
        }
    }

    /// The full weight row for an area, if one exists.
    #[inline]
    pub fn weights(&self, id: &AreaId) -> Option<&[(AreaId, f64)]> {
        self.rows.get(id).map(|row| row.as_slice())
    }

    /// A single weight, if both the row and the entry exist.
    pub fn weight(&self, source: &AreaId, neighbor: &AreaId) -> Option<f64> {
        self.weights(source)?.iter().find(|(id, _)| id == neighbor).map(|(_, w)| *w)
    }

    /// True if the area has a weight row.
    #[inline]
    pub fn contains(&self, id: &AreaId) -> bool { self.rows.contains_key(id) }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize { self.rows.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Iterator over row keys (arbitrary order).
    pub fn ids(&self) -> impl Iterator<Item = &AreaId> {
        self.rows.keys()
    }

    /// Size of the largest row, or 0 when empty.
    pub fn max_row_len(&self) -> usize {
        self.rows.values().map(SmallVec::len).max().unwrap_or(0)
    }
}

/// Detect neighbors and build the row-standardized weight matrix in one step.
pub fn compute_weight_matrix(areas: &[Area], method: Method) -> Result<WeightMatrix> {
    let pairs = compute_neighbors(areas, method)?;
    Ok(WeightMatrix::from_pairs(&pairs))
}
