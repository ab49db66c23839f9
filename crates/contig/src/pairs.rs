//! Neighbor pairs and the contiguity entry point.

use std::str::FromStr;

use ahash::AHashSet;
use geo::Geometry;

use crate::id::AreaId;
use crate::point::point_pairs;
use crate::rings::decompose;
use crate::rook::rook_pairs;
use crate::ContigError;

/// Contiguity rule used for neighbor detection.
///
/// Rook requires a shared boundary edge segment; queen adds areas that share
/// only a boundary point (rook ∪ point contiguity).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    Rook,
    #[default]
    Queen,
}

impl FromStr for Method {
    type Err = ContigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rook" => Ok(Self::Rook),
            "queen" => Ok(Self::Queen),
            other => Err(ContigError::UnknownMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rook => write!(f, "rook"),
            Self::Queen => write!(f, "queen"),
        }
    }
}

/// An unordered pair of adjacent areas.
///
/// Canonical form: the lesser id (by `Ord`) is always first, so a pair and
/// its mirror collapse to one key. Self-pairs cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NeighborPair {
    a: AreaId,
    b: AreaId,
}

impl NeighborPair {
    /// Canonicalize an unordered pair; `None` when both sides are the same
    /// area.
    pub fn new(x: AreaId, y: AreaId) -> Option<Self> {
        if x == y {
            return None;
        }
        if x < y { Some(Self { a: x, b: y }) } else { Some(Self { a: y, b: x }) }
    }

    #[inline]
    pub fn a(&self) -> &AreaId { &self.a }

    #[inline]
    pub fn b(&self) -> &AreaId { &self.b }

    /// True if either side of the pair is `id`.
    pub fn contains(&self, id: &AreaId) -> bool {
        self.a == *id || self.b == *id
    }

    /// The opposite side of the pair, if `id` is one of its sides.
    pub fn other(&self, id: &AreaId) -> Option<&AreaId> {
        if self.a == *id {
            Some(&self.b)
        } else if self.b == *id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Detect all adjacent-area pairs under the given contiguity method.
///
/// `ids` and `geometries` are parallel slices over the input areas. The
/// result is deduplicated, free of self-pairs, and sorted so repeated runs
/// over the same input produce identical output.
pub fn find_neighbors(
    ids: &[AreaId],
    geometries: &[Geometry<f64>],
    method: Method,
) -> Result<Vec<NeighborPair>, ContigError> {
    if ids.len() != geometries.len() {
        return Err(ContigError::LengthMismatch { ids: ids.len(), geometries: geometries.len() });
    }

    let mut seen: AHashSet<&AreaId> = AHashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(ContigError::DuplicateId(id.clone()));
        }
    }

    let rings = decompose(geometries)?;

    let mut index_pairs: AHashSet<(u32, u32)> = rook_pairs(&rings).into_iter().collect();
    if method == Method::Queen {
        index_pairs.extend(point_pairs(&rings));
    }

    let mut pairs: Vec<NeighborPair> = index_pairs
        .into_iter()
        .filter_map(|(i, j)| {
            NeighborPair::new(ids[i as usize].clone(), ids[j as usize].clone())
        })
        .collect();
    pairs.sort_unstable();
    Ok(pairs)
}
