//! Self-contained contiguity detection for areal geometry.
//!
//! Given a set of areas (polygons, multi-polygons, or point locations) this
//! crate determines which pairs are spatially adjacent:
//!
//! * **Rook** — the areas share a boundary edge segment, found by testing
//!   boundary segments for collinear overlap, with an R-tree bounding-box
//!   prune keeping the pair scan tractable.
//! * **Queen** — rook plus areas sharing only a boundary point, found by
//!   coincidence queries over an R-tree of all boundary vertices.
//!
//! Coordinates are treated as raw planar values; no CRS semantics apply.

use std::fmt;

mod id;
mod pairs;
mod point;
mod rings;
mod rook;
mod segment;

pub use id::AreaId;
pub use pairs::{Method, NeighborPair, find_neighbors};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during contiguity detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContigError {
    /// The id and geometry slices have different lengths.
    LengthMismatch { ids: usize, geometries: usize },
    /// The same area id appears more than once in the input.
    DuplicateId(AreaId),
    /// A geometry type the detector does not support.
    UnsupportedGeometry(&'static str),
    /// An unrecognized contiguity method name.
    UnknownMethod(String),
}

impl fmt::Display for ContigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { ids, geometries } => {
                write!(f, "{ids} area ids but {geometries} geometries")
            }
            Self::DuplicateId(id) => write!(f, "duplicate area id: {id}"),
            Self::UnsupportedGeometry(ty) => {
                write!(f, "unsupported geometry type for contiguity: {ty}")
            }
            Self::UnknownMethod(name) => {
                write!(f, "unknown contiguity method {name:?} (expected \"rook\" or \"queen\")")
            }
        }
    }
}

impl std::error::Error for ContigError {}
