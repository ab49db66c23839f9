//! Spatial autocorrelation over areal data: local and global Moran's I with
//! permutation-based significance testing.
//!
//! Feed [`analyze`] a slice of decoded [`Area`]s and an attribute field name
//! to get per-area z-scores, spatial lags, local Moran's I, and the global
//! statistic; add permutations (or call [`estimate_significance`]) for
//! p-values, significance cutoffs, and High-High/Low-Low cluster labels.
//! Neighbor detection and weight-matrix construction are also exposed on
//! their own for callers that reuse a contiguity structure across fields.

mod area;
mod inference;
mod moran;
mod weights;

#[doc(inline)]
pub use contig::{AreaId, ContigError, Method, NeighborPair};

#[doc(inline)]
pub use area::{Area, compute_neighbors};

#[doc(inline)]
pub use weights::{WeightMatrix, compute_weight_matrix};

#[doc(inline)]
pub use moran::{AnalyzeOptions, Label, LocalResult, MoranAnalysis, analyze};

#[doc(inline)]
pub use inference::{
    CancelToken, InferenceError, ProgressFn, SignificanceOptions, estimate_significance,
};
