//! Local and global Moran's I over a set of areas and one numeric attribute.
//!
//! The engine standardizes the attribute, computes each area's spatial lag
//! (the weighted mean of its neighbors' z-scores), local Moran's I
//! (`z × lag`), and the global statistic `Σ local I / m2` where `m2` is the
//! sum of squared z-scores over areas with a computed local value. Missing
//! attributes and areas without a weight row stay explicitly absent all the
//! way through; they are never coerced to zero.

use ahash::AHashMap;
use anyhow::Result;
use contig::{AreaId, Method};
use serde::Serialize;

use crate::area::{Area, resolve_ids};
use crate::inference::{SignificanceOptions, estimate_significance};
use crate::weights::WeightMatrix;

/// Options for [`analyze`].
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Precomputed weight matrix; detected from the areas when absent.
    pub weight_matrix: Option<WeightMatrix>,
    /// Contiguity rule used when the matrix must be detected.
    pub neighbor_method: Method,
    /// Divide local Moran's I values by `m2` so local and global statistics
    /// share a scale. On by default.
    pub local_normalize: bool,
    /// When set, run permutation inference with this many permutations and
    /// fold p-values and labels into the result.
    pub permutations: Option<usize>,
    /// Seed for the permutation RNG; fresh entropy when absent.
    pub seed: Option<u64>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            weight_matrix: None,
            neighbor_method: Method::default(),
            local_normalize: true,
            permutations: None,
            seed: None,
        }
    }
}

/// Cluster label attached to significant areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    #[serde(rename = "High-High")]
    HighHigh,
    #[serde(rename = "High-Low")]
    HighLow,
    #[serde(rename = "Low-High")]
    LowHigh,
    #[serde(rename = "Low-Low")]
    LowLow,
    #[serde(rename = "Not significant")]
    NotSignificant,
}

impl Label {
    /// Label for a significant area from the signs of its z-score and lag.
    pub(crate) fn from_signs(z: f64, lag: f64) -> Self {
        match (z >= 0.0, lag >= 0.0) {
            (true, true) => Self::HighHigh,
            (true, false) => Self::HighLow,
            (false, true) => Self::LowHigh,
            (false, false) => Self::LowLow,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::HighHigh => "High-High",
            Self::HighLow => "High-Low",
            Self::LowHigh => "Low-High",
            Self::LowLow => "Low-Low",
            Self::NotSignificant => "Not significant",
        };
        write!(f, "{text}")
    }
}

/// Per-area record of the analysis, in input order.
///
/// `value` and `z` are absent for areas with no weight row or no numeric
/// attribute; `lag` and `local_i` are additionally absent when the area has
/// no valid neighbors left after filtering: "not computable", never zero.
#[derive(Debug, Clone, Serialize)]
pub struct LocalResult {
    pub id: AreaId,
    pub value: Option<f64>,
    pub z: Option<f64>,
    pub lag: Option<f64>,
    pub local_i: Option<f64>,
    /// Permutation p-value; present only after significance estimation.
    pub p: Option<f64>,
    /// Smallest cutoff in {0.0001, 0.001, 0.01, 0.05} that `p` is below.
    pub p_cutoff: Option<f64>,
    pub label: Option<Label>,
}

/// Complete result of one analysis run.
#[derive(Debug, Clone)]
pub struct MoranAnalysis {
    /// Per-area results, in input order.
    pub local: Vec<LocalResult>,
    /// Global Moran's I: `Σ local I / m2`.
    pub global_i: f64,
    /// Normalizing constant: sum of squared z-scores over areas with a
    /// computed local Moran's I.
    pub m2: f64,
    /// The weight matrix the statistics were computed against.
    pub weights: WeightMatrix,
    /// Whether local values were divided by `m2`.
    pub local_normalized: bool,
    /// Global permutation p-value; present only after significance
    /// estimation.
    pub p: Option<f64>,
    /// Raw global reference distribution from the permutation run, retained
    /// for inspection and plotting.
    pub reference: Option<Vec<f64>>,
}

/// Compute local and global Moran's I for one attribute field.
///
/// The weight matrix is taken from `options` or detected with
/// `options.neighbor_method`. When `options.permutations` is set the
/// permutation inference engine runs as part of the call.
pub fn analyze(areas: &[Area], value_field: &str, options: AnalyzeOptions) -> Result<MoranAnalysis> {
    let weights = match options.weight_matrix {
        Some(matrix) => matrix,
        None => crate::weights::compute_weight_matrix(areas, options.neighbor_method)?,
    };

    let ids = resolve_ids(areas);
    let mut local: Vec<LocalResult> = areas
        .iter()
        .zip(ids)
        .map(|(area, id)| {
            // An area the weight matrix has never heard of contributes
            // nothing; its attribute is dropped before standardization.
            let value = if weights.contains(&id) { area.numeric(value_field) } else { None };
            LocalResult {
                id,
                value,
                z: None,
                lag: None,
                local_i: None,
                p: None,
                p_cutoff: None,
                label: None,
            }
        })
        .collect();

    let present: Vec<f64> = local.iter().filter_map(|result| result.value).collect();
    if let (Some(value_mean), Some(value_std)) = (mean(&present), deviation(&present)) {
        if value_std > 0.0 {
            for result in &mut local {
                result.z = result.value.map(|value| (value - value_mean) / value_std);
            }
        }
    }

    let z_by_id: AHashMap<AreaId, Option<f64>> =
        local.iter().map(|result| (result.id.clone(), result.z)).collect();

    let mut m2 = 0.0;
    let mut global_sum = 0.0;
    for result in &mut local {
        let Some(row) = weights.weights(&result.id) else { continue };
        let Some(z) = result.z else { continue };

        let neighbor_zs: Vec<Option<f64>> =
            row.iter().map(|(id, _)| z_by_id.get(id).copied().flatten()).collect();
        let row_weights: Vec<f64> = row.iter().map(|(_, weight)| *weight).collect();

        if let Some((local_i, lag)) = unadjusted_local_moran(z, &neighbor_zs, &row_weights) {
            result.lag = Some(lag);
            result.local_i = Some(local_i);
            m2 += z * z;
            global_sum += local_i;
        }
    }

    let global_i = global_sum / m2;
    if options.local_normalize {
        for result in &mut local {
            result.local_i = result.local_i.map(|local_i| local_i / m2);
        }
    }

    let mut analysis = MoranAnalysis {
        local,
        global_i,
        m2,
        weights,
        local_normalized: options.local_normalize,
        p: None,
        reference: None,
    };

    if let Some(permutations) = options.permutations {
        let significance =
            SignificanceOptions { permutations, seed: options.seed, ..Default::default() };
        estimate_significance(&mut analysis, significance)?;
    }

    Ok(analysis)
}

/// Local Moran's I and spatial lag for one area, before any normalization.
///
/// Neighbors with an absent or non-finite z are dropped and the surviving
/// weights renormalized to sum to 1. `None` when no valid neighbor remains.
pub(crate) fn unadjusted_local_moran(
    z: f64,
    neighbor_zs: &[Option<f64>],
    weights: &[f64],
) -> Option<(f64, f64)> {
    let valid: Vec<(f64, f64)> = neighbor_zs
        .iter()
        .copied()
        .zip(weights.iter().copied())
        .filter_map(|(neighbor_z, weight)| {
            neighbor_z.filter(|nz| nz.is_finite()).map(|nz| (nz, weight))
        })
        .collect();

    if valid.is_empty() {
        return None;
    }

    let weight_sum: f64 = valid.iter().map(|(_, weight)| weight).sum();
    let lag: f64 =
        valid.iter().map(|(neighbor_z, weight)| neighbor_z * (weight / weight_sum)).sum();
    Some((z * lag, lag))
}

/// Arithmetic mean, or `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation, or `None` with fewer than two values.
pub(crate) fn deviation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|value| (value - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use geo::{Geometry, polygon};
    use serde_json::{Map, Value, json};

    use super::*;

    fn unit_square(x: f64, y: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0), (x: x, y: y),
        ])
    }

    fn area(geometry: Geometry<f64>, value: Value) -> Area {
        let mut properties = Map::new();
        properties.insert("rate".to_string(), value);
        Area::new(geometry, properties)
    }

    /// Two stacked unit squares with values [1, 2].
    fn two_square_fixture() -> Vec<Area> {
        vec![
            area(unit_square(0.0, 0.0), json!(1.0)),
            area(unit_square(0.0, 1.0), json!(2.0)),
        ]
    }

    #[test]
    fn mean_and_deviation() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
        assert!((deviation(&[1.0, 2.0]).unwrap() - 0.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(deviation(&[1.0]), None);
    }

    #[test]
    fn local_moran_renormalizes_over_valid_neighbors() {
        let (local_i, lag) = unadjusted_local_moran(
            2.0,
            &[Some(1.0), None, Some(3.0)],
            &[0.25, 0.5, 0.25],
        )
        .unwrap();
        assert!((lag - 2.0).abs() < 1e-12);
        assert!((local_i - 4.0).abs() < 1e-12);
    }

    #[test]
    fn local_moran_without_valid_neighbors_is_undefined() {
        assert_eq!(unadjusted_local_moran(1.0, &[None, Some(f64::NAN)], &[0.5, 0.5]), None);
        assert_eq!(unadjusted_local_moran(1.0, &[], &[]), None);
    }

    #[test]
    fn two_adjacent_squares_give_perfect_negative_pattern() {
        let analysis = analyze(&two_square_fixture(), "rate", AnalyzeOptions::default()).unwrap();

        // Sample deviation √0.5 standardizes [1, 2] to ±1/√2.
        let inv_sqrt2 = 1.0 / 2.0_f64.sqrt();
        assert!((analysis.local[0].z.unwrap() + inv_sqrt2).abs() < 1e-12);
        assert!((analysis.local[1].z.unwrap() - inv_sqrt2).abs() < 1e-12);

        // Each area's lag is its only neighbor's z.
        assert!((analysis.local[0].lag.unwrap() - inv_sqrt2).abs() < 1e-12);
        assert!((analysis.local[1].lag.unwrap() + inv_sqrt2).abs() < 1e-12);

        assert!((analysis.m2 - 1.0).abs() < 1e-9);
        assert!((analysis.global_i + 1.0).abs() < 1e-9);

        // Normalized local values sum to the global statistic.
        let local_sum: f64 = analysis.local.iter().filter_map(|r| r.local_i).sum();
        assert!((local_sum - analysis.global_i).abs() < 1e-9);
    }

    #[test]
    fn three_collinear_squares_weight_rows() {
        let areas = vec![
            area(unit_square(0.0, 0.0), json!(1.0)),
            area(unit_square(0.0, 1.0), json!(5.0)),
            area(unit_square(0.0, 2.0), json!(2.0)),
        ];
        let analysis = analyze(&areas, "rate", AnalyzeOptions::default()).unwrap();

        let middle = analysis.weights.weights(&AreaId::Index(1)).unwrap();
        assert_eq!(middle.len(), 2);
        assert!(middle.iter().all(|(_, w)| (*w - 0.5).abs() < 1e-12));

        for end in [0usize, 2] {
            let row = analysis.weights.weights(&AreaId::Index(end)).unwrap();
            assert_eq!(row.len(), 1);
            assert!((row[0].1 - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn construction_identity_holds_without_normalization() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0];
        let mut areas = Vec::new();
        for (i, value) in values.iter().enumerate() {
            let (row, col) = (i / 3, i % 3);
            areas.push(area(unit_square(col as f64, row as f64), json!(value)));
        }

        let options = AnalyzeOptions { local_normalize: false, ..Default::default() };
        let analysis = analyze(&areas, "rate", options).unwrap();

        let local_sum: f64 = analysis.local.iter().filter_map(|r| r.local_i).sum();
        assert!((local_sum / analysis.m2 - analysis.global_i).abs() < 1e-12);
    }

    #[test]
    fn missing_attribute_stays_absent() {
        let areas = vec![
            area(unit_square(0.0, 0.0), json!(1.0)),
            area(unit_square(0.0, 1.0), json!(null)),
            area(unit_square(0.0, 2.0), json!(2.0)),
        ];
        let analysis = analyze(&areas, "rate", AnalyzeOptions::default()).unwrap();

        // The middle area has no value, so it has no z, lag, or local I.
        assert_eq!(analysis.local[1].value, None);
        assert_eq!(analysis.local[1].z, None);
        assert_eq!(analysis.local[1].local_i, None);

        // The end areas' only neighbor is the absent middle: their local
        // statistics are undefined too, not zero.
        assert_eq!(analysis.local[0].local_i, None);
        assert_eq!(analysis.local[2].local_i, None);
    }

    #[test]
    fn analyze_without_permutations_is_bit_identical() {
        let areas = two_square_fixture();
        let first = analyze(&areas, "rate", AnalyzeOptions::default()).unwrap();
        let second = analyze(&areas, "rate", AnalyzeOptions::default()).unwrap();

        assert_eq!(first.global_i.to_bits(), second.global_i.to_bits());
        assert_eq!(first.m2.to_bits(), second.m2.to_bits());
        for (a, b) in first.local.iter().zip(&second.local) {
            assert_eq!(a.z.map(f64::to_bits), b.z.map(f64::to_bits));
            assert_eq!(a.lag.map(f64::to_bits), b.lag.map(f64::to_bits));
            assert_eq!(a.local_i.map(f64::to_bits), b.local_i.map(f64::to_bits));
        }
    }

    #[test]
    fn precomputed_matrix_is_used_as_given() {
        let mut matrix = WeightMatrix::new();
        matrix.set(AreaId::Index(0), AreaId::Index(1), 1.0);
        matrix.set(AreaId::Index(1), AreaId::Index(0), 1.0);

        let areas = two_square_fixture();
        let options = AnalyzeOptions { weight_matrix: Some(matrix), ..Default::default() };
        let analysis = analyze(&areas, "rate", options).unwrap();
        assert!((analysis.global_i + 1.0).abs() < 1e-9);
    }
}
