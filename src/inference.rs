//! Permutation inference for Moran statistics.
//!
//! Approximates p-values under a null hypothesis of spatial randomness by
//! resampling: every permutation trial reassigns observed z-scores to
//! locations at random, and the observed statistic is ranked against the
//! resulting reference distribution. This is explicitly approximate
//! resampling, not exact permutation.
//!
//! Trials are independent, so the engine fans out across rayon workers:
//! shuffle construction, the per-area local loop, and the global trials all
//! run in parallel against the read-only weight matrix and z-scores. Each
//! trial derives its own RNG from the master seed, so a seeded run produces
//! identical results regardless of thread scheduling.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ahash::AHashMap;
use anyhow::Result;
use contig::AreaId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::moran::{Label, MoranAnalysis, unadjusted_local_moran};

/// Significance cutoffs, smallest first.
const P_CUTOFFS: [f64; 4] = [0.0001, 0.001, 0.01, 0.05];

/// Threshold below which an area receives a cluster label.
const P_SIGNIFICANT: f64 = 0.05;

/// Progress observer for the local p-value loop; receives the fraction of
/// completed areas in (0, 1] and is always called once more with exactly 1.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Cooperative cancellation flag shared with a permutation run.
///
/// Long runs poll the token between units of work; once cancelled, the run
/// stops at the next check and returns [`InferenceError::Cancelled`]
/// without touching the analysis.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Options for [`estimate_significance`].
pub struct SignificanceOptions {
    /// Number of permutation trials.
    pub permutations: usize,
    /// Seed for the master RNG; fresh entropy when absent.
    pub seed: Option<u64>,
    /// Progress observer for the local p-value loop.
    pub progress: Option<ProgressFn>,
    /// Cooperative cancellation flag.
    pub cancel: Option<CancelToken>,
}

impl Default for SignificanceOptions {
    fn default() -> Self {
        Self { permutations: 999, seed: None, progress: None, cancel: None }
    }
}

impl fmt::Debug for SignificanceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignificanceOptions")
            .field("permutations", &self.permutations)
            .field("seed", &self.seed)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors surfaced by the permutation inference engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The largest weight row is too big for the sampling scheme: drawing
    /// two disjoint slices of that size needs at least `2 × max_row`
    /// records, so a non-self synthetic sample cannot be guaranteed.
    NeighborRowTooLarge { max_row: usize, areas: usize },
    /// The run was cancelled through its [`CancelToken`].
    Cancelled,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeighborRowTooLarge { max_row, areas } => write!(
                f,
                "largest neighbor row ({max_row}) times two exceeds the {areas} available areas; \
                 permutation sampling cannot avoid self-selection"
            ),
            Self::Cancelled => write!(f, "permutation run cancelled"),
        }
    }
}

impl std::error::Error for InferenceError {}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct LocalOutcome {
    p: f64,
    cutoff: Option<f64>,
    label: Label,
}

/// Estimate local and global p-values for an analysis by permutation
/// resampling, extending the analysis in place.
///
/// Every area with a valid local statistic gets a p-value, a significance
/// cutoff, and a cluster label; the analysis gains a global p-value and the
/// raw global reference distribution.
pub fn estimate_significance(
    analysis: &mut MoranAnalysis,
    options: SignificanceOptions,
) -> Result<()> {
    let n = analysis.local.len();
    let permutations = options.permutations;

    let max_row = analysis.weights.max_row_len();
    if max_row * 2 > n {
        return Err(InferenceError::NeighborRowTooLarge { max_row, areas: n }.into());
    }

    let mut master = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let local_seeds: Vec<u64> = (0..permutations).map(|_| master.random()).collect();
    let global_seeds: Vec<u64> = (0..permutations).map(|_| master.random()).collect();

    let cancelled = || options.cancel.as_ref().is_some_and(CancelToken::is_cancelled);

    // Shuffled index orderings shared by every area's local sampling.
    let shuffles: Vec<Vec<u32>> = local_seeds
        .par_iter()
        .map(|&seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut order: Vec<u32> = (0..n as u32).collect();
            order.shuffle(&mut rng);
            order
        })
        .collect();

    // Read-only snapshots shared across workers.
    let zs: Vec<Option<f64>> = analysis.local.iter().map(|result| result.z).collect();
    let lags: Vec<Option<f64>> = analysis.local.iter().map(|result| result.lag).collect();
    let row_weights: Vec<Option<Vec<f64>>> = analysis
        .local
        .iter()
        .map(|result| {
            analysis
                .weights
                .weights(&result.id)
                .map(|row| row.iter().map(|(_, weight)| *weight).collect())
        })
        .collect();
    // Rank against the unnormalized statistic; the reference values are
    // unnormalized synthetic locals.
    let observed: Vec<Option<f64>> = analysis
        .local
        .iter()
        .map(|result| {
            result
                .local_i
                .map(|local_i| if analysis.local_normalized { local_i * analysis.m2 } else { local_i })
        })
        .collect();

    let completed = AtomicUsize::new(0);
    let outcomes: Vec<Option<LocalOutcome>> = (0..n)
        .into_par_iter()
        .map(|i| {
            if cancelled() {
                return Err(InferenceError::Cancelled);
            }

            let outcome = local_outcome(
                i,
                &zs,
                &lags,
                &row_weights,
                &observed,
                &shuffles,
                permutations,
            );

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = &options.progress {
                progress(done as f64 / n as f64);
            }
            Ok(outcome)
        })
        .collect::<Result<_, _>>()?;

    // Global reference distribution: one full z reassignment per trial.
    let ids: Vec<AreaId> = analysis.local.iter().map(|result| result.id.clone()).collect();
    let reference: Vec<f64> = global_seeds
        .par_iter()
        .map(|&seed| {
            if cancelled() {
                return Err(InferenceError::Cancelled);
            }

            let mut rng = StdRng::seed_from_u64(seed);
            let mut shuffled = zs.clone();
            shuffled.shuffle(&mut rng);
            let z_by_id: AHashMap<&AreaId, Option<f64>> =
                ids.iter().zip(shuffled.iter().copied()).collect();

            let mut total = 0.0;
            for id in &ids {
                let Some(row) = analysis.weights.weights(id) else { continue };
                let Some(z) = z_by_id.get(id).copied().flatten() else { continue };

                let neighbor_zs: Vec<Option<f64>> =
                    row.iter().map(|(nid, _)| z_by_id.get(nid).copied().flatten()).collect();
                let weights: Vec<f64> = row.iter().map(|(_, weight)| *weight).collect();
                if let Some((synthetic, _)) = unadjusted_local_moran(z, &neighbor_zs, &weights) {
                    total += synthetic;
                }
            }
            Ok(total)
        })
        .collect::<Result<_, _>>()?;

    let observed_global = analysis.global_i * analysis.m2;
    let global_p = p_by_reference(observed_global, &reference, permutations);

    for (result, outcome) in analysis.local.iter_mut().zip(outcomes) {
        if let Some(outcome) = outcome {
            result.p = Some(outcome.p);
            result.p_cutoff = outcome.cutoff;
            result.label = Some(outcome.label);
        }
    }
    analysis.p = Some(global_p);
    analysis.reference = Some(reference);

    if let Some(progress) = &options.progress {
        progress(1.0);
    }
    Ok(())
}

/// Reference distribution, p-value, cutoff, and label for one area.
fn local_outcome(
    i: usize,
    zs: &[Option<f64>],
    lags: &[Option<f64>],
    row_weights: &[Option<Vec<f64>>],
    observed: &[Option<f64>],
    shuffles: &[Vec<u32>],
    permutations: usize,
) -> Option<LocalOutcome> {
    let z = zs[i]?;
    let lag = lags[i]?;
    let observed_i = observed[i]?;
    let weights = row_weights[i].as_ref()?;
    let k = weights.len();

    let mut reference = Vec::with_capacity(permutations);
    for order in shuffles {
        // Sample k shuffled records as synthetic neighbors, skipping to the
        // next k when the area itself landed in the first slice.
        let slice = if order[..k].contains(&(i as u32)) {
            &order[k..2 * k]
        } else {
            &order[..k]
        };
        let sampled: Vec<Option<f64>> = slice.iter().map(|&j| zs[j as usize]).collect();
        if let Some((synthetic, _)) = unadjusted_local_moran(z, &sampled, weights) {
            reference.push(synthetic);
        }
    }

    let p = p_by_reference(observed_i, &reference, permutations);
    let cutoff = P_CUTOFFS.iter().copied().find(|&cutoff| p < cutoff);
    let label =
        if p < P_SIGNIFICANT { Label::from_signs(z, lag) } else { Label::NotSignificant };
    Some(LocalOutcome { p, cutoff, label })
}

/// One-sided-by-sign rank of an observed statistic against its reference
/// distribution.
///
/// Only reference values sharing the observed sign participate; they are
/// ranked by absolute value and p = (matching − index + 1) / (permutations
/// + 1), where `index` is the first matching value strictly above the
/// observed magnitude. GeoDa reports roughly half these p-values (it folds
/// them toward [0, 0.5]); restricting to one sign already makes this a
/// one-sided test, so the values are left unfolded.
pub(crate) fn p_by_reference(observed: f64, reference: &[f64], permutations: usize) -> f64 {
    let mut matching: Vec<f64> = reference
        .iter()
        .copied()
        .filter(|value| sign(*value) == sign(observed))
        .map(f64::abs)
        .collect();
    matching.sort_unstable_by(f64::total_cmp);

    let abs_observed = observed.abs();
    let index =
        matching.iter().position(|&value| abs_observed < value).unwrap_or(matching.len());
    (matching.len() - index + 1) as f64 / (permutations + 1) as f64
}

/// Three-way sign: zero matches only zero.
fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
