//! Latent-Dirichlet-Allocation label-skew partitioning.
//!
//! Each partition's class proportions are a row of a Dirichlet-distributed
//! matrix. The same matrix can be passed back in as a prior so train and
//! test splits share one sampled distribution.

use ndarray::{Array2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Gamma};

use crate::dataset::XY;
use crate::error::{PartitionError, Result};

/// Splits `xy` into `num_partitions` label-skewed shards.
///
/// Properties:
/// - Shards are disjoint and cover the input exactly (lengths sum to
///   `xy.len()`).
/// - When `dirichlet_dist` is given it must have shape
///   `(num_partitions, num_classes)` and is returned unchanged; otherwise a
///   fresh `(num_partitions, num_classes)` matrix is sampled from
///   Dirichlet(`concentration` · 1) and returned alongside the shards.
///
/// The class count is the number of distinct labels present in `xy`.
pub fn create_lda_partitions(
    xy: &XY,
    dirichlet_dist: Option<&Array2<f64>>,
    num_partitions: usize,
    concentration: f64,
    rng: &mut impl Rng,
) -> Result<(Vec<XY>, Array2<f64>)> {
    if xy.is_empty() || num_partitions == 0 {
        return Err(PartitionError::EmptyPartitioning);
    }
    if !concentration.is_finite() || concentration <= 0.0 {
        return Err(PartitionError::InvalidConcentration(concentration));
    }

    // Indices grouped by class, in stable label order.
    let mut by_class: Vec<(i64, Vec<usize>)> = Vec::new();
    for (idx, &label) in xy.y().iter().enumerate() {
        match by_class.binary_search_by_key(&label, |(l, _)| *l) {
            Ok(pos) => by_class[pos].1.push(idx),
            Err(pos) => by_class.insert(pos, (label, vec![idx])),
        }
    }
    let num_classes = by_class.len();

    let dist = match dirichlet_dist {
        Some(prior) => {
            if prior.dim() != (num_partitions, num_classes) {
                return Err(PartitionError::InvalidPrior {
                    got: prior.dim(),
                    expected: (num_partitions, num_classes),
                });
            }
            prior.clone()
        }
        None => sample_dirichlet(num_partitions, num_classes, concentration, rng)?,
    };

    // Assign every class's samples to partitions proportionally to the
    // partitions' weights for that class. Largest-remainder rounding keeps
    // the cover exact.
    let mut shard_indices: Vec<Vec<usize>> = vec![Vec::new(); num_partitions];
    for (class_pos, (_, indices)) in by_class.iter().enumerate() {
        let mut indices = indices.clone();
        indices.shuffle(rng);

        let weights: Vec<f64> = dist.index_axis(Axis(1), class_pos).to_vec();
        let counts = apportion(indices.len(), &weights);

        let mut cursor = 0;
        for (partition, count) in counts.into_iter().enumerate() {
            shard_indices[partition].extend_from_slice(&indices[cursor..cursor + count]);
            cursor += count;
        }
    }

    let mut shards = Vec::with_capacity(num_partitions);
    for indices in &mut shard_indices {
        indices.shuffle(rng);
        let x = xy.x().select(Axis(0), indices);
        let y = xy.y().select(Axis(0), indices);
        shards.push(XY::new(x, y)?);
    }

    Ok((shards, dist))
}

/// Samples a `(rows, cols)` matrix whose rows are Dirichlet(alpha · 1).
///
/// Rows are built as normalized Gamma(alpha, 1) draws; `rand_distr`'s
/// `Dirichlet` is const-generic over the dimension, which is only known at
/// runtime here.
fn sample_dirichlet(
    rows: usize,
    cols: usize,
    alpha: f64,
    rng: &mut impl Rng,
) -> Result<Array2<f64>> {
    let gamma =
        Gamma::new(alpha, 1.0).map_err(|_| PartitionError::InvalidConcentration(alpha))?;

    let mut dist = Array2::zeros((rows, cols));
    for mut row in dist.axis_iter_mut(Axis(0)) {
        let draws: Vec<f64> = (0..cols).map(|_| gamma.sample(rng)).collect();
        let total: f64 = draws.iter().sum();
        if total > 0.0 {
            for (slot, draw) in row.iter_mut().zip(&draws) {
                *slot = draw / total;
            }
        } else {
            // All-zero draws can happen for very small alpha.
            row.fill(1.0 / cols as f64);
        }
    }
    Ok(dist)
}

/// Distributes `n` items over buckets proportionally to `weights`,
/// returning integer counts that sum to exactly `n`.
fn apportion(n: usize, weights: &[f64]) -> Vec<usize> {
    let total: f64 = weights.iter().sum();
    let share = |w: f64| {
        if total > 0.0 {
            n as f64 * w / total
        } else {
            n as f64 / weights.len() as f64
        }
    };

    let mut counts: Vec<usize> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(f64, usize)> = Vec::with_capacity(weights.len());
    let mut assigned = 0;
    for (bucket, &w) in weights.iter().enumerate() {
        let quota = share(w);
        let floor = quota.floor() as usize;
        counts.push(floor);
        remainders.push((quota - floor as f64, bucket));
        assigned += floor;
    }

    // Hand out the leftover items by largest fractional part; ties break on
    // bucket order for determinism.
    remainders.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, bucket) in remainders.iter().take(n - assigned) {
        counts[bucket] += 1;
    }

    counts
}
