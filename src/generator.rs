//! One-shot partition-set generation.
//!
//! Writes N shards per data split under
//! `save_root/partitions/lda/{alpha:.2}/{split}/{idx:03}.pt`, partitioning
//! the test split with the same Dirichlet distribution sampled for train.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::dataset::XY;
use crate::error::{PartitionError, Result};
use crate::partition::create_lda_partitions;
use crate::storage;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// 10 for CIFAR-10, 100 for CIFAR-100.
    pub num_classes: usize,
    pub num_partitions: usize,
    /// Dirichlet concentration; low alpha means highly non-IID partitions.
    pub alpha: f64,
    pub save_root: PathBuf,
    pub seed: Option<u64>,
}

/// The directory one generation run writes into.
pub fn lda_root(save_root: &Path, alpha: f64) -> PathBuf {
    save_root
        .join("partitions")
        .join("lda")
        .join(format!("{alpha:.2}"))
}

/// Parameters of a finished run, written next to the partitions so a set of
/// files can be traced back to how it was generated.
#[derive(Debug, Serialize)]
struct Manifest {
    num_classes: usize,
    num_partitions: usize,
    alpha: f64,
    seed: Option<u64>,
    splits: Vec<&'static str>,
}

/// Partitions both splits and persists every shard.
///
/// Returns the paths of all written partition files, in (split, index)
/// order. Any I/O failure propagates immediately; partial output from a
/// failed run is left on disk.
pub fn generate(config: &GeneratorConfig, train: &XY, test: &XY) -> Result<Vec<PathBuf>> {
    if config.num_classes != 10 && config.num_classes != 100 {
        return Err(PartitionError::InvalidNumClasses(config.num_classes));
    }

    let base = lda_root(&config.save_root, config.alpha);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // The distribution sampled for the train split is reused as the prior
    // for the test split, so both share one set of class proportions.
    let mut dist: Option<Array2<f64>> = None;
    let mut written = Vec::new();

    for (split, xy) in [("train", train), ("test", test)] {
        let save_dir = base.join(split);
        fs::create_dir_all(&save_dir)?;

        let (shards, next_dist) = create_lda_partitions(
            xy,
            dist.as_ref(),
            config.num_partitions,
            config.alpha,
            &mut rng,
        )?;
        info!(
            "{split}: {} samples into {} partitions under {}",
            xy.len(),
            shards.len(),
            save_dir.display()
        );

        for (idx, shard) in shards.iter().enumerate() {
            let path = save_dir.join(format!("{idx:03}.pt"));
            storage::save_xy(shard, &path)?;
            written.push(path);
        }

        dist = Some(next_dist);
    }

    let manifest = Manifest {
        num_classes: config.num_classes,
        num_partitions: config.num_partitions,
        alpha: config.alpha,
        seed: config.seed,
        splits: vec!["train", "test"],
    };
    fs::write(
        base.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lda_root_formats_alpha_with_two_decimals() {
        let root = Path::new("/data");
        assert_eq!(
            lda_root(root, 0.1),
            PathBuf::from("/data/partitions/lda/0.10")
        );
        assert_eq!(
            lda_root(root, 0.525),
            PathBuf::from("/data/partitions/lda/0.53")
        );
    }

    #[test]
    fn generate_rejects_invalid_num_classes() {
        let config = GeneratorConfig {
            num_classes: 7,
            num_partitions: 2,
            alpha: 0.1,
            save_root: PathBuf::from("/tmp"),
            seed: Some(0),
        };
        let xy = crate::dataset::XY::new(
            ndarray::Array4::zeros((4, 1, 2, 2)),
            ndarray::Array1::from(vec![0i64, 1, 0, 1]),
        )
        .unwrap();

        let err = generate(&config, &xy, &xy).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidNumClasses(7)));
    }
}
