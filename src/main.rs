use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use lda_partitions::cifar::{self, Split};
use lda_partitions::generator::{self, GeneratorConfig};

/// Generate Latent Dirichlet Allocated partitions for the CIFAR-10/100
/// datasets.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Choose 10 for CIFAR-10 and 100 for CIFAR-100.
    #[arg(long = "num_classes", value_parser = parse_num_classes)]
    num_classes: usize,

    /// Number of partitions in which to split the dataset.
    #[arg(long = "num_partitions", default_value_t = 500)]
    num_partitions: usize,

    /// Dirichlet concentration.
    #[arg(long, default_value_t = 0.1)]
    alpha: f64,

    /// Where to save the partitions (defaults to ~/.lda_partitions/cifar).
    #[arg(long = "save_root")]
    save_root: Option<PathBuf>,

    /// Seed for the Dirichlet sampling and shuffles.
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_num_classes(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n @ (10 | 100)) => Ok(n),
        Ok(n) => Err(format!("must be 10 or 100, got {n}")),
        Err(e) => Err(e.to_string()),
    }
}

fn default_data_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lda_partitions")
        .join("cifar")
}

/// Source archives are cached per dataset, next to the default data root.
fn source_cache_root(num_classes: usize) -> PathBuf {
    PathBuf::from(format!("{}-{num_classes}", default_data_root().display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let save_root = args.save_root.clone().unwrap_or_else(default_data_root);
    let cache_root = source_cache_root(args.num_classes);

    let train = cifar::load(args.num_classes, &cache_root, Split::Train, true)
        .context("loading train split")?;
    let test = cifar::load(args.num_classes, &cache_root, Split::Test, true)
        .context("loading test split")?;

    let config = GeneratorConfig {
        num_classes: args.num_classes,
        num_partitions: args.num_partitions,
        alpha: args.alpha,
        save_root,
        seed: args.seed,
    };
    let written = generator::generate(&config, &train, &test)?;

    info!(
        "wrote {} partition files under {}",
        written.len(),
        generator::lda_root(&config.save_root, config.alpha).display()
    );
    Ok(())
}
