//! Pre-partitioned CIFAR datasets for simulated federated-learning clients.
//!
//! Two pieces with no runtime interaction:
//! - [`PartitionedDataset`], a read-only view over one partition file,
//!   created per client with the partition id as the load key.
//! - [`generator::generate`], the offline procedure behind the
//!   `generate_partitions` binary, which splits CIFAR-10/100 into N
//!   label-skewed shards via Latent-Dirichlet-Allocation sampling.

pub mod cifar;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod partition;
pub mod storage;
pub mod transform;

pub use dataset::{PartitionedDataset, XY, partition_path};
pub use error::{PartitionError, Result};
pub use generator::{GeneratorConfig, generate, lda_root};
pub use partition::create_lda_partitions;
pub use transform::{Normalize, cifar_normalization};
