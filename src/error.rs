use std::fmt;
use std::path::PathBuf;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, PartitionError>;

/// All errors that can occur while loading or generating partitions.
#[derive(Debug)]
pub enum PartitionError {
    /// Invalid class count — caught before touching the filesystem.
    InvalidNumClasses(usize),
    /// The partition file derived from (root_dir, num_classes, partition_id)
    /// does not exist.
    PartitionNotFound(PathBuf),
    /// Item access outside `0..len`.
    IndexOutOfRange { index: usize, len: usize },
    /// Features and labels arrays disagree in length.
    LengthMismatch { features: usize, labels: usize },
    /// A supplied Dirichlet prior has the wrong shape.
    InvalidPrior {
        got: (usize, usize),
        expected: (usize, usize),
    },
    /// The Dirichlet concentration must be strictly positive.
    InvalidConcentration(f64),
    /// Partitioning needs at least one sample and one partition.
    EmptyPartitioning,
    /// A partition file holds a tensor with an unexpected dtype or shape.
    BadTensor { name: &'static str, reason: String },
    /// A source dataset file does not match the expected binary layout.
    MalformedSource { file: String, reason: String },
    /// An error from the safetensors layer.
    Storage(safetensors::SafeTensorError),
    /// Failed to encode the run manifest.
    Manifest(serde_json::Error),
    /// Failed to download a source dataset archive.
    Download(reqwest::Error),
    /// An underlying I/O error not covered by the above variants.
    Io(std::io::Error),
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumClasses(n) => write!(
                f,
                "num_classes must be 10 (CIFAR-10) or 100 (CIFAR-100), got {n}"
            ),
            Self::PartitionNotFound(path) => {
                write!(f, "partition file {} not found", path.display())
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for partition of length {len}")
            }
            Self::LengthMismatch { features, labels } => write!(
                f,
                "features/labels length mismatch: {features} features vs {labels} labels"
            ),
            Self::InvalidPrior { got, expected } => write!(
                f,
                "dirichlet prior has shape {}x{}, expected {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
            Self::InvalidConcentration(alpha) => {
                write!(f, "concentration must be > 0, got {alpha}")
            }
            Self::EmptyPartitioning => {
                write!(f, "cannot partition an empty dataset or into zero partitions")
            }
            Self::BadTensor { name, reason } => {
                write!(f, "bad tensor {name:?} in partition file: {reason}")
            }
            Self::MalformedSource { file, reason } => {
                write!(f, "malformed dataset file {file}: {reason}")
            }
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Manifest(e) => write!(f, "manifest error: {e}"),
            Self::Download(e) => write!(f, "download error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for PartitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Manifest(e) => Some(e),
            Self::Download(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PartitionError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<safetensors::SafeTensorError> for PartitionError {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Self::Storage(e)
    }
}

impl From<reqwest::Error> for PartitionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Download(e)
    }
}

impl From<serde_json::Error> for PartitionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Manifest(e)
    }
}
