use std::path::{Path, PathBuf};

use ndarray::{Array1, Array3, Array4, Axis};

use crate::error::{PartitionError, Result};
use crate::storage;
use crate::transform::Normalize;

/// An index-aligned (features, labels) pair.
///
/// Features are CHW image tensors stacked along the first axis; labels are
/// integer class indices of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct XY {
    x: Array4<f32>,
    y: Array1<i64>,
}

impl XY {
    /// Creates a pair from owned arrays.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if the arrays disagree in length.
    pub fn new(x: Array4<f32>, y: Array1<i64>) -> Result<Self> {
        if x.len_of(Axis(0)) != y.len() {
            return Err(PartitionError::LengthMismatch {
                features: x.len_of(Axis(0)),
                labels: y.len(),
            });
        }
        Ok(Self { x, y })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    #[inline]
    pub fn x(&self) -> &Array4<f32> {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &Array1<i64> {
        &self.y
    }

    pub fn into_parts(self) -> (Array4<f32>, Array1<i64>) {
        (self.x, self.y)
    }
}

/// Derives the on-disk location of a partition file.
pub fn partition_path(root_dir: &Path, num_classes: usize, partition_id: usize) -> PathBuf {
    root_dir.join(format!("cifar{num_classes}_{partition_id}.pt"))
}

/// Read-only view over a single partition file.
///
/// The file is loaded eagerly at construction and never mutated afterwards.
/// One view is created per client/experiment run; the partition id is
/// usually the client id.
#[derive(Debug)]
pub struct PartitionedDataset {
    xy: XY,
    transform: Option<Normalize>,
}

impl PartitionedDataset {
    /// Opens the partition file for `partition_id` under `root_dir`.
    ///
    /// # Errors
    /// - `InvalidNumClasses` if `num_classes` is not 10 or 100.
    /// - `PartitionNotFound` if the derived file does not exist.
    pub fn new(
        num_classes: usize,
        root_dir: impl AsRef<Path>,
        partition_id: usize,
        transform: Option<Normalize>,
    ) -> Result<Self> {
        if num_classes != 10 && num_classes != 100 {
            return Err(PartitionError::InvalidNumClasses(num_classes));
        }

        let path = partition_path(root_dir.as_ref(), num_classes, partition_id);
        if !path.exists() {
            return Err(PartitionError::PartitionNotFound(path));
        }

        let xy = storage::load_xy(&path)?;
        Ok(Self { xy, transform })
    }

    /// CIFAR-10 partition view.
    pub fn cifar10(
        root_dir: impl AsRef<Path>,
        partition_id: usize,
        transform: Option<Normalize>,
    ) -> Result<Self> {
        Self::new(10, root_dir, partition_id, transform)
    }

    /// CIFAR-100 partition view.
    pub fn cifar100(
        root_dir: impl AsRef<Path>,
        partition_id: usize,
        transform: Option<Normalize>,
    ) -> Result<Self> {
        Self::new(100, root_dir, partition_id, transform)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.xy.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xy.is_empty()
    }

    /// Returns the (feature, label) pair at `index`, with the transform
    /// applied to the feature tensor when one was supplied.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if `index >= self.len()`.
    pub fn get(&self, index: usize) -> Result<(Array3<f32>, i64)> {
        if index >= self.len() {
            return Err(PartitionError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        let mut image = self.xy.x().index_axis(Axis(0), index).to_owned();
        if let Some(transform) = self.transform {
            image = transform.apply(image);
        }

        Ok((image, self.xy.y()[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Normalize;

    fn sample_xy(n: usize) -> XY {
        let x = Array4::from_shape_fn((n, 3, 32, 32), |(i, c, h, w)| {
            (i * 1000 + c * 100 + h + w) as f32 / 4096.0
        });
        let y = Array1::from_iter((0..n).map(|i| (i % 10) as i64));
        XY::new(x, y).unwrap()
    }

    #[test]
    fn xy_rejects_length_mismatch() {
        let x = Array4::zeros((3, 3, 32, 32));
        let y = Array1::zeros(4);
        let err = XY::new(x, y).unwrap_err();
        assert!(matches!(
            err,
            PartitionError::LengthMismatch {
                features: 3,
                labels: 4
            }
        ));
    }

    #[test]
    fn rejects_invalid_num_classes() {
        for bad in [0, 1, 11, 50, 1000] {
            let err = PartitionedDataset::new(bad, "/tmp", 0, None).unwrap_err();
            assert!(matches!(err, PartitionError::InvalidNumClasses(n) if n == bad));
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = PartitionedDataset::cifar10(dir.path(), 7, None).unwrap_err();
        match err {
            PartitionError::PartitionNotFound(path) => {
                assert_eq!(path, dir.path().join("cifar10_7.pt"));
            }
            other => panic!("expected PartitionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn roundtrip_len_and_items() {
        let dir = tempfile::tempdir().unwrap();
        let xy = sample_xy(5);
        storage::save_xy(&xy, &partition_path(dir.path(), 10, 3)).unwrap();

        let view = PartitionedDataset::cifar10(dir.path(), 3, None).unwrap();
        assert_eq!(view.len(), 5);
        assert!(!view.is_empty());

        for i in 0..5 {
            let (image, label) = view.get(i).unwrap();
            assert_eq!(image, xy.x().index_axis(Axis(0), i).to_owned());
            assert_eq!(label, xy.y()[i]);
        }

        let err = view.get(5).unwrap_err();
        assert!(matches!(
            err,
            PartitionError::IndexOutOfRange { index: 5, len: 5 }
        ));
    }

    #[test]
    fn transform_is_applied_on_access() {
        let dir = tempfile::tempdir().unwrap();
        let xy = sample_xy(2);
        storage::save_xy(&xy, &partition_path(dir.path(), 100, 0)).unwrap();

        let norm = Normalize::new([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
        let view = PartitionedDataset::cifar100(dir.path(), 0, Some(norm)).unwrap();

        let (image, _) = view.get(1).unwrap();
        let raw = xy.x().index_axis(Axis(0), 1);
        assert_eq!(image[[0, 0, 0]], raw[[0, 0, 0]] / 2.0);
        assert_eq!(image[[2, 31, 31]], raw[[2, 31, 31]] / 2.0);
    }
}
