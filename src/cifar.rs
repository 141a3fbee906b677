//! CIFAR-10/100 source dataset provider.
//!
//! Downloads the official binary archives on demand, caches them under a
//! root directory, and parses the record format into (features, labels)
//! arrays. CIFAR-10 records are 1 label byte + 3072 pixel bytes; CIFAR-100
//! records carry a coarse and a fine label byte, and the fine label is used.
//! Pixels are scaled to `[0, 1]` f32.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::info;
use ndarray::{Array1, Array4};
use tar::Archive;

use crate::dataset::XY;
use crate::error::{PartitionError, Result};

const IMAGE_BYTES: usize = 3 * 32 * 32;

/// Which part of the source dataset to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

struct Layout {
    archive_url: &'static str,
    dir: &'static str,
    train_files: &'static [&'static str],
    test_files: &'static [&'static str],
    label_bytes: usize,
}

fn layout(num_classes: usize) -> Result<&'static Layout> {
    static CIFAR10: Layout = Layout {
        archive_url: "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz",
        dir: "cifar-10-batches-bin",
        train_files: &[
            "data_batch_1.bin",
            "data_batch_2.bin",
            "data_batch_3.bin",
            "data_batch_4.bin",
            "data_batch_5.bin",
        ],
        test_files: &["test_batch.bin"],
        label_bytes: 1,
    };
    static CIFAR100: Layout = Layout {
        archive_url: "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz",
        dir: "cifar-100-binary",
        train_files: &["train.bin"],
        test_files: &["test.bin"],
        label_bytes: 2,
    };

    match num_classes {
        10 => Ok(&CIFAR10),
        100 => Ok(&CIFAR100),
        n => Err(PartitionError::InvalidNumClasses(n)),
    }
}

/// Loads one split of CIFAR-10 or CIFAR-100 from `root`, downloading and
/// extracting the archive first when the cached files are missing and
/// `download` is set.
pub fn load(num_classes: usize, root: &Path, split: Split, download: bool) -> Result<XY> {
    let layout = layout(num_classes)?;
    let data_dir = root.join(layout.dir);
    let files = match split {
        Split::Train => layout.train_files,
        Split::Test => layout.test_files,
    };

    let cached = files.iter().all(|f| data_dir.join(f).exists());
    if !cached && download {
        download_and_extract(layout, root)?;
    }

    let mut pixels: Vec<f32> = Vec::new();
    let mut labels: Vec<i64> = Vec::new();
    for file in files {
        let path = data_dir.join(file);
        let bytes = fs::read(&path)?;
        parse_records(&bytes, layout.label_bytes, file, &mut pixels, &mut labels)?;
    }

    let n = labels.len();
    let x = Array4::from_shape_vec((n, 3, 32, 32), pixels).map_err(|e| {
        PartitionError::MalformedSource {
            file: layout.dir.to_string(),
            reason: e.to_string(),
        }
    })?;
    let y = Array1::from(labels);

    info!("loaded cifar{num_classes} {} split, {n} samples", split.as_str());
    XY::new(x, y)
}

fn download_and_extract(layout: &Layout, root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root)?;

    info!("downloading {}", layout.archive_url);
    let response = reqwest::blocking::get(layout.archive_url)?.error_for_status()?;
    let archive = response.bytes()?;

    info!("extracting to {}", root.display());
    let gz = GzDecoder::new(archive.as_ref());
    Archive::new(gz).unpack(root)?;

    Ok(root.join(layout.dir))
}

/// Decodes fixed-stride records into pixel/label buffers.
///
/// The last label byte of each record is the (fine) class index; pixel bytes
/// follow in channel-major order and are scaled to `[0, 1]`.
fn parse_records(
    bytes: &[u8],
    label_bytes: usize,
    file: &str,
    pixels: &mut Vec<f32>,
    labels: &mut Vec<i64>,
) -> Result<()> {
    let stride = label_bytes + IMAGE_BYTES;
    if bytes.is_empty() || bytes.len() % stride != 0 {
        return Err(PartitionError::MalformedSource {
            file: file.to_string(),
            reason: format!("{} bytes is not a multiple of the {stride}-byte record", bytes.len()),
        });
    }

    pixels.reserve(bytes.len() / stride * IMAGE_BYTES);
    for record in bytes.chunks_exact(stride) {
        labels.push(record[label_bytes - 1] as i64);
        pixels.extend(record[label_bytes..].iter().map(|&p| p as f32 / 255.0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record10(label: u8, fill: u8) -> Vec<u8> {
        let mut rec = vec![label];
        rec.extend(std::iter::repeat_n(fill, IMAGE_BYTES));
        rec
    }

    fn record100(coarse: u8, fine: u8, fill: u8) -> Vec<u8> {
        let mut rec = vec![coarse, fine];
        rec.extend(std::iter::repeat_n(fill, IMAGE_BYTES));
        rec
    }

    #[test]
    fn parses_cifar10_records() {
        let mut bytes = record10(3, 255);
        bytes.extend(record10(7, 0));

        let mut pixels = Vec::new();
        let mut labels = Vec::new();
        parse_records(&bytes, 1, "test.bin", &mut pixels, &mut labels).unwrap();

        assert_eq!(labels, vec![3, 7]);
        assert_eq!(pixels.len(), 2 * IMAGE_BYTES);
        assert_eq!(pixels[0], 1.0);
        assert_eq!(pixels[IMAGE_BYTES], 0.0);
    }

    #[test]
    fn cifar100_uses_the_fine_label() {
        let bytes = record100(5, 42, 128);

        let mut pixels = Vec::new();
        let mut labels = Vec::new();
        parse_records(&bytes, 2, "train.bin", &mut pixels, &mut labels).unwrap();

        assert_eq!(labels, vec![42]);
        assert_eq!(pixels[0], 128.0 / 255.0);
    }

    #[test]
    fn truncated_file_is_rejected() {
        let mut bytes = record10(1, 0);
        bytes.pop();

        let mut pixels = Vec::new();
        let mut labels = Vec::new();
        let err =
            parse_records(&bytes, 1, "data_batch_1.bin", &mut pixels, &mut labels).unwrap_err();
        assert!(matches!(err, PartitionError::MalformedSource { .. }));
    }

    #[test]
    fn load_parses_cached_files_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("cifar-100-binary");
        fs::create_dir_all(&data_dir).unwrap();

        let mut bytes = record100(0, 9, 10);
        bytes.extend(record100(1, 3, 20));
        fs::write(data_dir.join("test.bin"), &bytes).unwrap();

        let xy = load(100, dir.path(), Split::Test, false).unwrap();
        assert_eq!(xy.len(), 2);
        assert_eq!(xy.y().to_vec(), vec![9, 3]);
        assert_eq!(xy.x()[[0, 0, 0, 0]], 10.0 / 255.0);
        assert_eq!(xy.x()[[1, 0, 0, 0]], 20.0 / 255.0);
    }

    #[test]
    fn load_rejects_invalid_num_classes() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(42, dir.path(), Split::Train, false).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidNumClasses(42)));
    }
}
