use ndarray::{Array3, Axis};

/// Per-channel normalization for CHW image tensors.
///
/// Applied on item access, after pixels have been scaled to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalize {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        assert!(std.iter().all(|&s| s > 0.0), "std must be > 0");
        Self { mean, std }
    }

    /// Normalizes a 3x32x32 feature tensor channel by channel.
    pub fn apply(&self, mut image: Array3<f32>) -> Array3<f32> {
        for (c, mut channel) in image.axis_iter_mut(Axis(0)).enumerate() {
            channel.mapv_inplace(|v| (v - self.mean[c]) / self.std[c]);
        }
        image
    }
}

/// The standard CIFAR normalization constants.
pub fn cifar_normalization() -> Normalize {
    Normalize::new([0.4914, 0.4822, 0.4465], [0.2023, 0.1994, 0.2010])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn normalize_shifts_and_scales_per_channel() {
        let norm = Normalize::new([0.5, 0.0, 1.0], [0.5, 1.0, 2.0]);
        let image = Array3::from_elem((3, 2, 2), 1.0f32);
        let out = norm.apply(image);

        assert_eq!(out[[0, 0, 0]], 1.0); // (1 - 0.5) / 0.5
        assert_eq!(out[[1, 0, 0]], 1.0); // (1 - 0.0) / 1.0
        assert_eq!(out[[2, 0, 0]], 0.0); // (1 - 1.0) / 2.0
    }

    #[test]
    fn cifar_constants() {
        let norm = cifar_normalization();
        assert_eq!(norm.mean, [0.4914, 0.4822, 0.4465]);
        assert_eq!(norm.std, [0.2023, 0.1994, 0.2010]);
    }
}
