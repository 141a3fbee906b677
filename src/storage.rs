//! Partition file persistence.
//!
//! Each partition is one safetensors file holding two tensors: `"x"` (f32
//! image stack) and `"y"` (i64 labels). The format is written and read by
//! this module only; no cross-tool compatibility is intended.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array4};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors, serialize_to_file};

use crate::dataset::XY;
use crate::error::{PartitionError, Result};

const FEATURES: &str = "x";
const LABELS: &str = "y";

/// Writes one (features, labels) pair to `path`.
pub fn save_xy(xy: &XY, path: &Path) -> Result<()> {
    // Iteration order is the logical order, so this is layout-independent.
    let x_data: Vec<f32> = xy.x().iter().copied().collect();
    let y_data: Vec<i64> = xy.y().iter().copied().collect();

    let x_view = TensorView::new(
        Dtype::F32,
        xy.x().shape().to_vec(),
        bytemuck::cast_slice(&x_data),
    )?;
    let y_view = TensorView::new(
        Dtype::I64,
        xy.y().shape().to_vec(),
        bytemuck::cast_slice(&y_data),
    )?;

    serialize_to_file([(FEATURES, x_view), (LABELS, y_view)], &None, path)?;
    Ok(())
}

/// Reads one (features, labels) pair from `path`.
pub fn load_xy(path: &Path) -> Result<XY> {
    let buffer = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&buffer)?;

    let x_view = tensors.tensor(FEATURES)?;
    let y_view = tensors.tensor(LABELS)?;

    if x_view.dtype() != Dtype::F32 {
        return Err(bad_tensor(FEATURES, format!("dtype {:?}", x_view.dtype())));
    }
    if y_view.dtype() != Dtype::I64 {
        return Err(bad_tensor(LABELS, format!("dtype {:?}", y_view.dtype())));
    }

    let x_shape = match x_view.shape() {
        [n, c, h, w] => (*n, *c, *h, *w),
        other => return Err(bad_tensor(FEATURES, format!("shape {other:?}"))),
    };
    let y_len = match y_view.shape() {
        [n] => *n,
        other => return Err(bad_tensor(LABELS, format!("shape {other:?}"))),
    };

    // pod_collect_to_vec copies, so unaligned file buffers are fine.
    let x_data: Vec<f32> = bytemuck::pod_collect_to_vec(x_view.data());
    let y_data: Vec<i64> = bytemuck::pod_collect_to_vec(y_view.data());

    let x = Array4::from_shape_vec(x_shape, x_data)
        .map_err(|e| bad_tensor(FEATURES, e.to_string()))?;
    let y = Array1::from_shape_vec(y_len, y_data)
        .map_err(|e| bad_tensor(LABELS, e.to_string()))?;

    XY::new(x, y)
}

fn bad_tensor(name: &'static str, reason: String) -> PartitionError {
    PartitionError::BadTensor { name, reason }
}
