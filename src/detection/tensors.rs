//! Raw per-stride head outputs, decoupled from any inference engine.
//!
//! Each stride level carries a class-score tensor shaped
//! `(num_grid_cells, num_classes)` and a distribution tensor shaped
//! `(num_grid_cells, 4 * reg_max_bins)`, both row-major.

use crate::error::DetectionError;
use ndarray::{Array2, ArrayView1, s};

/// Strides produced by the detection head, finest first.
pub const DEFAULT_STRIDES: [u32; 3] = [8, 16, 32];

/// Build a `(rows, cols)` array from a flat row-major buffer.
pub fn array_from_shape(
    stride: u32,
    rows: usize,
    cols: usize,
    data: Vec<f32>,
) -> Result<Array2<f32>, DetectionError> {
    let len = data.len();
    Array2::from_shape_vec((rows, cols), data).map_err(|err| DetectionError::TensorShape {
        stride,
        reason: format!("{len} values do not fit ({rows}, {cols}): {err}"),
    })
}

/// Build an array from equally sized rows.
pub fn array_from_rows(stride: u32, rows: &[Vec<f32>]) -> Result<Array2<f32>, DetectionError> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(ragged) = rows.iter().position(|row| row.len() != cols) {
        return Err(DetectionError::TensorShape {
            stride,
            reason: format!(
                "row {ragged} has {} values, expected {cols}",
                rows[ragged].len()
            ),
        });
    }
    let data = rows.iter().flatten().copied().collect();
    array_from_shape(stride, rows.len(), cols, data)
}

/// Head output for a single stride level.
#[derive(Debug, Clone, PartialEq)]
pub struct StrideOutput {
    stride: u32,
    class_scores: Array2<f32>,
    distribution: Array2<f32>,
}

impl StrideOutput {
    pub fn new(
        stride: u32,
        class_scores: Array2<f32>,
        distribution: Array2<f32>,
    ) -> Result<Self, DetectionError> {
        if stride == 0 {
            return Err(DetectionError::ZeroStride);
        }
        if class_scores.nrows() != distribution.nrows() {
            return Err(DetectionError::TensorShape {
                stride,
                reason: format!(
                    "class tensor has {} rows, distribution tensor has {}",
                    class_scores.nrows(),
                    distribution.nrows()
                ),
            });
        }
        if distribution.ncols() == 0 || distribution.ncols() % 4 != 0 {
            return Err(DetectionError::TensorShape {
                stride,
                reason: format!(
                    "distribution width {} is not a positive multiple of 4",
                    distribution.ncols()
                ),
            });
        }
        Ok(Self {
            stride,
            class_scores,
            distribution,
        })
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn num_grid_cells(&self) -> usize {
        self.class_scores.nrows()
    }

    /// Class scores of one grid cell.
    pub fn class_scores(&self, cell: usize) -> ArrayView1<'_, f32> {
        self.class_scores.row(cell)
    }

    /// Distribution logits for one side (0..4 as left, top, right, bottom) of a grid cell.
    pub fn side_logits(&self, cell: usize, side: usize) -> ArrayView1<'_, f32> {
        let bins = self.reg_max_bins();
        self.distribution.slice(s![cell, side * bins..(side + 1) * bins])
    }

    /// Number of bins per box side.
    pub fn reg_max_bins(&self) -> usize {
        self.distribution.ncols() / 4
    }
}

/// All head outputs for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTensors {
    strides: Vec<StrideOutput>,
}

impl RawTensors {
    pub fn new(strides: Vec<StrideOutput>) -> Self {
        Self { strides }
    }

    pub fn strides(&self) -> &[StrideOutput] {
        &self.strides
    }
}
