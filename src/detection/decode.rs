//! Proposal decoding for anchor-free heads with distribution-focal box regression.

use crate::detection::tensors::{RawTensors, StrideOutput};
use crate::detection::{Detection, Rect};
use ndarray::ArrayView1;
use tracing::debug;

/// Decode every stride level and concatenate the proposals.
///
/// Strides are independent; no suppression happens here.
pub fn decode_proposals(
    tensors: &RawTensors,
    padded_width: u32,
    padded_height: u32,
    confidence_threshold: f32,
) -> Vec<Detection> {
    let mut proposals = Vec::new();
    for output in tensors.strides() {
        let decoded = generate_proposals(output, padded_width, padded_height, confidence_threshold);
        debug!(
            stride = output.stride(),
            proposals = decoded.len(),
            "Decoded stride proposals"
        );
        proposals.extend(decoded);
    }
    proposals
}

/// Grid dimensions `(cols, rows)` for one stride.
///
/// The longer padded side is divided by the stride; the other axis is derived
/// from the cell count so non-square inputs are tolerated.
pub fn grid_dimensions(
    num_grid_cells: usize,
    stride: u32,
    padded_width: u32,
    padded_height: u32,
) -> (usize, usize) {
    let stride = stride.max(1) as usize;
    if padded_width > padded_height {
        let cols = padded_width as usize / stride;
        let rows = num_grid_cells.checked_div(cols).unwrap_or(0);
        (cols, rows)
    } else {
        let rows = padded_height as usize / stride;
        let cols = num_grid_cells.checked_div(rows).unwrap_or(0);
        (cols, rows)
    }
}

pub fn generate_proposals(
    output: &StrideOutput,
    padded_width: u32,
    padded_height: u32,
    confidence_threshold: f32,
) -> Vec<Detection> {
    let stride = output.stride();
    let (grid_cols, grid_rows) = grid_dimensions(
        output.num_grid_cells(),
        stride,
        padded_width,
        padded_height,
    );
    if grid_cols == 0 || grid_rows == 0 {
        debug!(stride, padded_width, padded_height, "Degenerate grid, skipping stride");
        return Vec::new();
    }

    let bins = output.reg_max_bins();
    let stride_f = stride as f32;
    let mut probabilities = vec![0.0f32; bins];
    let mut proposals = Vec::new();

    for row in 0..grid_rows {
        for col in 0..grid_cols {
            let idx = row * grid_cols + col;
            let Some((label, score)) = best_class(output.class_scores(idx)) else {
                continue;
            };
            if score < confidence_threshold {
                continue;
            }

            let mut ltrb = [0.0f32; 4];
            for (side, offset) in ltrb.iter_mut().enumerate() {
                let logits = output.side_logits(idx, side);
                *offset = expected_bin(logits, &mut probabilities) * stride_f;
            }

            let center_x = (col as f32 + 0.5) * stride_f;
            let center_y = (row as f32 + 0.5) * stride_f;
            let x0 = center_x - ltrb[0];
            let y0 = center_y - ltrb[1];
            let x1 = center_x + ltrb[2];
            let y1 = center_y + ltrb[3];

            proposals.push(Detection {
                rect: Rect::new(x0, y0, x1 - x0, y1 - y0),
                label,
                confidence: score,
            });
        }
    }

    proposals
}

/// Index and value of the highest finite score; the first wins on ties.
fn best_class(scores: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (label, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((label, score)),
        }
    }
    best
}

/// Softmax with max subtraction, written into `out`.
pub fn softmax(logits: ArrayView1<'_, f32>, out: &mut [f32]) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for (p, &logit) in out.iter_mut().zip(logits.iter()) {
        *p = (logit - max).exp();
        sum += *p;
    }
    if sum > 0.0 {
        for p in out.iter_mut() {
            *p /= sum;
        }
    }
}

/// Expected bin index under the softmax distribution of `logits`.
pub fn expected_bin(logits: ArrayView1<'_, f32>, scratch: &mut [f32]) -> f32 {
    let probabilities = &mut scratch[..logits.len()];
    softmax(logits, probabilities);
    probabilities
        .iter()
        .enumerate()
        .map(|(bin, p)| bin as f32 * p)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::tensors::array_from_rows;
    use ndarray::aview1;

    const BINS: usize = 8;

    /// Distribution row whose softmax is effectively one-hot at `bin` on every side.
    fn peaked_distribution(bin: usize) -> Vec<f32> {
        let mut row = vec![0.0f32; 4 * BINS];
        for side in 0..4 {
            row[side * BINS + bin] = 50.0;
        }
        row
    }

    /// Stride-32 output over a 64x64 padded input (2x2 grid, 3 classes).
    fn single_hit_output(hit_cell: usize, score: f32) -> StrideOutput {
        let mut cls_rows = vec![vec![0.1f32, 0.05, 0.0]; 4];
        cls_rows[hit_cell] = vec![0.1, score, 0.2];
        let dis_rows = vec![peaked_distribution(1); 4];
        StrideOutput::new(
            32,
            array_from_rows(32, &cls_rows).expect("cls"),
            array_from_rows(32, &dis_rows).expect("dis"),
        )
        .expect("valid stride output")
    }

    #[test]
    fn softmax_sums_to_one_and_is_stable() {
        let logits = [1000.0f32, 1000.0, 1000.0, 1000.0];
        let mut out = [0.0f32; 4];

        softmax(aview1(&logits), &mut out);

        for p in out {
            assert!((p - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn expected_bin_of_uniform_distribution_is_midpoint() {
        let logits = [0.0f32; BINS];
        let mut scratch = [0.0f32; BINS];

        let expectation = expected_bin(aview1(&logits), &mut scratch);

        assert!((expectation - 3.5).abs() < 1e-5);
    }

    #[test]
    fn grid_dimensions_follow_longer_side() {
        assert_eq!(grid_dimensions(52 * 40, 8, 416, 320), (52, 40));
        assert_eq!(grid_dimensions(40 * 52, 8, 320, 416), (40, 52));
        assert_eq!(grid_dimensions(16, 32, 128, 128), (4, 4));
    }

    #[test]
    fn single_cell_above_threshold_yields_one_detection() {
        let output = single_hit_output(3, 0.9);

        let proposals = generate_proposals(&output, 64, 64, 0.4);

        assert_eq!(proposals.len(), 1);
        let detection = proposals[0];
        assert_eq!(detection.label, 1);
        assert_eq!(detection.confidence, 0.9);
        // Cell (1,1) center is (48,48); each side decodes to ~1 bin * 32 px.
        assert!((detection.rect.x - 16.0).abs() < 1e-3);
        assert!((detection.rect.y - 16.0).abs() < 1e-3);
        assert!((detection.rect.width - 64.0).abs() < 1e-3);
        assert!((detection.rect.height - 64.0).abs() < 1e-3);
    }

    #[test]
    fn raising_threshold_above_score_yields_nothing() {
        let output = single_hit_output(0, 0.9);

        let proposals = generate_proposals(&output, 64, 64, 0.95);

        assert!(proposals.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let output = single_hit_output(2, 0.5);

        let proposals = generate_proposals(&output, 64, 64, 0.5);

        assert_eq!(proposals.len(), 1);
    }

    #[test]
    fn strides_are_concatenated() {
        let tensors = RawTensors::new(vec![single_hit_output(0, 0.8), single_hit_output(1, 0.7)]);

        let proposals = decode_proposals(&tensors, 64, 64, 0.4);

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].confidence, 0.8);
        assert_eq!(proposals[1].confidence, 0.7);
    }

    #[test]
    fn degenerate_grid_is_skipped() {
        let output = single_hit_output(0, 0.9);

        let proposals = generate_proposals(&output, 16, 16, 0.4);

        assert!(proposals.is_empty());
    }

    #[test]
    fn non_finite_scores_never_win() {
        let cls_rows = vec![vec![0.1f32, f32::NAN], vec![f32::NAN, 0.9], vec![0.5, f32::INFINITY]];
        let dis_rows = vec![peaked_distribution(0); 3];
        let output = StrideOutput::new(
            32,
            array_from_rows(32, &cls_rows).expect("cls"),
            array_from_rows(32, &dis_rows).expect("dis"),
        )
        .expect("valid stride output");

        // 96x32 padded input: a 3x1 grid.
        let proposals = generate_proposals(&output, 96, 32, 0.4);

        assert_eq!(proposals.len(), 2);
        assert!(
            proposals
                .iter()
                .all(|d| (0.0..=1.0).contains(&d.confidence))
        );
        assert_eq!((proposals[0].label, proposals[0].confidence), (1, 0.9));
        assert_eq!((proposals[1].label, proposals[1].confidence), (0, 0.5));
    }
}
