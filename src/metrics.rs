use crate::error::{Error, Result};
use crate::{Labels, Matrix};
use ndarray::Axis;
use std::collections::HashMap;

/// Within-cluster sum of squared distances to the assigned centers (WCSS).
pub fn inertia(x: &Matrix, labels: &Labels, centers: &Matrix) -> Result<f64> {
    if x.nrows() != labels.len() {
        return Err(Error::DimensionMismatch {
            expected: x.nrows(),
            found: labels.len(),
        });
    }
    if x.ncols() != centers.ncols() {
        return Err(Error::DimensionMismatch {
            expected: centers.ncols(),
            found: x.ncols(),
        });
    }

    let mut total = 0.0;
    for (row, &label) in x.axis_iter(Axis(0)).zip(labels.iter()) {
        if label >= centers.nrows() {
            return Err(Error::InvalidClusterCount(label + 1));
        }
        let diff = &row - &centers.row(label);
        total += diff.dot(&diff);
    }
    Ok(total)
}

/// Number of samples per cluster id in `0..n_clusters`.
pub fn label_counts(labels: &Labels, n_clusters: usize) -> Result<Vec<usize>> {
    let mut counts = vec![0usize; n_clusters];
    for &label in labels.iter() {
        let slot = counts.get_mut(label).ok_or(Error::InvalidClusterCount(label + 1))?;
        *slot += 1;
    }
    Ok(counts)
}

/// Adjusted Rand index between two labelings: 1.0 for identical partitions
/// up to renaming, around 0.0 for independent ones.
pub fn adjusted_rand_index(labels_true: &Labels, labels_pred: &Labels) -> Result<f64> {
    if labels_true.len() != labels_pred.len() {
        return Err(Error::DimensionMismatch {
            expected: labels_true.len(),
            found: labels_pred.len(),
        });
    }
    let n = labels_true.len();
    if n < 2 {
        return Ok(1.0);
    }

    let mut contingency: HashMap<(usize, usize), u64> = HashMap::new();
    let mut row_sums: HashMap<usize, u64> = HashMap::new();
    let mut col_sums: HashMap<usize, u64> = HashMap::new();

    for (&a, &b) in labels_true.iter().zip(labels_pred.iter()) {
        *contingency.entry((a, b)).or_insert(0) += 1;
        *row_sums.entry(a).or_insert(0) += 1;
        *col_sums.entry(b).or_insert(0) += 1;
    }

    let pairs = |c: u64| (c * c.saturating_sub(1)) as f64 / 2.0;

    let index: f64 = contingency.values().map(|&c| pairs(c)).sum();
    let sum_rows: f64 = row_sums.values().map(|&c| pairs(c)).sum();
    let sum_cols: f64 = col_sums.values().map(|&c| pairs(c)).sum();

    let expected = sum_rows * sum_cols / pairs(n as u64);
    let max_index = (sum_rows + sum_cols) / 2.0;

    if max_index == expected {
        return Ok(1.0);
    }

    Ok((index - expected) / (max_index - expected))
}
