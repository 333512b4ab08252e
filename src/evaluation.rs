//! Recall of a candidate neighbor table against a ground-truth table.

use crate::brute_force::NeighborTable;
use crate::error::{KnnError, Result};
use crate::types::PointIndex;
use std::collections::HashSet;

/// Fraction of `truth` found in `candidate`, ignoring order.
pub fn row_recall(candidate: &[PointIndex], truth: &[PointIndex]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let wanted: HashSet<PointIndex> = truth.iter().copied().collect();
    let found = candidate
        .iter()
        .copied()
        .collect::<HashSet<PointIndex>>()
        .intersection(&wanted)
        .count();
    found as f64 / truth.len() as f64
}

/// Recall of `candidate` over every row of `truth`, in `[0, 1]`.
///
/// Counts every ground-truth neighbor found in the candidate row and
/// divides by `rows * truth.k()`. The tables must have the same number of
/// rows; the candidate may return more or fewer neighbors per row.
pub fn recall_at_k(candidate: &NeighborTable, truth: &NeighborTable) -> Result<f64> {
    if candidate.num_rows() != truth.num_rows() {
        return Err(KnnError::invalid_argument(format!(
            "candidate has {} rows, ground truth has {}",
            candidate.num_rows(),
            truth.num_rows()
        )));
    }
    if truth.num_rows() == 0 {
        return Ok(1.0);
    }

    let total: f64 = candidate
        .rows()
        .zip(truth.rows())
        .map(|(c, t)| row_recall(c, t))
        .sum();
    Ok(total / truth.num_rows() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_recall_ignores_order() {
        assert_eq!(row_recall(&[3, 1, 2], &[1, 2, 3]), 1.0);
        assert_eq!(row_recall(&[1, 9], &[1, 2]), 0.5);
        assert_eq!(row_recall(&[1, 1], &[1, 2]), 0.5);
    }

    #[test]
    fn test_recall_at_k() {
        let truth = NeighborTable::from_rows(&[vec![1, 2], vec![0, 2], vec![0, 1]]).unwrap();
        let candidate = NeighborTable::from_rows(&[vec![2, 1], vec![0, 3], vec![3, 4]]).unwrap();
        let recall = recall_at_k(&candidate, &truth).unwrap();
        assert!((recall - 0.5).abs() < 1e-12);
        assert_eq!(recall_at_k(&truth, &truth).unwrap(), 1.0);
    }

    #[test]
    fn test_recall_with_larger_candidate_k() {
        let truth = NeighborTable::from_rows(&[vec![1], vec![0]]).unwrap();
        let candidate = NeighborTable::from_rows(&[vec![2, 1], vec![2, 3]]).unwrap();
        assert_eq!(recall_at_k(&candidate, &truth).unwrap(), 0.5);
    }

    #[test]
    fn test_recall_rejects_row_mismatch() {
        let truth = NeighborTable::from_rows(&[vec![1], vec![0]]).unwrap();
        let candidate = NeighborTable::from_rows(&[vec![1]]).unwrap();
        assert!(recall_at_k(&candidate, &truth).is_err());
    }
}
