//! Per-point squared norms.

use crate::distance_measures::squared_norm;
use crate::types::Element;
use rayon::prelude::*;

/// Squared L2 norm of every corpus point, computed once before batching.
///
/// Invariant: `norm[i] == sum(point[i][d]^2 for d in 0..L)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormTable {
    norms: Vec<Element>,
}

impl NormTable {
    /// Compute norms for row-major `data` with `dim` columns.
    pub fn compute(data: &[Element], dim: usize) -> Self {
        debug_assert!(dim > 0 && data.len() % dim == 0);
        let norms = data.par_chunks(dim).map(squared_norm).collect();
        Self { norms }
    }

    /// Number of norms (equals the corpus size).
    pub fn len(&self) -> usize {
        self.norms.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// Squared norm of point `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Element> {
        self.norms.get(index).copied()
    }

    /// All norms in corpus order.
    #[inline]
    pub fn as_slice(&self) -> &[Element] {
        &self.norms
    }
}
