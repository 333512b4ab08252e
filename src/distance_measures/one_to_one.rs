//! One-to-one distance computations.
//!
//! Scalar kernels over dense slices. The batched path in
//! [`many_to_many`](super::many_to_many) uses these for norms; callers can
//! use them directly to check individual distances.

use crate::types::Element;

/// Squared L2 norm of a dense vector.
#[inline]
pub fn squared_norm(a: &[Element]) -> Element {
    a.iter().map(|&x| x * x).sum()
}

/// Squared L2 distance between two dense vectors.
#[inline]
pub fn squared_l2(a: &[Element], b: &[Element]) -> Element {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// L2 (Euclidean) distance between two dense vectors.
#[inline]
pub fn l2_distance(a: &[Element], b: &[Element]) -> Element {
    squared_l2(a, b).sqrt()
}

/// Dot product of two dense vectors.
#[inline]
pub fn dot_product(a: &[Element], b: &[Element]) -> Element {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}
