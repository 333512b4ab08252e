//! The immutable point set searched by every batch.

use crate::data_format::norms::NormTable;
use crate::error::{KnnError, Result};
use crate::types::{DatapointValue, Element, CORPUS_ALIGNMENT, MAX_POINTS};
use aligned_vec::{AVec, ConstAlign};
use std::ops::Range;

/// Largest accepted squared norm. Bounds `|q|^2 + |c|^2` and `2 q.c` to at
/// most `Element::MAX / 2`, so the norm expansion never overflows.
pub const MAX_SQUARED_NORM: Element = Element::MAX / 4.0;

/// An ordered, immutable set of N points in R^L with their squared norms.
///
/// Points are stored row-major and contiguous (no padding between rows), so
/// the storage doubles as a column-major `L x N` matrix for the dot-product
/// step. When built from two partitions, the first partition's points take
/// indices `0..n1` and the second partition's take `n1..n1+n2`.
pub struct Corpus {
    /// Row-major point coordinates, aligned for SIMD.
    data: AVec<Element, ConstAlign<CORPUS_ALIGNMENT>>,

    /// Number of points.
    num_points: usize,

    /// Dimensionality of each point.
    dimensionality: usize,

    /// Squared norm of each point.
    norms: NormTable,
}

impl Corpus {
    /// Create a corpus from a vector of points.
    pub fn from_vecs<T: DatapointValue>(points: &[Vec<T>]) -> Result<Self> {
        Self::from_partitions(points, &[])
    }

    /// Create a corpus by concatenating two partitions (e.g. train then test).
    pub fn from_partitions<T: DatapointValue>(first: &[Vec<T>], second: &[Vec<T>]) -> Result<Self> {
        let dim = first
            .first()
            .or_else(|| second.first())
            .map(|p| p.len())
            .ok_or_else(|| KnnError::invalid_argument("corpus is empty"))?;

        for (i, point) in first.iter().chain(second.iter()).enumerate() {
            if point.len() != dim {
                return Err(KnnError::invalid_argument(format!(
                    "point {} has dimensionality {}, expected {}",
                    i,
                    point.len(),
                    dim
                )));
            }
        }

        let parts: Vec<&[T]> = first
            .iter()
            .chain(second.iter())
            .map(|p| p.as_slice())
            .collect();
        Self::from_parts(dim, &parts)
    }

    /// Create a corpus from a flat row-major array.
    pub fn from_flat<T: DatapointValue>(data: &[T], dimensionality: usize) -> Result<Self> {
        Self::from_flat_partitions(data, dimensionality, &[], dimensionality)
    }

    /// Create a corpus from two flat row-major partitions.
    ///
    /// Each partition carries its own column count; a mismatch is an input
    /// validation error even when one partition has no rows.
    pub fn from_flat_partitions<T: DatapointValue>(
        first: &[T],
        first_dim: usize,
        second: &[T],
        second_dim: usize,
    ) -> Result<Self> {
        if first_dim != second_dim {
            return Err(KnnError::invalid_argument(format!(
                "partition dimensionality mismatch: {} vs {}",
                first_dim, second_dim
            )));
        }
        let dim = first_dim;
        if dim == 0 {
            return Err(KnnError::invalid_argument("dimensionality cannot be 0"));
        }
        for (name, part) in [("first", first), ("second", second)] {
            if part.len() % dim != 0 {
                return Err(KnnError::invalid_argument(format!(
                    "{} partition length {} is not a multiple of dimensionality {}",
                    name,
                    part.len(),
                    dim
                )));
            }
        }
        Self::from_parts(dim, &[first, second])
    }

    fn from_parts<T: DatapointValue>(dim: usize, parts: &[&[T]]) -> Result<Self> {
        if dim == 0 {
            return Err(KnnError::invalid_argument("dimensionality cannot be 0"));
        }
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let num_points = total / dim;
        if num_points == 0 {
            return Err(KnnError::invalid_argument("corpus is empty"));
        }
        if num_points > MAX_POINTS {
            return Err(KnnError::invalid_argument(format!(
                "corpus has {} points, at most {} are addressable",
                num_points, MAX_POINTS
            )));
        }

        let mut data: AVec<Element, ConstAlign<CORPUS_ALIGNMENT>> = AVec::new(CORPUS_ALIGNMENT);
        data.reserve(total);
        for part in parts {
            for &value in part.iter() {
                let value = value.to_f32();
                if !value.is_finite() {
                    return Err(KnnError::invalid_argument(format!(
                        "non-finite coordinate in point {}",
                        data.len() / dim
                    )));
                }
                data.push(value);
            }
        }

        let norms = NormTable::compute(&data, dim);
        if let Some(i) = norms
            .as_slice()
            .iter()
            .position(|&norm| norm > MAX_SQUARED_NORM)
        {
            return Err(KnnError::invalid_argument(format!(
                "squared norm of point {} is out of range (at most {:e})",
                i, MAX_SQUARED_NORM
            )));
        }
        Ok(Self {
            data,
            num_points,
            dimensionality: dim,
            norms,
        })
    }

    /// Number of points (N).
    #[inline]
    pub fn size(&self) -> usize {
        self.num_points
    }

    /// A corpus always holds at least one point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Dimensionality of every point (L).
    #[inline]
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// Get a point by index.
    pub fn get(&self, index: usize) -> Option<&[Element]> {
        if index >= self.num_points {
            return None;
        }
        Some(self.point(index))
    }

    /// Get a point by index, panicking if out of bounds.
    #[inline]
    pub fn point(&self, index: usize) -> &[Element] {
        let offset = index * self.dimensionality;
        &self.data[offset..offset + self.dimensionality]
    }

    /// Contiguous coordinates of the points in `range`.
    #[inline]
    pub fn rows(&self, range: Range<usize>) -> &[Element] {
        &self.data[range.start * self.dimensionality..range.end * self.dimensionality]
    }

    /// All coordinates, row-major.
    #[inline]
    pub fn as_slice(&self) -> &[Element] {
        &self.data
    }

    /// The precomputed squared norms.
    #[inline]
    pub fn norms(&self) -> &NormTable {
        &self.norms
    }

    /// Approximate heap footprint of coordinates and norms.
    pub fn memory_bytes(&self) -> usize {
        (self.data.len() + self.norms.len()) * std::mem::size_of::<Element>()
    }
}

impl std::fmt::Debug for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Corpus")
            .field("num_points", &self.num_points)
            .field("dimensionality", &self.dimensionality)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vecs() {
        let corpus = Corpus::from_vecs(&[vec![1.0f32, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(corpus.size(), 2);
        assert_eq!(corpus.dimensionality(), 2);
        assert_eq!(corpus.point(1), &[3.0, 4.0]);
        assert_eq!(corpus.norms().as_slice(), &[5.0, 25.0]);
    }

    #[test]
    fn test_partition_order() {
        let train = vec![vec![0u8, 0], vec![1, 1]];
        let test = vec![vec![9u8, 9]];
        let corpus = Corpus::from_partitions(&train, &test).unwrap();
        assert_eq!(corpus.size(), 3);
        assert_eq!(corpus.point(0), &[0.0, 0.0]);
        assert_eq!(corpus.point(2), &[9.0, 9.0]);
        assert_eq!(corpus.rows(1..3), &[1.0, 1.0, 9.0, 9.0]);
    }

    #[test]
    fn test_dimension_mismatch_between_partitions() {
        let train = vec![vec![0.0f32, 0.0]];
        let test = vec![vec![1.0f32, 1.0, 1.0]];
        let err = Corpus::from_partitions(&train, &test).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = Corpus::from_flat_partitions(&[0.0f32; 4], 2, &[0.0f32; 3], 3).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(Corpus::from_vecs(&empty).is_err());
        assert!(Corpus::from_flat::<f32>(&[], 4).is_err());
    }

    #[test]
    fn test_from_flat_partitions_with_empty_second() {
        let corpus = Corpus::from_flat_partitions(&[1.0f64, 2.0, 3.0, 4.0], 2, &[], 2).unwrap();
        assert_eq!(corpus.size(), 2);
        assert_eq!(corpus.point(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_ragged_flat_rejected() {
        assert!(Corpus::from_flat(&[1.0f32, 2.0, 3.0], 2).is_err());
        assert!(Corpus::from_flat(&[1.0f32, 2.0], 0).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = Corpus::from_vecs(&[vec![1.0f32, f32::NAN]]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_norm_overflow_rejected() {
        let err = Corpus::from_vecs(&[vec![0.0f32, 0.0], vec![1e19, 1e19]]).unwrap_err();
        assert!(err.is_invalid_argument());
        // Finite norms whose sum would overflow.
        let err = Corpus::from_vecs(&[vec![1.5e19f32], vec![-1.5e19]]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(Corpus::from_vecs(&[vec![1e18f32], vec![-1e18]]).is_ok());
    }

    #[test]
    fn test_get_out_of_bounds() {
        let corpus = Corpus::from_vecs(&[vec![1.0f32]]).unwrap();
        assert!(corpus.get(0).is_some());
        assert!(corpus.get(1).is_none());
    }
}
