//! Contiguous query ranges.

use crate::error::{KnnError, Result};
use std::ops::Range;

/// A contiguous half-open range `[start, end)` of query indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Batch {
    /// First query index.
    pub start: usize,
    /// One past the last query index.
    pub end: usize,
}

impl Batch {
    /// Create a batch, checking `start < end`.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(KnnError::invalid_argument(format!(
                "empty batch range [{start}, {end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of queries in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Batches are never empty once constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The range of query indices.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A partition of `[0, num_points)` into batches of `batch_size` queries.
///
/// Batches cover the range exactly with no overlap; only the last one may be
/// shorter than `batch_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    num_points: usize,
    batch_size: usize,
}

impl BatchPlan {
    /// Create a plan. Both values must be at least 1.
    pub fn new(num_points: usize, batch_size: usize) -> Result<Self> {
        if num_points == 0 {
            return Err(KnnError::invalid_argument("cannot plan batches for zero points"));
        }
        if batch_size == 0 {
            return Err(KnnError::invalid_argument("batch size must be at least 1"));
        }
        Ok(Self {
            num_points,
            batch_size,
        })
    }

    /// Number of points covered.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Nominal batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches, `ceil(N / B)`.
    pub fn num_batches(&self) -> usize {
        self.num_points.div_ceil(self.batch_size)
    }

    /// Iterate batches in start-offset order `0, B, 2B, ...`.
    pub fn iter(&self) -> impl Iterator<Item = Batch> + '_ {
        (0..self.num_points)
            .step_by(self.batch_size)
            .map(move |start| Batch {
                start,
                end: (start + self.batch_size).min(self.num_points),
            })
    }
}
