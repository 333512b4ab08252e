//! The neighbor table and its batch-wise assembly.

use crate::batching::{Batch, BatchPlan};
use crate::error::{KnnError, Result};
use crate::types::{Element, PointIndex};
use serde::{Deserialize, Serialize};

/// K neighbor indices for each of N queries, stored row-major.
///
/// Rows are in query order. Within a row, neighbors are a top-K set with no
/// guaranteed ordering by distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNeighborTable")]
pub struct NeighborTable {
    num_rows: usize,
    k: usize,
    indices: Vec<PointIndex>,
    /// Squared distances parallel to `indices`, when requested.
    distances: Option<Vec<Element>>,
}

impl NeighborTable {
    /// Build a table from a flat row-major index array.
    pub fn from_flat(indices: Vec<PointIndex>, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(KnnError::invalid_argument("k must be at least 1"));
        }
        if indices.len() % k != 0 {
            return Err(KnnError::invalid_argument(format!(
                "{} indices do not form rows of {}",
                indices.len(),
                k
            )));
        }
        Ok(Self {
            num_rows: indices.len() / k,
            k,
            indices,
            distances: None,
        })
    }

    /// Build a table from per-row index lists of equal length.
    pub fn from_rows(rows: &[Vec<PointIndex>]) -> Result<Self> {
        let k = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != k) {
            return Err(KnnError::invalid_argument(format!(
                "row {} has {} neighbors, expected {}",
                i,
                row.len(),
                k
            )));
        }
        Self::from_flat(rows.concat(), k)
    }

    /// Number of rows (queries).
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Neighbors per row.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Check if the table carries distances.
    pub fn has_distances(&self) -> bool {
        self.distances.is_some()
    }

    /// Neighbor indices of query `q`.
    pub fn neighbors(&self, q: usize) -> &[PointIndex] {
        &self.indices[q * self.k..(q + 1) * self.k]
    }

    /// Squared distances of query `q`'s neighbors, parallel to [`neighbors`](Self::neighbors).
    pub fn distances(&self, q: usize) -> Option<&[Element]> {
        self.distances
            .as_ref()
            .map(|d| &d[q * self.k..(q + 1) * self.k])
    }

    /// Euclidean distances of query `q`'s neighbors.
    pub fn euclidean_distances(&self, q: usize) -> Option<Vec<Element>> {
        self.distances(q)
            .map(|d| d.iter().map(|&x| x.sqrt()).collect())
    }

    /// Iterate rows in query order.
    pub fn rows(&self) -> impl Iterator<Item = &[PointIndex]> + '_ {
        self.indices.chunks_exact(self.k)
    }

    /// All indices, row-major.
    pub fn as_flat(&self) -> &[PointIndex] {
        &self.indices
    }

    /// Indices as the `int32` values the stored table uses.
    pub fn to_i32(&self) -> Result<Vec<i32>> {
        self.indices
            .iter()
            .map(|&i| {
                i32::try_from(i).map_err(|_| {
                    KnnError::invalid_argument(format!("index {i} does not fit in int32"))
                })
            })
            .collect()
    }
}

/// Unchecked serialized form; every deserialized table passes through
/// [`NeighborTable::from_flat`].
#[derive(Deserialize)]
struct RawNeighborTable {
    num_rows: usize,
    k: usize,
    indices: Vec<PointIndex>,
    #[serde(default)]
    distances: Option<Vec<Element>>,
}

impl TryFrom<RawNeighborTable> for NeighborTable {
    type Error = KnnError;

    fn try_from(raw: RawNeighborTable) -> Result<Self> {
        let mut table = Self::from_flat(raw.indices, raw.k)?;
        if table.num_rows != raw.num_rows {
            return Err(KnnError::data_loss(format!(
                "table declares {} rows but holds {}",
                raw.num_rows, table.num_rows
            )));
        }
        if let Some(distances) = &raw.distances {
            if distances.len() != table.indices.len() {
                return Err(KnnError::data_loss(format!(
                    "{} distances for {} indices",
                    distances.len(),
                    table.indices.len()
                )));
            }
        }
        table.distances = raw.distances;
        Ok(table)
    }
}

/// A batch's exclusive window into the output table.
#[derive(Debug)]
pub struct BatchSlot<'a> {
    /// Query range the window covers.
    pub batch: Batch,
    /// `batch.len() * k` indices.
    pub indices: &'a mut [PointIndex],
    /// `batch.len() * k` distances, when the table keeps them.
    pub distances: Option<&'a mut [Element]>,
}

/// Owns the output table while batches fill it.
///
/// The table is allocated to full size up front. Each batch receives a
/// disjoint, statically assigned row window, so workers write without
/// synchronization and every row is written by exactly one batch.
#[derive(Debug)]
pub struct ResultAssembler {
    table: NeighborTable,
}

impl ResultAssembler {
    /// Allocate an `num_rows x k` table.
    ///
    /// Fails with `ResourceExhausted` if the allocation is refused.
    pub fn new(num_rows: usize, k: usize, with_distances: bool) -> Result<Self> {
        if k == 0 {
            return Err(KnnError::invalid_argument("k must be at least 1"));
        }
        let len = num_rows
            .checked_mul(k)
            .ok_or_else(|| KnnError::resource_exhausted("neighbor table size overflows"))?;

        let mut indices: Vec<PointIndex> = Vec::new();
        indices.try_reserve_exact(len)?;
        indices.resize(len, 0);

        let distances = if with_distances {
            let mut distances: Vec<Element> = Vec::new();
            distances.try_reserve_exact(len)?;
            distances.resize(len, 0.0);
            Some(distances)
        } else {
            None
        };

        Ok(Self {
            table: NeighborTable {
                num_rows,
                k,
                indices,
                distances,
            },
        })
    }

    /// Split the table into one slot per batch of `plan`.
    pub fn slots(&mut self, plan: &BatchPlan) -> Result<Vec<BatchSlot<'_>>> {
        if plan.num_points() != self.table.num_rows {
            return Err(KnnError::invalid_argument(format!(
                "plan covers {} rows, table has {}",
                plan.num_points(),
                self.table.num_rows
            )));
        }

        let k = self.table.k;
        let mut indices_rest: &mut [PointIndex] = &mut self.table.indices;
        let mut distances_rest: Option<&mut [Element]> = self.table.distances.as_deref_mut();
        let mut slots = Vec::with_capacity(plan.num_batches());

        for batch in plan.iter() {
            let width = batch.len() * k;
            let (indices, tail) = std::mem::take(&mut indices_rest).split_at_mut(width);
            indices_rest = tail;
            let distances = distances_rest.take().map(|rest| {
                let (head, tail) = rest.split_at_mut(width);
                distances_rest = Some(tail);
                head
            });
            slots.push(BatchSlot {
                batch,
                indices,
                distances,
            });
        }
        Ok(slots)
    }

    /// Hand over the completed table.
    pub fn finish(self) -> NeighborTable {
        self.table
    }
}
