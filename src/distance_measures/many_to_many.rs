//! Many-to-many distance computations.
//!
//! Squared L2 distances between a batch of queries and a full corpus, using
//! the expansion `|q - c|^2 = |q|^2 + |c|^2 - 2 q.c` so the dominant cost is
//! a single dot-product matrix.

use crate::batching::Batch;
use crate::data_format::Corpus;
use crate::error::{KnnError, Result};
use crate::types::Element;
use nalgebra::{DMatrix, DMatrixView};

/// Computes batch distance matrices against a shared, read-only corpus.
///
/// Queries may be the corpus itself (the all-to-all case) or a separate
/// point set of the same dimensionality.
#[derive(Debug, Clone, Copy)]
pub struct BatchDistanceComputer<'a> {
    queries: &'a Corpus,
    corpus: &'a Corpus,
}

impl<'a> BatchDistanceComputer<'a> {
    /// Create a computer for `queries` against `corpus`.
    pub fn new(queries: &'a Corpus, corpus: &'a Corpus) -> Result<Self> {
        if queries.dimensionality() != corpus.dimensionality() {
            return Err(KnnError::invalid_argument(format!(
                "query dimensionality {} does not match corpus dimensionality {}",
                queries.dimensionality(),
                corpus.dimensionality()
            )));
        }
        Ok(Self { queries, corpus })
    }

    /// Create a computer whose queries are the corpus points themselves.
    pub fn self_join(corpus: &'a Corpus) -> Self {
        Self {
            queries: corpus,
            corpus,
        }
    }

    /// Number of addressable queries.
    pub fn num_queries(&self) -> usize {
        self.queries.size()
    }

    /// Number of corpus points (columns of every distance row).
    pub fn num_corpus(&self) -> usize {
        self.corpus.size()
    }

    /// Compute the `(end - start) x N` squared distance matrix for a batch.
    ///
    /// Every entry is clamped to `>= 0`; cancellation in the norm expansion
    /// can otherwise produce small negative values for near-zero distances.
    /// Fails with `ResourceExhausted` if the distance buffer cannot be
    /// allocated.
    pub fn compute(&self, batch: Batch) -> Result<BatchDistanceMatrix> {
        if batch.start >= batch.end || batch.end > self.queries.size() {
            return Err(KnnError::invalid_argument(format!(
                "batch [{}, {}) is outside [0, {})",
                batch.start,
                batch.end,
                self.queries.size()
            )));
        }

        let num_corpus = self.corpus.size();
        let dim = self.corpus.dimensionality();
        let batch_len = batch.len();

        let len = batch_len.checked_mul(num_corpus).ok_or_else(|| {
            KnnError::resource_exhausted(format!(
                "distance matrix {} x {} overflows",
                batch_len, num_corpus
            ))
        })?;
        let mut buffer: Vec<Element> = Vec::new();
        buffer.try_reserve_exact(len).map_err(|e| {
            KnnError::resource_exhausted(format!(
                "distance buffer for batch [{}, {}) ({} x {}): {}",
                batch.start, batch.end, batch_len, num_corpus, e
            ))
        })?;
        buffer.resize(len, 0.0);

        // Row-major N x L storage is a column-major L x N matrix, so both
        // operands are views without copies. Column j of the product holds
        // query `start + j` against every corpus point.
        let mut data = DMatrix::from_vec(num_corpus, batch_len, buffer);
        let corpus_t = DMatrixView::from_slice(self.corpus.as_slice(), dim, num_corpus);
        let queries_t = DMatrixView::from_slice(self.queries.rows(batch.range()), dim, batch_len);
        data.gemm_tr(-2.0, &corpus_t, &queries_t, 0.0);

        let corpus_norms = self.corpus.norms().as_slice();
        let query_norms = &self.queries.norms().as_slice()[batch.range()];
        for (row, &query_norm) in data.as_mut_slice().chunks_exact_mut(num_corpus).zip(query_norms) {
            for (dist, &corpus_norm) in row.iter_mut().zip(corpus_norms) {
                *dist = (*dist + query_norm + corpus_norm).max(0.0);
            }
        }

        Ok(BatchDistanceMatrix {
            batch,
            num_corpus,
            data,
        })
    }
}

/// Squared distances from one batch of queries to the whole corpus.
pub struct BatchDistanceMatrix {
    /// Query range the rows belong to.
    batch: Batch,
    /// Number of corpus points (row length).
    num_corpus: usize,
    /// Column-major `N x B` storage; each query's row is contiguous.
    data: DMatrix<Element>,
}

impl BatchDistanceMatrix {
    /// The query range of this matrix.
    pub fn batch(&self) -> Batch {
        self.batch
    }

    /// `(queries, corpus points)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.batch.len(), self.num_corpus)
    }

    /// Distances for the `local`-th query of the batch.
    #[inline]
    pub fn row(&self, local: usize) -> &[Element] {
        let start = local * self.num_corpus;
        &self.data.as_slice()[start..start + self.num_corpus]
    }

    /// Distance between local query `local` and corpus point `corpus_idx`.
    #[inline]
    pub fn get(&self, local: usize, corpus_idx: usize) -> Element {
        self.row(local)[corpus_idx]
    }

    /// Iterate `(global query index, distance row)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[Element])> + '_ {
        self.data
            .as_slice()
            .chunks_exact(self.num_corpus)
            .enumerate()
            .map(move |(local, row)| (self.batch.start + local, row))
    }

    /// All distances, one contiguous row per query.
    pub fn as_slice(&self) -> &[Element] {
        self.data.as_slice()
    }
}

impl std::fmt::Debug for BatchDistanceMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDistanceMatrix")
            .field("batch", &self.batch)
            .field("num_corpus", &self.num_corpus)
            .finish()
    }
}
