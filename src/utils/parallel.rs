//! Parallel execution utilities.

use crate::error::{KnnError, Result};
use rayon::prelude::*;

/// A fixed-size worker pool owned by one run.
///
/// Each run builds its own pool instead of configuring rayon's global one,
/// so concurrent runs with different worker counts do not interfere.
pub struct ThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool {
    /// Create a pool with `num_threads` workers, or one per CPU.
    pub fn new(num_threads: Option<usize>) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("a2a-knn-worker-{i}"));
        if let Some(n) = num_threads {
            if n == 0 {
                return Err(KnnError::invalid_argument("number of threads must be at least 1"));
            }
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| KnnError::internal(format!("failed to create thread pool: {e}")))?;
        Ok(Self { pool })
    }

    /// Get the number of threads.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `f` once per item on the pool, stopping at the first error.
    ///
    /// Items already started when an error occurs run to completion; items
    /// not yet started are skipped.
    pub fn try_for_each<T, F>(&self, items: Vec<T>, f: F) -> Result<()>
    where
        T: Send,
        F: Fn(T) -> Result<()> + Sync + Send,
    {
        self.pool.install(|| items.into_par_iter().try_for_each(f))
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .finish()
    }
}
