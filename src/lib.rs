//! # a2a-knn - exact all-to-all nearest neighbors
//!
//! Computes, for every point of a fixed in-memory corpus, the K nearest
//! other points under Euclidean distance. The full N x N distance matrix is
//! never materialized: queries are processed in batches sized from a memory
//! budget, and batches may run in parallel.
//!
//! The output is the ground-truth neighbor table used to evaluate
//! approximate search systems.
//!
//! ## Quick Start
//!
//! ```rust
//! use a2a_knn::prelude::*;
//!
//! let points = vec![
//!     vec![0.0f32, 0.0],
//!     vec![3.0, 0.0],
//!     vec![0.0, 4.0],
//! ];
//! let corpus = Corpus::from_vecs(&points).unwrap();
//!
//! let knn = BruteForceKnn::new(corpus, KnnConfig::new().with_batch_size(2)).unwrap();
//! let table = knn.all_to_all(1).unwrap();
//!
//! assert_eq!(table.neighbors(0), &[1]);
//! assert_eq!(table.neighbors(1), &[0]);
//! assert_eq!(table.neighbors(2), &[0]);
//! ```
//!
//! ## Ground truth over a store
//!
//! [`pipeline::AllToAllPipeline`] reads the `train` and `test` datasets of a
//! [`storage::DatasetStore`], concatenates them and writes the table as
//! `all_to_all_neighbors`. Running it again is a no-op.
//!
//! ```rust
//! use a2a_knn::prelude::*;
//! use a2a_knn::storage::{Array2, InMemoryStore, StoredArray};
//!
//! let mut store = InMemoryStore::new();
//! let train = Array2::new(2, 2, vec![0.0f32, 0.0, 3.0, 0.0]).unwrap();
//! let test = Array2::new(1, 2, vec![0.0f32, 4.0]).unwrap();
//! store.insert("train", StoredArray::F32(train)).unwrap();
//! store.insert("test", StoredArray::F32(test)).unwrap();
//!
//! let pipeline = AllToAllPipeline::new(KnnConfig::new().with_num_neighbors(1)).unwrap();
//! let outcome = pipeline.run(&mut store).unwrap();
//! assert!(matches!(outcome, PipelineOutcome::Computed { num_points: 3, k: 1, .. }));
//! assert_eq!(pipeline.run(&mut store).unwrap(), PipelineOutcome::AlreadyPresent);
//! ```
//!
//! ## Module Overview
//!
//! - [`data_format`]: the corpus and its squared norms
//! - [`batching`]: batch ranges and memory-budget batch sizing
//! - [`distance_measures`]: scalar kernels and batched distance matrices
//! - [`brute_force`]: top-K selection, the batch scheduler and the output table
//! - [`storage`]: named-array stores
//! - [`pipeline`]: idempotent ground-truth generation
//! - [`evaluation`]: recall against a ground-truth table

pub mod batching;
pub mod brute_force;
pub mod data_format;
pub mod distance_measures;
pub mod evaluation;
pub mod pipeline;
pub mod storage;
pub mod utils;

mod config;
mod error;
mod types;

pub use config::{
    Compression, ExecutionMode, KnnConfig, OutputConfig, PlannerConfig, SelectionStrategy,
};
pub use error::{ErrorCode, KnnError, Result};
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batching::{BatchPlan, BatchPlanner, FixedMemory, MemoryProbe, SystemMemory};
    pub use crate::brute_force::{
        BatchProgress, BruteForceKnn, LogProgress, NeighborTable, NoProgress, ProgressReporter,
    };
    pub use crate::config::{ExecutionMode, KnnConfig, PlannerConfig, SelectionStrategy};
    pub use crate::data_format::Corpus;
    pub use crate::error::{ErrorCode, KnnError, Result};
    pub use crate::evaluation::recall_at_k;
    pub use crate::pipeline::{AllToAllPipeline, PipelineOutcome};
    pub use crate::storage::{DatasetStore, InMemoryStore, JsonFileStore};
    pub use crate::types::*;
}
