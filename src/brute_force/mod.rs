//! Brute-force nearest neighbor search.
//!
//! Exact neighbors by computing distances from every query to every corpus
//! point, one batch of queries at a time.

mod progress;
mod searcher;
mod table;
mod top_k;

pub use progress::{BatchProgress, LogProgress, NoProgress, ProgressReporter};
pub use searcher::BruteForceKnn;
pub use table::{BatchSlot, NeighborTable, ResultAssembler};
pub use top_k::{TopK, TopKSelector};
