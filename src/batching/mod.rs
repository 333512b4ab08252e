//! Batch planning.
//!
//! Splits the query index space into contiguous batches whose size is
//! derived from a memory budget.

mod batch;
mod planner;

pub use batch::{Batch, BatchPlan};
pub use planner::{
    bytes_per_query, estimate_batch_size, BatchPlanner, FixedMemory, MemoryProbe, SystemMemory,
};
