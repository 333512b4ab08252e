//! Distance computations.
//!
//! Euclidean distance only: scalar kernels in `one_to_one` and the batched
//! query-by-corpus matrix in `many_to_many`.

mod one_to_one;
pub mod many_to_many;

pub use one_to_one::*;
pub use many_to_many::{BatchDistanceComputer, BatchDistanceMatrix};
