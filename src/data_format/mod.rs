//! Point storage.
//!
//! This module provides the immutable [`Corpus`] and its precomputed
//! [`NormTable`].

mod corpus;
mod norms;

pub use corpus::{Corpus, MAX_SQUARED_NORM};
pub use norms::NormTable;
