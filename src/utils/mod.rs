//! Utility functions and types.

pub(crate) mod parallel;

pub use parallel::ThreadPool;
