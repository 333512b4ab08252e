//! Named-array storage.
//!
//! The computation itself only consumes and produces in-memory arrays. A
//! [`DatasetStore`] supplies the input partitions and receives the neighbor
//! table. Chunking and compression are recorded with each write but never
//! affect what is read back.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::InMemoryStore;

use crate::config::Compression;
use crate::error::{KnnError, Result};
use serde::{Deserialize, Serialize};

/// A rectangular row-major array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Array2<T> {
    /// Create an array, checking `data.len() == rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let array = Self { rows, cols, data };
        array.validate().map_err(|e| KnnError::invalid_argument(e.message()))?;
        Ok(array)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> Option<&[T]> {
        if i >= self.rows {
            return None;
        }
        Some(&self.data[i * self.cols..(i + 1) * self.cols])
    }

    /// All values, row-major.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Take the values, row-major.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Deserialized arrays are checked here, so a bad shape is `DataLoss`.
    fn validate(&self) -> Result<()> {
        let expected = self.rows.checked_mul(self.cols);
        if expected != Some(self.data.len()) {
            return Err(KnnError::data_loss(format!(
                "array of shape ({}, {}) holds {} values",
                self.rows,
                self.cols,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// A stored array with its element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "snake_case")]
pub enum StoredArray {
    /// `float32` values.
    F32(Array2<f32>),
    /// `int32` values.
    I32(Array2<i32>),
}

impl StoredArray {
    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            StoredArray::F32(a) => a.shape(),
            StoredArray::I32(a) => a.shape(),
        }
    }

    /// Element type name.
    pub fn dtype(&self) -> &'static str {
        match self {
            StoredArray::F32(_) => "float32",
            StoredArray::I32(_) => "int32",
        }
    }

    /// Row-major values converted to `f32`.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            StoredArray::F32(a) => a.as_slice().to_vec(),
            StoredArray::I32(a) => a.as_slice().iter().map(|&v| v as f32).collect(),
        }
    }

    /// The `int32` array, if that is the element type.
    pub fn as_i32(&self) -> Option<&Array2<i32>> {
        match self {
            StoredArray::I32(a) => Some(a),
            StoredArray::F32(_) => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            StoredArray::F32(a) => a.validate(),
            StoredArray::I32(a) => a.validate(),
        }
    }
}

/// Storage layout hints for a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Chunk shape `(rows, cols)`, if chunked.
    pub chunk_shape: Option<(usize, usize)>,
    /// Compression codec.
    pub compression: Compression,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_shape: None,
            compression: Compression::None,
        }
    }
}

/// A store of named rectangular arrays.
pub trait DatasetStore {
    /// Load the array named `name`. `NotFound` if it does not exist.
    fn read(&self, name: &str) -> Result<StoredArray>;

    /// Persist `array` under `name`. Existing arrays are never overwritten;
    /// writing an existing name is `AlreadyExists`.
    fn write(&mut self, name: &str, array: StoredArray, options: WriteOptions) -> Result<()>;

    /// Check whether `name` exists.
    fn exists(&self, name: &str) -> Result<bool>;
}
