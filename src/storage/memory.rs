//! In-memory dataset store.

use crate::error::{KnnError, Result};
use crate::storage::{DatasetStore, StoredArray, WriteOptions};
use std::collections::HashMap;

/// A store held in memory.
///
/// Counts writes, so callers can check that an idempotent run wrote nothing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    arrays: HashMap<String, (StoredArray, WriteOptions)>,
    writes: usize,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an array without counting it as a write.
    pub fn insert(&mut self, name: impl Into<String>, array: StoredArray) -> Result<()> {
        array.validate()?;
        self.arrays.insert(name.into(), (array, WriteOptions::default()));
        Ok(())
    }

    /// Number of successful [`write`](DatasetStore::write) calls.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Options recorded with the array named `name`.
    pub fn options(&self, name: &str) -> Option<&WriteOptions> {
        self.arrays.get(name).map(|(_, options)| options)
    }
}

impl DatasetStore for InMemoryStore {
    fn read(&self, name: &str) -> Result<StoredArray> {
        self.arrays
            .get(name)
            .map(|(array, _)| array.clone())
            .ok_or_else(|| KnnError::not_found(format!("dataset '{name}' does not exist")))
    }

    fn write(&mut self, name: &str, array: StoredArray, options: WriteOptions) -> Result<()> {
        if self.arrays.contains_key(name) {
            return Err(KnnError::already_exists(format!("dataset '{name}' already exists")));
        }
        array.validate()?;
        self.arrays.insert(name.to_string(), (array, options));
        self.writes += 1;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.arrays.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Compression;
    use crate::error::ErrorCode;
    use crate::storage::Array2;

    fn array() -> StoredArray {
        StoredArray::F32(Array2::new(1, 2, vec![1.0, 2.0]).unwrap())
    }

    #[test]
    fn test_read_write_exists() {
        let mut store = InMemoryStore::new();
        assert!(!store.exists("train").unwrap());
        assert_eq!(store.read("train").unwrap_err().code(), ErrorCode::NotFound);

        let options = WriteOptions {
            chunk_shape: Some((1, 2)),
            compression: Compression::Gzip { level: 5 },
        };
        store.write("train", array(), options.clone()).unwrap();
        assert!(store.exists("train").unwrap());
        assert_eq!(store.read("train").unwrap(), array());
        assert_eq!(store.options("train"), Some(&options));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let mut store = InMemoryStore::new();
        store.insert("train", array()).unwrap();
        let err = store.write("train", array(), WriteOptions::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert_eq!(store.write_count(), 0);
    }
}
