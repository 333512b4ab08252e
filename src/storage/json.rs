//! Single-file JSON dataset store.

use crate::error::{KnnError, Result};
use crate::storage::{DatasetStore, StoredArray, WriteOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout: every dataset of the store in one JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    datasets: BTreeMap<String, StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    array: StoredArray,
    #[serde(default)]
    options: WriteOptions,
}

/// A store backed by a single JSON file.
///
/// A missing file is an empty store. Writes go to a temporary file that is
/// then renamed over the original, so readers never observe a half-written
/// document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`. The file is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all stored datasets, sorted.
    pub fn dataset_names(&self) -> Result<Vec<String>> {
        Ok(self.load()?.datasets.into_keys().collect())
    }

    /// Options recorded with the array named `name`.
    pub fn options(&self, name: &str) -> Result<Option<WriteOptions>> {
        Ok(self.load()?.datasets.remove(name).map(|entry| entry.options))
    }

    fn load(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let bytes = fs::read(&self.path)?;
        let document: StoreDocument = serde_json::from_slice(&bytes)?;
        Ok(document)
    }

    fn save(&self, document: &StoreDocument) -> Result<()> {
        let bytes = serde_json::to_vec(document)
            .map_err(|e| KnnError::internal(format!("failed to serialize store: {e}")))?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl DatasetStore for JsonFileStore {
    fn read(&self, name: &str) -> Result<StoredArray> {
        let entry = self.load()?.datasets.remove(name).ok_or_else(|| {
            KnnError::not_found(format!(
                "dataset '{}' does not exist in {}",
                name,
                self.path.display()
            ))
        })?;
        entry.array.validate()?;
        Ok(entry.array)
    }

    fn write(&mut self, name: &str, array: StoredArray, options: WriteOptions) -> Result<()> {
        array.validate()?;
        let mut document = self.load()?;
        if document.datasets.contains_key(name) {
            return Err(KnnError::already_exists(format!(
                "dataset '{}' already exists in {}",
                name,
                self.path.display()
            )));
        }
        document
            .datasets
            .insert(name.to_string(), StoredEntry { array, options });
        self.save(&document)?;
        tracing::debug!(dataset = name, path = %self.path.display(), "Saved dataset");
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.load()?.datasets.contains_key(name))
    }
}
