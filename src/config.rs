//! Configuration types.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a usable configuration.

use crate::error::{KnnError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default fraction of available memory a run may plan for.
pub const DEFAULT_MEMORY_RATIO: f64 = 0.1;

/// Default multiplier over `(N + L) * element_size` bytes per query.
pub const DEFAULT_BYTES_MULTIPLIER: u64 = 3;

/// Default hard ceiling on the batch size.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

/// Default name of the output dataset.
pub const DEFAULT_OUTPUT_DATASET: &str = "all_to_all_neighbors";

/// Main configuration for an all-to-all KNN run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Batch sizing policy.
    pub planner: PlannerConfig,

    /// Fixed batch size, bypassing the planner.
    pub batch_size: Option<usize>,

    /// Sequential or batch-parallel execution.
    pub execution: ExecutionMode,

    /// Worker count for parallel execution (defaults to the CPU count).
    pub num_threads: Option<usize>,

    /// Top-K selection algorithm.
    pub selection: SelectionStrategy,

    /// Keep the squared distance of every returned neighbor.
    pub store_distances: bool,

    /// K override for the pipeline. Otherwise read from the `neighbors` dataset.
    pub num_neighbors: Option<usize>,

    /// Output dataset settings.
    pub output: OutputConfig,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            batch_size: None,
            execution: ExecutionMode::Parallel,
            num_threads: None,
            selection: SelectionStrategy::Partition,
            store_distances: false,
            num_neighbors: None,
            output: OutputConfig::default(),
        }
    }
}

impl KnnConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| KnnError::invalid_argument(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Set the planner configuration.
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    /// Set the memory ratio used by the planner.
    pub fn with_memory_ratio(mut self, ratio: f64) -> Self {
        self.planner.memory_ratio = ratio;
        self
    }

    /// Use a fixed batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Run batches on the calling thread only.
    pub fn sequential(mut self) -> Self {
        self.execution = ExecutionMode::Sequential;
        self
    }

    /// Run batches on a worker pool.
    pub fn parallel(mut self, num_threads: Option<usize>) -> Self {
        self.execution = ExecutionMode::Parallel;
        self.num_threads = num_threads;
        self
    }

    /// Set the selection strategy.
    pub fn with_selection(mut self, selection: SelectionStrategy) -> Self {
        self.selection = selection;
        self
    }

    /// Keep neighbor distances in the output table.
    pub fn with_distances(mut self) -> Self {
        self.store_distances = true;
        self
    }

    /// Override K for the pipeline.
    pub fn with_num_neighbors(mut self, k: usize) -> Self {
        self.num_neighbors = Some(k);
        self
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        self.planner.validate()?;
        if self.batch_size == Some(0) {
            return Err(KnnError::invalid_argument("batch_size must be at least 1"));
        }
        if self.num_threads == Some(0) {
            return Err(KnnError::invalid_argument("num_threads must be at least 1"));
        }
        if self.num_neighbors == Some(0) {
            return Err(KnnError::invalid_argument("num_neighbors must be at least 1"));
        }
        self.output.validate()
    }
}

/// Batch sizing policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Fraction of currently available memory to plan for, in (0, 1].
    pub memory_ratio: f64,

    /// Multiplier over `(N + L) * element_size` bytes per query. Covers the
    /// distance row, query norms and the dot-product matrix.
    pub bytes_multiplier: u64,

    /// Hard ceiling on the batch size regardless of available memory.
    pub max_batch_size: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            memory_ratio: DEFAULT_MEMORY_RATIO,
            bytes_multiplier: DEFAULT_BYTES_MULTIPLIER,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl PlannerConfig {
    /// Create a planner configuration with the given memory ratio.
    pub fn new(memory_ratio: f64) -> Self {
        Self {
            memory_ratio,
            ..Default::default()
        }
    }

    /// Set the batch size ceiling.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.memory_ratio > 0.0 && self.memory_ratio <= 1.0) {
            return Err(KnnError::invalid_argument(format!(
                "memory_ratio must be in (0, 1], got {}",
                self.memory_ratio
            )));
        }
        if self.bytes_multiplier == 0 {
            return Err(KnnError::invalid_argument("bytes_multiplier must be at least 1"));
        }
        if self.max_batch_size == 0 {
            return Err(KnnError::invalid_argument("max_batch_size must be at least 1"));
        }
        Ok(())
    }
}

/// How batches are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One thread iterates the batches in order.
    Sequential,

    /// One task per batch on a fixed-size worker pool.
    Parallel,
}

/// Partial selection algorithm for the top-K step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Introselect over the row's index permutation.
    Partition,

    /// Bounded max-heap of size K+1.
    Heap,
}

/// Output compression codec. Only meaningful to the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "codec", rename_all = "snake_case")]
pub enum Compression {
    /// Store uncompressed.
    None,

    /// Gzip with the given level (0-9).
    Gzip {
        /// Compression level.
        level: u8,
    },
}

/// Output dataset settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Name of the neighbor table dataset.
    pub dataset: String,

    /// Rows per storage chunk (clamped to N).
    pub chunk_rows: usize,

    /// Compression codec.
    pub compression: Compression,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_OUTPUT_DATASET.to_string(),
            chunk_rows: 1000,
            compression: Compression::Gzip { level: 5 },
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.dataset.is_empty() {
            return Err(KnnError::invalid_argument("output dataset name is empty"));
        }
        if self.chunk_rows == 0 {
            return Err(KnnError::invalid_argument("chunk_rows must be at least 1"));
        }
        if let Compression::Gzip { level } = self.compression {
            if level > 9 {
                return Err(KnnError::invalid_argument(format!(
                    "gzip level must be 0-9, got {level}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KnnConfig::default();
        assert_eq!(config.planner.memory_ratio, 0.1);
        assert_eq!(config.planner.bytes_multiplier, 3);
        assert_eq!(config.planner.max_batch_size, 10_000);
        assert_eq!(config.execution, ExecutionMode::Parallel);
        assert_eq!(config.selection, SelectionStrategy::Partition);
        assert_eq!(config.output.dataset, "all_to_all_neighbors");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = KnnConfig::new()
            .with_batch_size(64)
            .sequential()
            .with_selection(SelectionStrategy::Heap)
            .with_distances();
        assert_eq!(config.batch_size, Some(64));
        assert_eq!(config.execution, ExecutionMode::Sequential);
        assert_eq!(config.selection, SelectionStrategy::Heap);
        assert!(config.store_distances);
    }

    #[test]
    fn test_validation_rejects_bad_ratio() {
        assert!(KnnConfig::new().with_memory_ratio(0.0).validate().is_err());
        assert!(KnnConfig::new().with_memory_ratio(1.5).validate().is_err());
        assert!(KnnConfig::new().with_memory_ratio(f64::NAN).validate().is_err());
        assert!(KnnConfig::new().with_memory_ratio(1.0).validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        assert!(KnnConfig::new().with_batch_size(0).validate().is_err());
        assert!(KnnConfig::new().parallel(Some(0)).validate().is_err());
        assert!(KnnConfig::new().with_num_neighbors(0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = KnnConfig::from_json_str(
            r#"{"planner": {"memory_ratio": 0.25}, "execution": "sequential"}"#,
        )
        .unwrap();
        assert_eq!(config.planner.memory_ratio, 0.25);
        assert_eq!(config.planner.max_batch_size, 10_000);
        assert_eq!(config.execution, ExecutionMode::Sequential);
    }

    #[test]
    fn test_config_serialization() {
        let config = KnnConfig::new()
            .with_batch_size(128)
            .with_num_neighbors(10);

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: KnnConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_invalid_json_is_invalid_argument() {
        let err = KnnConfig::from_json_str("{not json").unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
