//! Idempotent all-to-all ground-truth generation over a dataset store.
//!
//! Reads the `train` and `test` partitions, concatenates them into one
//! corpus (train rows first), computes every point's K nearest other points
//! and writes the table as an `int32` dataset. K is the column count of the
//! store's `neighbors` dataset unless configured. If the output dataset is
//! already present the run does nothing.

use crate::batching::{BatchPlanner, MemoryProbe, SystemMemory};
use crate::brute_force::{BruteForceKnn, NeighborTable, ProgressReporter};
use crate::config::KnnConfig;
use crate::data_format::Corpus;
use crate::error::{KnnError, Result};
use crate::storage::{Array2, DatasetStore, StoredArray, WriteOptions};
use std::sync::Arc;

/// First corpus partition.
pub const TRAIN_DATASET: &str = "train";

/// Second corpus partition.
pub const TEST_DATASET: &str = "test";

/// Existing query ground truth; only its column count is used.
pub const NEIGHBORS_DATASET: &str = "neighbors";

/// Suffix of the distance dataset written next to the neighbor table.
pub const DISTANCES_SUFFIX: &str = "_distances";

/// What a pipeline run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The output dataset already existed; nothing was read or written.
    AlreadyPresent,

    /// The table was computed and written.
    Computed {
        /// Corpus size (train + test).
        num_points: usize,
        /// Neighbors per point.
        k: usize,
        /// Batch size used.
        batch_size: usize,
        /// Number of batches run.
        num_batches: usize,
    },
}

/// Drives one all-to-all run against a [`DatasetStore`].
pub struct AllToAllPipeline<P: MemoryProbe = SystemMemory> {
    config: KnnConfig,
    planner: BatchPlanner<P>,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl AllToAllPipeline<SystemMemory> {
    /// Create a pipeline that sizes batches from system memory.
    pub fn new(config: KnnConfig) -> Result<Self> {
        config.validate()?;
        let planner = BatchPlanner::new(config.planner.clone());
        Ok(Self {
            config,
            planner,
            progress: None,
        })
    }
}

impl<P: MemoryProbe> AllToAllPipeline<P> {
    /// Use `planner` for batch sizing. A configured `batch_size` still wins.
    pub fn with_planner<Q: MemoryProbe>(self, planner: BatchPlanner<Q>) -> AllToAllPipeline<Q> {
        AllToAllPipeline {
            config: self.config,
            planner,
            progress: self.progress,
        }
    }

    /// Replace the progress reporter.
    pub fn set_progress_reporter(&mut self, reporter: Arc<dyn ProgressReporter>) {
        self.progress = Some(reporter);
    }

    /// Get the configuration.
    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    /// Run once. Errors leave the store without an output dataset.
    pub fn run<S: DatasetStore + ?Sized>(&self, store: &mut S) -> Result<PipelineOutcome> {
        let output = self.config.output.dataset.as_str();
        if store.exists(output)? {
            tracing::info!(dataset = output, "Dataset already exists, skipping");
            return Ok(PipelineOutcome::AlreadyPresent);
        }
        tracing::info!(dataset = output, "Creating dataset");

        let corpus = read_corpus(store)?;
        let k = match self.config.num_neighbors {
            Some(k) => k,
            None => store.read(NEIGHBORS_DATASET)?.shape().1,
        };
        let num_points = corpus.size();

        let mut knn = BruteForceKnn::new(corpus, self.config.clone())?;
        if let Some(progress) = &self.progress {
            knn.set_progress_reporter(Arc::clone(progress));
        }
        let plan = match self.config.batch_size {
            Some(_) => knn.plan()?,
            None => knn.plan_with(&self.planner)?,
        };

        let table = knn.all_to_all_with_plan(k, &plan)?;
        let options = WriteOptions {
            chunk_shape: Some((self.config.output.chunk_rows.min(num_points), k)),
            compression: self.config.output.compression,
        };

        // Both arrays are built before the first write. The neighbor table
        // goes last and marks a complete run; a distances dataset left by an
        // interrupted run is kept as is.
        let neighbors = Array2::new(num_points, k, table.to_i32()?)?;
        if let Some(distances) = euclidean_distances(&table)? {
            let name = format!("{output}{DISTANCES_SUFFIX}");
            if store.exists(&name)? {
                tracing::info!(dataset = name.as_str(), "Dataset already exists, keeping it");
            } else {
                store.write(&name, StoredArray::F32(distances), options.clone())?;
            }
        }

        tracing::info!(dataset = output, "Saving dataset");
        store.write(output, StoredArray::I32(neighbors), options)?;
        tracing::info!(dataset = output, "Done saving dataset");

        Ok(PipelineOutcome::Computed {
            num_points,
            k,
            batch_size: plan.batch_size(),
            num_batches: plan.num_batches(),
        })
    }
}

fn read_corpus<S: DatasetStore + ?Sized>(store: &S) -> Result<Corpus> {
    let train = store.read(TRAIN_DATASET)?;
    let test = store.read(TEST_DATASET)?;
    let (train_rows, train_cols) = train.shape();
    let (test_rows, test_cols) = test.shape();
    tracing::debug!(train_rows, train_cols, test_rows, test_cols, "Loaded partitions");

    Corpus::from_flat_partitions(&train.to_f32(), train_cols, &test.to_f32(), test_cols)
        .map_err(|e| KnnError::new(e.code(), format!("{TRAIN_DATASET}/{TEST_DATASET}: {}", e.message())))
}

fn euclidean_distances(table: &NeighborTable) -> Result<Option<Array2<f32>>> {
    if !table.has_distances() {
        return Ok(None);
    }
    let mut data = Vec::new();
    data.try_reserve_exact(table.num_rows() * table.k())?;
    for q in 0..table.num_rows() {
        if let Some(row) = table.euclidean_distances(q) {
            data.extend(row);
        }
    }
    Array2::new(table.num_rows(), table.k(), data).map(Some)
}
