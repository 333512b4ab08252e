//! Brute-force all-to-all searcher.
//!
//! Drives the batch loop: for every batch of the plan, compute the batch's
//! distance matrix, select each row's neighbors and write them into the
//! batch's window of the output table. Batches run either in order on the
//! calling thread or one task per batch on a worker pool.

use crate::batching::{BatchPlan, BatchPlanner, MemoryProbe};
use crate::brute_force::progress::{BatchProgress, LogProgress, ProgressReporter};
use crate::brute_force::table::{BatchSlot, NeighborTable, ResultAssembler};
use crate::brute_force::top_k::TopKSelector;
use crate::config::{ExecutionMode, KnnConfig};
use crate::data_format::Corpus;
use crate::distance_measures::BatchDistanceComputer;
use crate::error::{KnnError, Result};
use crate::types::{point_index, ELEMENT_SIZE};
use crate::utils::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Exact K-nearest-neighbor search by exhaustive distance computation.
///
/// The corpus is shared read-only across all batches; the output table is
/// the only mutable state and each batch owns a disjoint window of it.
pub struct BruteForceKnn {
    /// The corpus to search.
    corpus: Arc<Corpus>,

    /// Run configuration.
    config: KnnConfig,

    /// Receives one call per completed batch.
    progress: Arc<dyn ProgressReporter>,
}

impl BruteForceKnn {
    /// Create a new searcher.
    pub fn new(corpus: Corpus, config: KnnConfig) -> Result<Self> {
        Self::with_shared_corpus(Arc::new(corpus), config)
    }

    /// Create a searcher with a shared corpus.
    pub fn with_shared_corpus(corpus: Arc<Corpus>, config: KnnConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            corpus,
            config,
            progress: Arc::new(LogProgress),
        })
    }

    /// Replace the progress reporter.
    pub fn set_progress_reporter(&mut self, reporter: Arc<dyn ProgressReporter>) {
        self.progress = reporter;
    }

    /// Get the corpus.
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Get the configuration.
    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    /// Plan all-to-all batches: the configured batch size if set, else the
    /// memory planner over currently available system memory.
    pub fn plan(&self) -> Result<BatchPlan> {
        match self.config.batch_size {
            Some(batch_size) => self.fixed_plan(self.corpus.size(), batch_size),
            None => self.plan_with(&BatchPlanner::new(self.config.planner.clone())),
        }
    }

    /// Plan all-to-all batches with a specific planner.
    pub fn plan_with<P: MemoryProbe>(&self, planner: &BatchPlanner<P>) -> Result<BatchPlan> {
        planner.plan(self.corpus.size(), self.corpus.dimensionality(), ELEMENT_SIZE)
    }

    /// For every corpus point, the `k` nearest other corpus points.
    ///
    /// Requires `1 <= k < N`. Row `q` of the result never contains `q`
    /// except under the tie degeneracy documented on
    /// [`TopKSelector::select`].
    pub fn all_to_all(&self, k: usize) -> Result<NeighborTable> {
        self.check_all_to_all_k(k)?;
        let plan = self.plan()?;
        self.all_to_all_with_plan(k, &plan)
    }

    /// [`all_to_all`](Self::all_to_all) over an explicit batch plan.
    pub fn all_to_all_with_plan(&self, k: usize, plan: &BatchPlan) -> Result<NeighborTable> {
        self.check_all_to_all_k(k)?;
        if plan.num_points() != self.corpus.size() {
            return Err(KnnError::invalid_argument(format!(
                "plan covers {} points, corpus has {}",
                plan.num_points(),
                self.corpus.size()
            )));
        }
        let computer = BatchDistanceComputer::self_join(&self.corpus);
        self.run(computer, k, true, plan)
    }

    /// For every point of `queries`, the `k` nearest corpus points.
    ///
    /// No point is excluded, so `1 <= k <= N` is allowed.
    pub fn search(&self, queries: &Corpus, k: usize) -> Result<NeighborTable> {
        self.check_search_k(k)?;
        let plan = match self.config.batch_size {
            Some(batch_size) => self.fixed_plan(queries.size(), batch_size)?,
            None => BatchPlanner::new(self.config.planner.clone()).plan_queries(
                queries.size(),
                self.corpus.size(),
                self.corpus.dimensionality(),
                ELEMENT_SIZE,
            )?,
        };
        self.search_with_plan(queries, k, &plan)
    }

    /// [`search`](Self::search) over an explicit batch plan.
    pub fn search_with_plan(
        &self,
        queries: &Corpus,
        k: usize,
        plan: &BatchPlan,
    ) -> Result<NeighborTable> {
        self.check_search_k(k)?;
        if plan.num_points() != queries.size() {
            return Err(KnnError::invalid_argument(format!(
                "plan covers {} points, there are {} queries",
                plan.num_points(),
                queries.size()
            )));
        }
        let computer = BatchDistanceComputer::new(queries, &self.corpus)?;
        self.run(computer, k, false, plan)
    }

    fn fixed_plan(&self, num_points: usize, batch_size: usize) -> Result<BatchPlan> {
        let plan = BatchPlan::new(num_points, batch_size.min(num_points))?;
        tracing::info!(batch_size = plan.batch_size(), "Using configured batch size");
        Ok(plan)
    }

    fn check_all_to_all_k(&self, k: usize) -> Result<()> {
        let n = self.corpus.size();
        if k == 0 || k >= n {
            return Err(KnnError::invalid_argument(format!(
                "k must be in [1, {}) for a corpus of {} points, got {}",
                n, n, k
            )));
        }
        Ok(())
    }

    fn check_search_k(&self, k: usize) -> Result<()> {
        let n = self.corpus.size();
        if k == 0 || k > n {
            return Err(KnnError::invalid_argument(format!(
                "k must be in [1, {}] for a corpus of {} points, got {}",
                n, n, k
            )));
        }
        Ok(())
    }

    fn run(
        &self,
        computer: BatchDistanceComputer<'_>,
        k: usize,
        exclude_self: bool,
        plan: &BatchPlan,
    ) -> Result<NeighborTable> {
        tracing::info!(
            num_queries = plan.num_points(),
            num_corpus = computer.num_corpus(),
            k,
            batch_size = plan.batch_size(),
            num_batches = plan.num_batches(),
            "Computing nearest neighbors"
        );

        let mut assembler =
            ResultAssembler::new(plan.num_points(), k, self.config.store_distances)?;
        let total_points = plan.num_points();
        let completed = AtomicUsize::new(0);
        let selection = self.config.selection;
        let progress = self.progress.as_ref();

        let process = |slot: BatchSlot<'_>| -> Result<()> {
            let BatchSlot {
                batch,
                indices,
                mut distances,
            } = slot;
            let matrix = computer.compute(batch)?;
            let mut selector = TopKSelector::new(k, selection);

            for (local, (q, row)) in matrix.rows().enumerate() {
                let window = local * k..(local + 1) * k;
                let out = &mut indices[window.clone()];
                let dist = distances.as_deref_mut().map(|d| &mut d[window]);
                let exclude = exclude_self.then(|| point_index(q));
                let written = selector.select(row, exclude, out, dist);
                if written != k {
                    return Err(KnnError::internal(format!(
                        "query {q} received {written} neighbors, expected {k}"
                    )));
                }
            }

            let completed_points = completed.fetch_add(batch.len(), Ordering::Relaxed) + batch.len();
            progress.batch_completed(&BatchProgress {
                batch,
                completed_points,
                total_points,
            });
            Ok(())
        };

        let slots = assembler.slots(plan)?;
        match self.config.execution {
            ExecutionMode::Sequential => slots.into_iter().try_for_each(&process)?,
            ExecutionMode::Parallel => {
                let num_threads = self
                    .config
                    .num_threads
                    .unwrap_or_else(rayon::current_num_threads)
                    .min(plan.num_batches())
                    .max(1);
                let pool = ThreadPool::new(Some(num_threads))?;
                tracing::info!(
                    num_threads = pool.num_threads(),
                    num_batches = plan.num_batches(),
                    "Dispatching batches to worker pool"
                );
                pool.try_for_each(slots, &process)?;
            }
        }

        Ok(assembler.finish())
    }
}

impl std::fmt::Debug for BruteForceKnn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BruteForceKnn")
            .field("corpus", &self.corpus)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlannerConfig, SelectionStrategy};
    use crate::batching::FixedMemory;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn triangle() -> Corpus {
        Corpus::from_vecs(&[vec![0.0f32, 0.0], vec![3.0, 0.0], vec![0.0, 4.0]]).unwrap()
    }

    /// Points on a line whose pairwise gaps are all distinct, so no query
    /// sees a distance tie. `n <= 23`.
    fn line(n: usize) -> Corpus {
        let p = 23;
        let points: Vec<Vec<f32>> = (0..n).map(|i| vec![(2 * p * i + (i * i) % p) as f32]).collect();
        Corpus::from_vecs(&points).unwrap()
    }

    fn planner(available: u64) -> BatchPlanner<FixedMemory> {
        BatchPlanner::with_probe(PlannerConfig::new(1.0), FixedMemory(available))
    }

    #[test]
    fn test_triangle_k1() {
        for config in [KnnConfig::new().sequential(), KnnConfig::new().parallel(Some(2))] {
            let knn = BruteForceKnn::new(triangle(), config.with_batch_size(2)).unwrap();
            let table = knn.all_to_all(1).unwrap();
            assert_eq!(table.neighbors(0), &[1]);
            assert_eq!(table.neighbors(1), &[0]);
            assert_eq!(table.neighbors(2), &[0]);
        }
    }

    #[test]
    fn test_rejects_bad_k() {
        let knn = BruteForceKnn::new(triangle(), KnnConfig::new()).unwrap();
        assert!(knn.all_to_all(0).unwrap_err().is_invalid_argument());
        assert!(knn.all_to_all(3).unwrap_err().is_invalid_argument());
        assert!(knn.search(&triangle(), 4).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = KnnConfig::new().with_memory_ratio(0.0);
        assert!(BruteForceKnn::new(triangle(), config).is_err());
    }

    #[test]
    fn test_batch_size_does_not_change_result() {
        let reference = BruteForceKnn::new(line(23), KnnConfig::new().with_batch_size(23).sequential())
            .unwrap()
            .all_to_all(4)
            .unwrap();
        for batch_size in [1, 2, 5, 7, 22] {
            let knn = BruteForceKnn::new(line(23), KnnConfig::new().with_batch_size(batch_size)).unwrap();
            let table = knn.all_to_all(4).unwrap();
            for q in 0..23 {
                let a: HashSet<_> = table.neighbors(q).iter().collect();
                let b: HashSet<_> = reference.neighbors(q).iter().collect();
                assert_eq!(a, b, "query {q}, batch size {batch_size}");
            }
        }
    }

    #[test]
    fn test_plan_with_fixed_memory() {
        let points: Vec<Vec<f32>> = (0..1000).map(|i| vec![i as f32]).collect();
        let knn = BruteForceKnn::new(Corpus::from_vecs(&points).unwrap(), KnnConfig::new()).unwrap();
        // 3 * (1000 + 1) * 4 = 12_012 bytes per query.
        let plan = knn.plan_with(&planner(120_120)).unwrap();
        assert_eq!(plan.batch_size(), 10);
        let table = knn.all_to_all_with_plan(1, &plan).unwrap();
        assert_eq!(table.num_rows(), 1000);
    }

    #[test]
    fn test_plan_must_match_corpus() {
        let knn = BruteForceKnn::new(triangle(), KnnConfig::new()).unwrap();
        let plan = BatchPlan::new(4, 2).unwrap();
        assert!(knn.all_to_all_with_plan(1, &plan).is_err());
    }

    #[test]
    fn test_distances_are_stored() {
        let config = KnnConfig::new().with_distances().with_batch_size(1);
        let knn = BruteForceKnn::new(triangle(), config).unwrap();
        let table = knn.all_to_all(2).unwrap();
        let row: Vec<(u32, f32)> = table
            .neighbors(0)
            .iter()
            .copied()
            .zip(table.distances(0).unwrap().iter().copied())
            .collect();
        for (idx, dist) in row {
            match idx {
                1 => assert_eq!(dist, 9.0),
                2 => assert_eq!(dist, 16.0),
                other => panic!("unexpected neighbor {other}"),
            }
        }
    }

    #[test]
    fn test_search_separate_queries() {
        let knn = BruteForceKnn::new(triangle(), KnnConfig::new().with_batch_size(1)).unwrap();
        let queries = Corpus::from_vecs(&[vec![2.9f32, 0.1], vec![0.0, 3.0]]).unwrap();
        let table = knn.search(&queries, 1).unwrap();
        assert_eq!(table.neighbors(0), &[1]);
        assert_eq!(table.neighbors(1), &[2]);

        let all = knn.search(&queries, 3).unwrap();
        let set: HashSet<_> = all.neighbors(0).iter().copied().collect();
        assert_eq!(set, HashSet::from([0, 1, 2]));
    }

    #[test]
    fn test_search_rejects_dimension_mismatch() {
        let knn = BruteForceKnn::new(triangle(), KnnConfig::new()).unwrap();
        let queries = Corpus::from_vecs(&[vec![1.0f32, 2.0, 3.0]]).unwrap();
        assert!(knn.search(&queries, 1).unwrap_err().is_invalid_argument());
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<BatchProgress>>);

    impl ProgressReporter for Recorder {
        fn batch_completed(&self, progress: &BatchProgress) {
            self.0.lock().unwrap().push(*progress);
        }
    }

    #[test]
    fn test_progress_reports_every_batch() {
        for config in [KnnConfig::new().sequential(), KnnConfig::new().parallel(Some(3))] {
            let recorder = Arc::new(Recorder::default());
            let mut knn = BruteForceKnn::new(line(10), config.with_batch_size(3)).unwrap();
            knn.set_progress_reporter(recorder.clone());
            knn.all_to_all(2).unwrap();

            let reports = recorder.0.lock().unwrap();
            assert_eq!(reports.len(), 4);
            let mut completed: Vec<_> = reports.iter().map(|p| p.completed_points).collect();
            completed.sort_unstable();
            assert_eq!(*completed.last().unwrap(), 10);
            assert!(reports.iter().all(|p| p.total_points == 10));
        }
    }

    #[test]
    fn test_heap_strategy_matches_partition() {
        let partition = BruteForceKnn::new(line(15), KnnConfig::new().with_batch_size(4))
            .unwrap()
            .all_to_all(3)
            .unwrap();
        let heap = BruteForceKnn::new(
            line(15),
            KnnConfig::new().with_batch_size(4).with_selection(SelectionStrategy::Heap),
        )
        .unwrap()
        .all_to_all(3)
        .unwrap();
        for q in 0..15 {
            let a: HashSet<_> = partition.neighbors(q).iter().collect();
            let b: HashSet<_> = heap.neighbors(q).iter().collect();
            assert_eq!(a, b);
        }
    }
}
