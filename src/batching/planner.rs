//! Memory-budget batch sizing.
//!
//! The planner turns a fraction of currently available memory into a batch
//! size. The estimate is a heuristic: per query it assumes
//! `bytes_multiplier * (N + L) * element_size` bytes for the distance row,
//! the query norms and the dot-product matrix. Actual peak usage is not
//! bounded by it.

use crate::batching::batch::BatchPlan;
use crate::config::PlannerConfig;
use crate::error::Result;
use sysinfo::System;

/// Source of the "currently available memory" figure.
pub trait MemoryProbe: Send + Sync {
    /// Bytes of memory currently available to the process.
    fn available_bytes(&self) -> u64;
}

/// Reads available system memory through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

impl MemoryProbe for SystemMemory {
    fn available_bytes(&self) -> u64 {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.available_memory()
    }
}

/// A fixed memory figure, for reproducible plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMemory(pub u64);

impl MemoryProbe for FixedMemory {
    fn available_bytes(&self) -> u64 {
        self.0
    }
}

/// Estimated bytes needed per query in a batch.
#[inline]
pub fn bytes_per_query(num_points: usize, dim: usize, element_size: usize, config: &PlannerConfig) -> u64 {
    let per_row = (num_points as u64)
        .saturating_add(dim as u64)
        .saturating_mul(element_size as u64);
    per_row.saturating_mul(config.bytes_multiplier)
}

/// Batch size for a memory budget.
///
/// `max(1, budget / bytes_per_query)`, clamped to `[1, N]` and to the
/// configured ceiling.
pub fn estimate_batch_size(
    num_points: usize,
    dim: usize,
    element_size: usize,
    budget_bytes: u64,
    config: &PlannerConfig,
) -> usize {
    let per_query = bytes_per_query(num_points, dim, element_size, config).max(1);
    let fit = usize::try_from(budget_bytes / per_query).unwrap_or(usize::MAX);
    fit.max(1)
        .min(num_points.max(1))
        .min(config.max_batch_size.max(1))
}

/// Sizes batches from a fraction of available memory.
#[derive(Debug, Clone)]
pub struct BatchPlanner<P: MemoryProbe = SystemMemory> {
    config: PlannerConfig,
    probe: P,
}

impl BatchPlanner<SystemMemory> {
    /// Create a planner reading system memory.
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            probe: SystemMemory,
        }
    }
}

impl<P: MemoryProbe> BatchPlanner<P> {
    /// Create a planner with a custom memory probe.
    pub fn with_probe(config: PlannerConfig, probe: P) -> Self {
        Self { config, probe }
    }

    /// The planner configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Memory budget in bytes: `available * memory_ratio`.
    pub fn budget_bytes(&self) -> u64 {
        (self.probe.available_bytes() as f64 * self.config.memory_ratio) as u64
    }

    /// Batch size for a corpus of `num_points` points of `dim` elements.
    pub fn batch_size(&self, num_points: usize, dim: usize, element_size: usize) -> usize {
        let budget = self.budget_bytes();
        let per_query = bytes_per_query(num_points, dim, element_size, &self.config);
        if budget < per_query {
            tracing::warn!(
                budget_bytes = budget,
                bytes_per_query = per_query,
                "Memory budget is below one query's estimate, using batch size 1"
            );
        }
        estimate_batch_size(num_points, dim, element_size, budget, &self.config)
    }

    /// Plan the batches for an all-to-all run over a corpus.
    pub fn plan(&self, num_points: usize, dim: usize, element_size: usize) -> Result<BatchPlan> {
        self.plan_queries(num_points, num_points, dim, element_size)
    }

    /// Plan the batches for `num_queries` queries against `num_corpus` points.
    ///
    /// Rows are `num_corpus` wide, so the per-query estimate uses the corpus
    /// size; the batch size is additionally clamped to `num_queries`.
    pub fn plan_queries(
        &self,
        num_queries: usize,
        num_corpus: usize,
        dim: usize,
        element_size: usize,
    ) -> Result<BatchPlan> {
        self.config.validate()?;
        let batch_size = self
            .batch_size(num_corpus, dim, element_size)
            .min(num_queries.max(1));
        tracing::info!(
            batch_size,
            memory_ratio = self.config.memory_ratio,
            "Planned batch size"
        );
        BatchPlan::new(num_queries, batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_query() {
        let config = PlannerConfig::default();
        // 3 * (1000 + 10) * 4
        assert_eq!(bytes_per_query(1000, 10, 4, &config), 12_120);
    }

    #[test]
    fn test_estimate_within_budget() {
        let config = PlannerConfig::default();
        // 100_000 / 12_120 = 8
        assert_eq!(estimate_batch_size(1000, 10, 4, 100_000, &config), 8);
    }

    #[test]
    fn test_estimate_clamps_to_one() {
        let config = PlannerConfig::default();
        assert_eq!(estimate_batch_size(1000, 10, 4, 0, &config), 1);
        assert_eq!(estimate_batch_size(1000, 10, 4, 12_119, &config), 1);
    }

    #[test]
    fn test_estimate_clamps_to_n_and_ceiling() {
        let config = PlannerConfig::default();
        assert_eq!(estimate_batch_size(50, 4, 4, u64::MAX, &config), 50);
        assert_eq!(estimate_batch_size(1_000_000, 4, 4, u64::MAX, &config), 10_000);

        let small_ceiling = PlannerConfig::default().with_max_batch_size(16);
        assert_eq!(estimate_batch_size(1000, 4, 4, u64::MAX, &small_ceiling), 16);
    }

    #[test]
    fn test_planner_uses_ratio() {
        let planner = BatchPlanner::with_probe(PlannerConfig::new(0.5), FixedMemory(200_000));
        assert_eq!(planner.budget_bytes(), 100_000);
        assert_eq!(planner.batch_size(1000, 10, 4), 8);
    }

    #[test]
    fn test_plan_covers_corpus() {
        let planner = BatchPlanner::with_probe(PlannerConfig::new(1.0), FixedMemory(100_000));
        let plan = planner.plan(1000, 10, 4).unwrap();
        assert_eq!(plan.batch_size(), 8);
        assert_eq!(plan.num_batches(), 125);
    }

    #[test]
    fn test_plan_queries_clamps_to_query_count() {
        let planner = BatchPlanner::with_probe(PlannerConfig::new(1.0), FixedMemory(u64::MAX));
        let plan = planner.plan_queries(7, 5000, 16, 4).unwrap();
        assert_eq!(plan.batch_size(), 7);
        assert_eq!(plan.num_points(), 7);
    }

    #[test]
    fn test_plan_rejects_bad_config() {
        let planner = BatchPlanner::with_probe(PlannerConfig::new(2.0), FixedMemory(1));
        assert!(planner.plan(10, 2, 4).is_err());
    }

    #[test]
    fn test_system_memory_probe() {
        // Only checks the probe is callable; the figure depends on the host.
        let _ = SystemMemory.available_bytes();
    }
}
