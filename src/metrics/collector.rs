//! In-memory metrics sink. Keeps counters and running statistics over every scheduling
//! simulation of an engine.

use std::collections::BTreeMap;

use average::{concatenate, Estimate, Max, Mean, Min, Variance};

use crate::metrics::sink::MetricsSink;

concatenate!(
    Estimator,
    [Min, min],
    [Max, max],
    [Mean, mean],
    [Variance, population_variance]
);

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("mean", &self.mean)
            .field("population_variance", &self.population_variance)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct EstimatorWrapper {
    estimator: Estimator,
    count: u64,
}

impl EstimatorWrapper {
    pub fn new() -> Self {
        Self {
            estimator: Estimator::new(),
            count: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.estimator.add(value);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.estimator.min()
    }

    pub fn max(&self) -> f64 {
        self.estimator.max()
    }

    pub fn mean(&self) -> f64 {
        self.estimator.mean()
    }

    pub fn population_variance(&self) -> f64 {
        self.estimator.population_variance()
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    /// The number of scheduling simulations started.
    pub solves: u64,
    /// Total number of node claims over all simulations.
    pub total_new_node_claims: u64,
    /// Total number of unschedulable pods over all simulations. Pods deferred because of reserved
    /// capacity are not counted.
    pub total_unschedulable_pods: u64,
    /// Queue depth last reported by the running simulation.
    pub queue_depth: usize,
    /// Unschedulable pods of the last simulation.
    pub unschedulable_pods: usize,
    /// Node pool name to the number of simulations which skipped it.
    pub no_compatible_instance_types: BTreeMap<String, u64>,

    /// Estimations for wall-clock duration of a simulation in seconds.
    pub solve_duration_stats: EstimatorWrapper,
    /// Estimations for queue depth reported during simulations.
    pub queue_depth_stats: EstimatorWrapper,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Default::default()
    }
}

impl MetricsSink for MetricsCollector {
    fn reset(&mut self) {
        self.solves += 1;
        self.queue_depth = 0;
        self.unschedulable_pods = 0;
    }

    fn observe_solve_duration(&mut self, seconds: f64) {
        self.solve_duration_stats.add(seconds);
    }

    fn observe_queue_depth(&mut self, depth: usize) {
        self.queue_depth = depth;
        self.queue_depth_stats.add(depth as f64);
    }

    fn observe_unschedulable_pods(&mut self, count: usize) {
        self.unschedulable_pods = count;
        self.total_unschedulable_pods += count as u64;
    }

    fn observe_new_node_claims(&mut self, count: usize) {
        self.total_new_node_claims += count as u64;
    }

    fn record_no_compatible_instance_types(&mut self, node_pool: &str) {
        *self
            .no_compatible_instance_types
            .entry(node_pool.to_string())
            .or_insert(0) += 1;
    }
}
