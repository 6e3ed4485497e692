//! Interface through which the scheduling engine reports metrics.

/// Receiver of scheduling metrics. The engine owns no metric state of its own and writes only
/// through this trait.
pub trait MetricsSink {
    /// Called at the start of every scheduling simulation.
    fn reset(&mut self);

    fn observe_solve_duration(&mut self, seconds: f64);

    /// Pods still waiting in the queue, reported with progress logs and at the end of the loop.
    fn observe_queue_depth(&mut self, depth: usize);

    fn observe_unschedulable_pods(&mut self, count: usize);

    fn observe_new_node_claims(&mut self, count: usize);

    /// Node pool was skipped because none of its instance types satisfy its requirements.
    fn record_no_compatible_instance_types(&mut self, node_pool: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn reset(&mut self) {}

    fn observe_solve_duration(&mut self, _seconds: f64) {}

    fn observe_queue_depth(&mut self, _depth: usize) {}

    fn observe_unschedulable_pods(&mut self, _count: usize) {}

    fn observe_new_node_claims(&mut self, _count: usize) {}

    fn record_no_compatible_instance_types(&mut self, _node_pool: &str) {}
}
