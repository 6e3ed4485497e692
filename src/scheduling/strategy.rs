//! Placement strategies: how the solve loop decides where a pod goes.

use std::time::Instant;

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::DynClone;
use log::{debug, info, warn};

use crate::core::pod::Pod;
use crate::metrics::sink::MetricsSink;
use crate::scheduling::errors::PodError;
use crate::scheduling::pod_data::PodData;
use crate::scheduling::queue::Queue;
use crate::scheduling::results::Interruption;
use crate::scheduling::scheduler::{SolveContext, SolveState};

pub trait PlacementStrategy: Downcast + DynClone {
    fn name(&self) -> &'static str;

    /// Places one pod or returns every reason it could not be placed. On failure the pod is not
    /// placed anywhere.
    fn add_workload_to_claim(
        &self,
        state: &mut SolveState,
        pod: &Pod,
        pod_data: &PodData,
    ) -> Result<(), PodError>;

    /// Pops pods until the queue is empty or the context signals an interruption. Pods which
    /// cannot be placed have their preferences relaxed one at a time before an error is recorded.
    fn solve(
        &self,
        state: &mut SolveState,
        queue: &mut Queue,
        ctx: &SolveContext,
        metrics: &mut dyn MetricsSink,
    ) -> Option<Interruption> {
        let mut last_progress_log = Instant::now();
        loop {
            if let Some(interruption) = ctx.interruption() {
                warn!(
                    "Scheduling {} interrupted ({:?}) with {} pods left in queue",
                    state.scheduling_id,
                    interruption,
                    queue.len()
                );
                metrics.observe_queue_depth(queue.len());
                return Some(interruption);
            }
            let Some(pod) = queue.pop() else {
                break;
            };
            if last_progress_log.elapsed() >= ctx.progress_log_interval {
                info!(
                    "Scheduling {}: {} pods left in queue, {} new node claims, {} pod errors",
                    state.scheduling_id,
                    queue.len(),
                    state.new_claims.len(),
                    state.pod_errors.len()
                );
                metrics.observe_queue_depth(queue.len());
                last_progress_log = Instant::now();
            }

            let mut pod_data = state.take_pod_data(&pod);
            loop {
                match self.add_workload_to_claim(state, &pod, &pod_data) {
                    Ok(()) => break,
                    Err(error) => {
                        if pod_data.relax(pod.key()) {
                            continue;
                        }
                        debug!(
                            "Could not schedule pod {:?} (owner {:?}): {}",
                            pod.key(),
                            pod.metadata.owner_reference,
                            error
                        );
                        state.record_error(&pod, error);
                        break;
                    }
                }
            }
            state.restore_pod_data(&pod, pod_data);
        }
        metrics.observe_queue_depth(0);
        None
    }
}

impl_downcast!(PlacementStrategy);
dyn_clone::clone_trait_object!(PlacementStrategy);

/// Packs as many pods as possible onto every node: existing nodes first, then node claims of this
/// solve, then a new claim.
#[derive(Debug, Clone, Default)]
pub struct BestFitStrategy;

impl PlacementStrategy for BestFitStrategy {
    fn name(&self) -> &'static str {
        "best_fit"
    }

    fn add_workload_to_claim(
        &self,
        state: &mut SolveState,
        pod: &Pod,
        pod_data: &PodData,
    ) -> Result<(), PodError> {
        if state.try_existing_nodes(pod, pod_data) || state.try_in_flight_claims(pod, pod_data) {
            return Ok(());
        }
        let mut error = PodError::new();
        if state.try_new_claim(pod, pod_data, &mut error) {
            return Ok(());
        }
        Err(error)
    }
}

/// Opens a new node claim for every pod and never reuses capacity.
#[derive(Debug, Clone, Default)]
pub struct SinglePodPerNodeStrategy;

impl PlacementStrategy for SinglePodPerNodeStrategy {
    fn name(&self) -> &'static str {
        "single_pod_per_node"
    }

    fn add_workload_to_claim(
        &self,
        state: &mut SolveState,
        pod: &Pod,
        pod_data: &PodData,
    ) -> Result<(), PodError> {
        let mut error = PodError::new();
        if state.try_new_claim(pod, pod_data, &mut error) {
            return Ok(());
        }
        Err(error)
    }
}

/// Strategy by its configuration name, `None` if unknown.
pub fn resolve_placement_strategy(name: &str) -> Option<Box<dyn PlacementStrategy>> {
    match name {
        "best_fit" => Some(Box::new(BestFitStrategy)),
        "single_pod_per_node" => Some(Box::new(SinglePodPerNodeStrategy)),
        _ => None,
    }
}
