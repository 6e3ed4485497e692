//! State of one scheduling simulation and the placement steps strategies are built from.
//!
//! Everything here lives exactly as long as one solve: the remaining resources ledger, derived pod
//! data, topology counts and reservation holds are created when the solve starts and are gone once
//! its results are taken.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use uuid::Uuid;

use crate::core::common::ResourceList;
use crate::core::instance_type::InstanceType;
use crate::core::node::StateNode;
use crate::core::node_pool::NodePool;
use crate::core::pod::Pod;
use crate::scheduling::errors::{PlacementCause, PodError};
use crate::scheduling::existing_node::{existing_nodes, ExistingNode};
use crate::scheduling::nodeclaim::NodeClaim;
use crate::scheduling::options::SchedulerOptions;
use crate::scheduling::pod_data::PodData;
use crate::scheduling::reservation::ReservationManager;
use crate::scheduling::results::{Interruption, Results};
use crate::scheduling::template::NodeClaimTemplate;
use crate::scheduling::topology::TopologyTracker;

/// Cooperative cancellation and progress logging settings of one solve.
#[derive(Debug, Clone)]
pub struct SolveContext {
    pub deadline: Option<Instant>,
    pub cancelled: Option<Arc<AtomicBool>>,
    pub progress_log_interval: Duration,
}

impl Default for SolveContext {
    fn default() -> Self {
        Self {
            deadline: None,
            cancelled: None,
            progress_log_interval: Duration::from_secs(60),
        }
    }
}

impl SolveContext {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    pub fn with_progress_log_interval(mut self, interval: Duration) -> Self {
        self.progress_log_interval = interval;
        self
    }

    pub fn interruption(&self) -> Option<Interruption> {
        if self
            .cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }
}

pub struct SolveState {
    pub scheduling_id: Uuid,
    pub options: SchedulerOptions,
    pub templates: Vec<NodeClaimTemplate>,
    pub existing_nodes: Vec<ExistingNode>,
    pub new_claims: Vec<NodeClaim>,
    /// Remaining budget of node pools with limits. Pools without limits have no entry.
    pub remaining_resources: HashMap<String, ResourceList>,
    pub topology: TopologyTracker,
    pub reservations: ReservationManager,
    pub pod_errors: BTreeMap<String, PodError>,
    pod_data: HashMap<String, PodData>,
    claim_counter: usize,
}

impl SolveState {
    pub fn new(
        scheduling_id: Uuid,
        pods: &[Pod],
        nodes: &[StateNode],
        templates: Vec<NodeClaimTemplate>,
        node_pools: &[NodePool],
        instance_types: &BTreeMap<String, Vec<InstanceType>>,
        options: SchedulerOptions,
    ) -> Self {
        let pod_data = pods
            .iter()
            .map(|p| (p.key().to_string(), PodData::new(p, options.ignore_preferences)))
            .collect();
        let remaining_resources = node_pools
            .iter()
            .filter_map(|np| {
                np.spec
                    .limits
                    .as_ref()
                    .map(|limits| (np.name().to_string(), limits.clone()))
            })
            .collect();
        Self {
            scheduling_id,
            topology: TopologyTracker::new(pods, nodes, &templates),
            reservations: ReservationManager::new(instance_types, &options),
            options,
            templates,
            existing_nodes: existing_nodes(nodes),
            new_claims: Vec::new(),
            remaining_resources,
            pod_errors: BTreeMap::new(),
            pod_data,
            claim_counter: 0,
        }
    }

    /// Takes the derived data of a pod out of the cache for the duration of its placement.
    pub fn take_pod_data(&mut self, pod: &Pod) -> PodData {
        self.pod_data
            .remove(pod.key())
            .unwrap_or_else(|| PodData::new(pod, self.options.ignore_preferences))
    }

    pub fn restore_pod_data(&mut self, pod: &Pod, data: PodData) {
        self.pod_data.insert(pod.key().to_string(), data);
    }

    pub fn pod_data(&self) -> &HashMap<String, PodData> {
        &self.pod_data
    }

    pub fn remaining_for(&self, node_pool: &str) -> Option<&ResourceList> {
        self.remaining_resources.get(node_pool)
    }

    pub fn try_existing_nodes(&mut self, pod: &Pod, data: &PodData) -> bool {
        for node in self.existing_nodes.iter_mut() {
            match node.add(pod, data, &mut self.topology) {
                Ok(()) => {
                    debug!("Pod {:?} fits existing node {:?}", pod.key(), node.name);
                    return true;
                }
                Err(e) => debug!(
                    "Pod {:?} does not fit existing node {:?}: {}",
                    pod.key(),
                    node.name,
                    e
                ),
            }
        }
        false
    }

    /// Tries node claims created earlier in this solve, the most utilized first.
    pub fn try_in_flight_claims(&mut self, pod: &Pod, data: &PodData) -> bool {
        let utilization: Vec<f64> = self.new_claims.iter().map(|c| c.utilization()).collect();
        let mut order: Vec<usize> = (0..self.new_claims.len()).collect();
        order.sort_by(|a, b| utilization[*b].total_cmp(&utilization[*a]));

        let policy = self.options.min_values_policy;
        for idx in order {
            let claim = &mut self.new_claims[idx];
            match claim.add(pod, data, &mut self.topology, &mut self.reservations, policy) {
                Ok(()) => return true,
                Err(e) => debug!(
                    "Pod {:?} does not fit node claim {:?}: {}",
                    pod.key(),
                    claim.hostname,
                    e
                ),
            }
        }
        false
    }

    /// Tries a new node claim from every template in order. Causes of failure are appended to
    /// `error`. A reserved offering error stops the search: templates with lower weight must not be
    /// used instead.
    pub fn try_new_claim(&mut self, pod: &Pod, data: &PodData, error: &mut PodError) -> bool {
        let policy = self.options.min_values_policy;
        for template in self.templates.iter() {
            let options =
                template.filter_by_remaining(self.remaining_resources.get(&template.node_pool));
            if options.is_empty() {
                error.push(PlacementCause::LimitExceeded {
                    node_pool: template.node_pool.clone(),
                });
                continue;
            }
            if options.len() < template.instance_type_options.len() {
                debug!(
                    "{} out of {} instance types were excluded because they would breach limits of nodepool {:?}",
                    template.instance_type_options.len() - options.len(),
                    template.instance_type_options.len(),
                    template.node_pool
                );
            }

            self.claim_counter += 1;
            let hostname = format!("hostname-placeholder-{:04}", self.claim_counter);
            let mut claim = NodeClaim::new(template, hostname, options);
            match claim.add(pod, data, &mut self.topology, &mut self.reservations, policy) {
                Ok(()) => {
                    if let Some(remaining) = self.remaining_resources.get_mut(&template.node_pool) {
                        let charged = ResourceList::max_of(
                            claim.instance_type_options.iter().map(|it| &it.capacity),
                        );
                        *remaining = remaining.saturating_sub(&charged);
                    }
                    debug!(
                        "Pod {:?} opened node claim {:?} of nodepool {:?}",
                        pod.key(),
                        claim.hostname,
                        claim.node_pool
                    );
                    self.new_claims.push(claim);
                    return true;
                }
                Err(source) if source.is_reserved_offering_error() => {
                    error.push(PlacementCause::ReservedOfferingDeferral {
                        node_pool: template.node_pool.clone(),
                        source,
                    });
                    return false;
                }
                Err(source) => error.push(PlacementCause::Incompatible {
                    node_pool: template.node_pool.clone(),
                    daemon_overhead: template.daemon_overhead.clone(),
                    source,
                }),
            }
        }
        false
    }

    pub fn record_error(&mut self, pod: &Pod, error: PodError) {
        self.pod_errors.insert(pod.key().to_string(), error);
    }

    pub fn finalize(&mut self) {
        for claim in self.new_claims.iter_mut() {
            claim.finalize_scheduling();
        }
    }

    /// Caps the options of every claim. Claims which would break `min_values` under the strict
    /// policy are dropped and their pods get an error.
    pub fn truncate_instance_types(&mut self, max_instance_types: usize) {
        let policy = self.options.min_values_policy;
        let claims = std::mem::take(&mut self.new_claims);
        for mut claim in claims {
            let source = match claim.truncate_options(max_instance_types, policy) {
                Ok(()) => {
                    self.new_claims.push(claim);
                    continue;
                }
                Err(source) => source,
            };
            warn!(
                "Dropping node claim {:?} of nodepool {:?}: {}",
                claim.hostname, claim.node_pool, source
            );
            for pod in claim.pods.iter() {
                let mut error = PodError::new();
                error.push(PlacementCause::Truncated {
                    node_pool: claim.node_pool.clone(),
                    source: source.clone(),
                });
                self.pod_errors.insert(pod.key().to_string(), error);
            }
            claim.destroy(&mut self.topology, &mut self.reservations);
        }
    }

    pub fn into_results(
        self,
        pods_remaining: Vec<Pod>,
        interruption: Option<Interruption>,
    ) -> Results {
        Results {
            new_node_claims: self.new_claims,
            existing_nodes: self
                .existing_nodes
                .into_iter()
                .filter(|n| !n.pods.is_empty())
                .collect(),
            pod_errors: self.pod_errors,
            pods_remaining,
            interruption,
        }
    }
}
