//! Scheduling engine: turns a snapshot of the cluster and a set of pending pods into a
//! scheduling decision.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ProvisionerConfig;
use crate::core::common::ResourceList;
use crate::core::instance_type::InstanceType;
use crate::core::node::StateNode;
use crate::core::node_pool::NodePool;
use crate::core::pod::Pod;
use crate::core::requirements::NodeSelectorRequirement;
use crate::metrics::sink::MetricsSink;
use crate::scheduling::errors::{PodError, ProvisionerError};
use crate::scheduling::options::SchedulerOptions;
use crate::scheduling::queue::Queue;
use crate::scheduling::results::{Interruption, Results};
use crate::scheduling::scheduler::{SolveContext, SolveState};
use crate::scheduling::strategy::{resolve_placement_strategy, PlacementStrategy};
use crate::scheduling::template::build_templates;

/// Node pools, the instance types each of them may launch and the daemon set pods every new node
/// runs. Read-only for the engine, shared between engines through `Arc`.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
pub struct Catalog {
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
    /// Node pool name to its eligible instance types.
    #[serde(default)]
    pub instance_types: BTreeMap<String, Vec<InstanceType>>,
    #[serde(default)]
    pub daemon_set_pods: Vec<Pod>,
}

impl Catalog {
    pub fn validate(&self) -> Result<(), ProvisionerError> {
        let mut names = BTreeSet::new();
        for node_pool in self.node_pools.iter() {
            let name = node_pool.name();
            if name.is_empty() {
                return Err(ProvisionerError::UnnamedNodePool);
            }
            if !names.insert(name) {
                return Err(ProvisionerError::DuplicateNodePool(name.to_string()));
            }
            if !(0..=100).contains(&node_pool.spec.weight) {
                return Err(ProvisionerError::InvalidWeight(
                    name.to_string(),
                    node_pool.spec.weight,
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq)]
pub struct SchedulingInput {
    #[serde(default)]
    pub nodes: Vec<StateNode>,
    #[serde(default)]
    pub pending_pods: Vec<Pod>,
    /// Pods of nodes marked for deletion which need a new place.
    #[serde(default)]
    pub deleting_node_pods: Vec<Pod>,
    #[serde(default)]
    pub options: SchedulerOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewNodeClaim {
    pub node_pool: String,
    pub hostname: String,
    pub requirements: Vec<NodeSelectorRequirement>,
    /// Cheapest first, at most `max_instance_types` of them.
    pub instance_type_options: Vec<InstanceType>,
    /// Options the claim had before it took its first pod.
    pub initial_instance_type_count: usize,
    pub pods: Vec<Pod>,
    /// Requests of the pods plus daemon overhead.
    pub requests: ResourceList,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExistingNodeDecision {
    pub node_name: String,
    pub pods: Vec<Pod>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SchedulingDecision {
    pub scheduling_id: Uuid,
    pub new_node_claims: Vec<NewNodeClaim>,
    pub existing_nodes: Vec<ExistingNodeDecision>,
    /// Pod key to every reason the pod could not be placed.
    pub pod_errors: BTreeMap<String, PodError>,
    pub no_node_pools_found: bool,
    /// Pods never considered because the simulation was interrupted.
    pub pods_remaining: Vec<Pod>,
    pub interruption: Option<Interruption>,
    #[serde(skip)]
    pub all_pods: Vec<Pod>,
}

impl SchedulingDecision {
    fn from_results(scheduling_id: Uuid, results: Results, all_pods: Vec<Pod>) -> Self {
        let new_node_claims = results
            .new_node_claims
            .into_iter()
            .map(|claim| NewNodeClaim {
                initial_instance_type_count: claim.initial_option_count(),
                requirements: claim.requirements.to_selectors(),
                instance_type_options: claim
                    .instance_type_options
                    .iter()
                    .map(|it| it.as_ref().clone())
                    .collect(),
                node_pool: claim.node_pool,
                hostname: claim.hostname,
                pods: claim.pods,
                requests: claim.requests,
            })
            .collect();
        let existing_nodes = results
            .existing_nodes
            .into_iter()
            .map(|node| ExistingNodeDecision {
                node_name: node.name,
                pods: node.pods,
            })
            .collect();
        Self {
            scheduling_id,
            new_node_claims,
            existing_nodes,
            pod_errors: results.pod_errors,
            no_node_pools_found: false,
            pods_remaining: results.pods_remaining,
            interruption: results.interruption,
            all_pods,
        }
    }

    /// Pods which could not be placed, not counting pods deferred because of reserved capacity.
    pub fn unschedulable_pod_count(&self) -> usize {
        self.pod_errors
            .values()
            .filter(|e| !e.is_reserved_offering_error())
            .count()
    }

    pub fn reserved_offering_errors(&self) -> BTreeMap<&str, &PodError> {
        self.pod_errors
            .iter()
            .filter(|(_, e)| e.is_reserved_offering_error())
            .map(|(key, e)| (key.as_str(), e))
            .collect()
    }

    /// Node pool name to keys of pods placed on its new node claims.
    pub fn node_pool_to_pods(&self) -> BTreeMap<String, Vec<String>> {
        let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for claim in self.new_node_claims.iter() {
            result
                .entry(claim.node_pool.clone())
                .or_default()
                .extend(claim.pods.iter().map(|p| p.key().to_string()));
        }
        result
    }

    /// Existing node name to keys of pods placed on it.
    pub fn node_to_pods(&self) -> BTreeMap<String, Vec<String>> {
        self.existing_nodes
            .iter()
            .map(|node| {
                (
                    node.node_name.clone(),
                    node.pods.iter().map(|p| p.key().to_string()).collect(),
                )
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct SchedulingEngine {
    catalog: Arc<Catalog>,
    strategy: Box<dyn PlacementStrategy>,
    solve_timeout: Duration,
    max_instance_types: usize,
    progress_log_interval: Duration,
    metrics: Rc<RefCell<dyn MetricsSink>>,
}

impl SchedulingEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        config: &ProvisionerConfig,
        metrics: Rc<RefCell<dyn MetricsSink>>,
    ) -> Result<Self, ProvisionerError> {
        catalog.validate()?;
        config.validate()?;
        let strategy = resolve_placement_strategy(&config.placement_strategy).ok_or_else(|| {
            ProvisionerError::UnknownPlacementStrategy(config.placement_strategy.clone())
        })?;
        Ok(Self {
            catalog,
            strategy,
            solve_timeout: config.solve_timeout_duration()?,
            max_instance_types: config.max_instance_types,
            progress_log_interval: config.progress_log_interval_duration()?,
            metrics,
        })
    }

    pub fn with_strategy(mut self, strategy: Box<dyn PlacementStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> &dyn PlacementStrategy {
        self.strategy.as_ref()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Runs one scheduling simulation bounded by the configured solve timeout.
    pub fn compute_scheduling_decision(
        &self,
        input: &SchedulingInput,
    ) -> Result<SchedulingDecision, ProvisionerError> {
        let ctx = SolveContext::new()
            .with_timeout(self.solve_timeout)
            .with_progress_log_interval(self.progress_log_interval);
        self.compute_scheduling_decision_with_context(input, &ctx)
    }

    pub fn compute_scheduling_decision_with_context(
        &self,
        input: &SchedulingInput,
        ctx: &SolveContext,
    ) -> Result<SchedulingDecision, ProvisionerError> {
        self.catalog.validate()?;
        let start = Instant::now();
        let mut metrics = self.metrics.borrow_mut();
        metrics.reset();

        let scheduling_id = Uuid::new_v4();
        let pods: Vec<Pod> = input
            .pending_pods
            .iter()
            .chain(input.deleting_node_pods.iter())
            .cloned()
            .collect();
        if pods.is_empty() {
            debug!("Scheduling {}: no pods to schedule", scheduling_id);
            return Ok(SchedulingDecision {
                scheduling_id,
                ..Default::default()
            });
        }

        let templates = build_templates(
            &self.catalog.node_pools,
            &self.catalog.instance_types,
            &self.catalog.daemon_set_pods,
            &mut *metrics,
        );
        if templates.is_empty() {
            warn!(
                "Scheduling {}: no nodepool can be used for {} pods",
                scheduling_id,
                pods.len()
            );
            return Ok(SchedulingDecision {
                scheduling_id,
                no_node_pools_found: true,
                all_pods: pods,
                ..Default::default()
            });
        }

        info!(
            "Scheduling {}: {} pods, {} nodes, {} nodepools, strategy {}",
            scheduling_id,
            pods.len(),
            input.nodes.len(),
            templates.len(),
            self.strategy.name()
        );

        let mut state = SolveState::new(
            scheduling_id,
            &pods,
            &input.nodes,
            templates,
            &self.catalog.node_pools,
            &self.catalog.instance_types,
            input.options.clone(),
        );
        let mut queue = Queue::new(pods.clone(), state.pod_data(), input.options.queue_order);
        let interruption = self.strategy.solve(&mut state, &mut queue, ctx, &mut *metrics);

        state.finalize();
        state.truncate_instance_types(self.max_instance_types);
        let results = state.into_results(queue.into_remaining(), interruption);

        let reserved_offering_errors = results.reserved_offering_errors().count();
        if reserved_offering_errors > 0 {
            info!(
                "Scheduling {}: {} pods deferred until reserved capacity frees up",
                scheduling_id, reserved_offering_errors
            );
        }
        let errors = results.non_pending_pod_scheduling_errors();
        if !errors.is_empty() {
            warn!("Scheduling {}: could not schedule {}", scheduling_id, errors);
        }

        let scheduled = results.scheduled_pod_count();
        let decision = SchedulingDecision::from_results(scheduling_id, results, pods);
        metrics.observe_solve_duration(start.elapsed().as_secs_f64());
        metrics.observe_new_node_claims(decision.new_node_claims.len());
        metrics.observe_unschedulable_pods(decision.unschedulable_pod_count());
        info!(
            "Scheduling {} finished in {:?}: {} pods scheduled, {} new node claims, {} existing nodes, {} pod errors, {} pods remaining",
            scheduling_id,
            start.elapsed(),
            scheduled,
            decision.new_node_claims.len(),
            decision.existing_nodes.len(),
            decision.pod_errors.len(),
            decision.pods_remaining.len()
        );
        Ok(decision)
    }
}
