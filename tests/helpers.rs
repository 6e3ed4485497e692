#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use kubernetriks_provisioner::config::ProvisionerConfig;
use kubernetriks_provisioner::core::pod::Pod;
use kubernetriks_provisioner::core::requirements::Operator;
use kubernetriks_provisioner::metrics::collector::MetricsCollector;
use kubernetriks_provisioner::provisioner::{
    Catalog, NewNodeClaim, SchedulingDecision, SchedulingEngine, SchedulingInput,
};

pub fn engine_with_config(
    catalog: Catalog,
    config: &ProvisionerConfig,
) -> (SchedulingEngine, Rc<RefCell<MetricsCollector>>) {
    let _ = env_logger::try_init();
    let metrics = Rc::new(RefCell::new(MetricsCollector::new()));
    let engine = SchedulingEngine::new(Arc::new(catalog), config, metrics.clone()).unwrap();
    (engine, metrics)
}

pub fn engine(catalog: Catalog) -> SchedulingEngine {
    engine_with_config(catalog, &ProvisionerConfig::default()).0
}

pub fn pending(pods: Vec<Pod>) -> SchedulingInput {
    SchedulingInput {
        pending_pods: pods,
        ..Default::default()
    }
}

/// Value a claim is pinned to for label `key`, if exactly one.
pub fn claim_label(claim: &NewNodeClaim, key: &str) -> Option<String> {
    claim
        .requirements
        .iter()
        .find(|r| r.key == key && r.operator == Operator::In && r.values.len() == 1)
        .map(|r| r.values[0].clone())
}

pub fn claim_pod_keys(claim: &NewNodeClaim) -> Vec<String> {
    claim.pods.iter().map(|p| p.key().to_string()).collect()
}

/// Every pod of the input is placed exactly once, has an error or is left in the queue.
pub fn check_exclusivity(input: &SchedulingInput, decision: &SchedulingDecision) {
    let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();
    let placed = decision
        .new_node_claims
        .iter()
        .flat_map(|c| c.pods.iter())
        .chain(decision.existing_nodes.iter().flat_map(|n| n.pods.iter()));
    for pod in placed.chain(decision.pods_remaining.iter()) {
        *outcomes.entry(pod.key().to_string()).or_insert(0) += 1;
    }
    for key in decision.pod_errors.keys() {
        *outcomes.entry(key.clone()).or_insert(0) += 1;
    }

    let expected: Vec<&Pod> = input
        .pending_pods
        .iter()
        .chain(input.deleting_node_pods.iter())
        .collect();
    assert_eq!(expected.len(), outcomes.len());
    for pod in expected {
        assert_eq!(Some(&1), outcomes.get(pod.key()), "pod {:?}", pod.key());
    }
}
