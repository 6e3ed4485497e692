//! Placement of pods onto running nodes of the cluster snapshot.

use std::collections::BTreeMap;

use crate::core::common::ResourceList;
use crate::core::labels::LABEL_HOSTNAME;
use crate::core::node::StateNode;
use crate::core::pod::Pod;
use crate::scheduling::errors::ClaimError;
use crate::scheduling::host_ports::HostPortUsage;
use crate::scheduling::pod_data::PodData;
use crate::scheduling::topology::TopologyTracker;

#[derive(Debug, Clone)]
pub struct ExistingNode {
    pub name: String,
    labels: BTreeMap<String, String>,
    /// Resources free before the simulation placed anything.
    available: ResourceList,
    /// Requests of pods placed by the simulation.
    pub requests: ResourceList,
    host_ports: HostPortUsage,
    pub pods: Vec<Pod>,
}

impl ExistingNode {
    pub fn new(node: &StateNode) -> Self {
        let mut labels = node.node.metadata.labels.clone();
        labels
            .entry(LABEL_HOSTNAME.to_string())
            .or_insert_with(|| node.name().to_string());
        Self {
            name: node.name().to_string(),
            labels,
            available: node.available(),
            requests: ResourceList::new(),
            host_ports: HostPortUsage::from_ports(
                node.pods.iter().flat_map(|p| p.spec.host_ports.iter()),
            ),
            pods: Vec::new(),
        }
    }

    pub fn add(
        &mut self,
        pod: &Pod,
        pod_data: &PodData,
        topology: &mut TopologyTracker,
    ) -> Result<(), ClaimError> {
        pod_data
            .requirements
            .matches_labels(&self.labels)
            .map_err(ClaimError::IncompatibleRequirements)?;

        self.host_ports
            .conflicts(&pod_data.host_ports)
            .map_err(ClaimError::HostPortConflict)?;

        let requests = self.requests.merged(&pod_data.requests);
        if !requests.fits(&self.available) {
            return Err(ClaimError::InsufficientResources {
                requests: pod_data.requests.clone(),
                available: self.available.saturating_sub(&self.requests),
                exceeding: requests.exceeding(&self.available),
            });
        }

        let mut records = Vec::new();
        let mut declared = Vec::new();
        for constraint in pod_data.spread_constraints.iter() {
            let Some(group) = topology.group_id(constraint) else {
                continue;
            };
            declared.push(group);
            let key = constraint.topology_key.as_str();
            let violation = ClaimError::TopologySpread {
                key: key.to_string(),
                max_skew: constraint.max_skew,
            };
            let Some(domain) = self.labels.get(key) else {
                return Err(violation);
            };
            if !topology.is_compatible(group, domain, pod_data.requirements.get(key)) {
                return Err(violation);
            }
            if pod.matches_selector(&topology.group(group).selector) {
                records.push((group, domain.clone()));
            }
        }
        for group in topology.matching_groups(pod) {
            if declared.contains(&group) {
                continue;
            }
            if let Some(domain) = self.labels.get(&topology.group(group).key) {
                records.push((group, domain.clone()));
            }
        }

        for (group, domain) in records.iter() {
            topology.record(*group, domain);
        }
        self.requests = requests;
        self.host_ports.add(&pod_data.host_ports);
        self.pods.push(pod.clone());
        Ok(())
    }
}

/// Existing nodes the simulation may place pods onto, in snapshot order.
pub fn existing_nodes(nodes: &[StateNode]) -> Vec<ExistingNode> {
    nodes
        .iter()
        .filter(|n| n.is_active())
        .map(ExistingNode::new)
        .collect()
}
