//! Type definition for Pod primitive in k8s cluster

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, ResourceList, RESOURCE_CPU, RESOURCE_MEMORY};
use crate::core::requirements::NodeSelectorRequirement;

#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Resources {
    #[serde(default)]
    pub limits: ResourceList,
    pub requests: ResourceList,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum WhenUnsatisfiable {
    #[default]
    DoNotSchedule,
    /// Soft constraint, relaxed when the pod cannot be placed otherwise.
    ScheduleAnyway,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TopologySpreadConstraint {
    pub topology_key: String,
    pub max_skew: u32,
    #[serde(default)]
    pub when_unsatisfiable: WhenUnsatisfiable,
    /// Pods whose labels contain all of these pairs are counted in the spread.
    #[serde(default)]
    pub label_selector: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    TCP,
    UDP,
    SCTP,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub port: u16,
    #[serde(default = "protocol_default")]
    pub protocol: Protocol,
    /// Empty or `0.0.0.0` binds every address.
    #[serde(default)]
    pub ip: String,
}

fn protocol_default() -> Protocol {
    Protocol::TCP
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PodSpec {
    /// Simplified: instead of vector of containers - one container with resources
    pub resources: Resources,
    /// Required node affinity.
    #[serde(default)]
    pub node_requirements: Vec<NodeSelectorRequirement>,
    /// Preferred node affinity, most important first.
    #[serde(default)]
    pub preferred_node_requirements: Vec<NodeSelectorRequirement>,
    #[serde(default)]
    pub topology_spread_constraints: Vec<TopologySpreadConstraint>,
    #[serde(default)]
    pub host_ports: Vec<HostPort>,
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

impl Pod {
    pub fn new(name: String, cpu: u64, ram: u64) -> Self {
        let requests = ResourceList::cpu_memory(cpu, ram);
        Self {
            metadata: ObjectMeta {
                name,
                ..Default::default()
            },
            spec: PodSpec {
                resources: Resources {
                    limits: requests.clone(),
                    requests,
                },
                ..Default::default()
            },
        }
    }

    /// Identity used in scheduling results.
    pub fn key(&self) -> &str {
        self.metadata.key()
    }

    pub fn cpu_request(&self) -> u64 {
        self.spec.resources.requests.get(RESOURCE_CPU)
    }

    pub fn memory_request(&self) -> u64 {
        self.spec.resources.requests.get(RESOURCE_MEMORY)
    }

    /// Returns true if every pair of `selector` is present in the pod labels.
    pub fn matches_selector(&self, selector: &BTreeMap<String, String>) -> bool {
        selector
            .iter()
            .all(|(key, value)| self.metadata.labels.get(key) == Some(value))
    }
}
