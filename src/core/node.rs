//! Type definitions for nodes of the cluster snapshot the provisioner schedules against.

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, ResourceList};
use crate::core::pod::Pod;

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeStatus {
    // How much resources left for new pods. Missing means capacity minus requests of bound pods.
    #[serde(default)]
    pub allocatable: Option<ResourceList>,
    // Total amount of resources
    pub capacity: ResourceList,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Node {
    pub metadata: ObjectMeta,
    pub status: NodeStatus,
}

impl Node {
    pub fn new(name: &str, cpu: u64, ram: u64) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
            status: NodeStatus {
                allocatable: None,
                capacity: ResourceList::cpu_memory(cpu, ram),
            },
        }
    }
}

/// A node of the cluster snapshot together with the pods currently bound to it.
#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StateNode {
    pub node: Node,
    #[serde(default)]
    pub pods: Vec<Pod>,
    /// Node is being removed; its pods come as displaced pods and it takes no new ones.
    #[serde(default)]
    pub marked_for_deletion: bool,
}

impl StateNode {
    pub fn name(&self) -> &str {
        &self.node.metadata.name
    }

    pub fn is_active(&self) -> bool {
        !self.marked_for_deletion
    }

    /// Resources still free for new pods.
    pub fn available(&self) -> ResourceList {
        match &self.node.status.allocatable {
            Some(allocatable) => allocatable.clone(),
            None => {
                let mut used = ResourceList::new();
                for pod in self.pods.iter() {
                    used.add(&pod.spec.resources.requests);
                }
                self.node.status.capacity.saturating_sub(&used)
            }
        }
    }
}
