//! Outcome of one scheduling simulation, before it is turned into a decision.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::pod::Pod;
use crate::scheduling::errors::PodError;
use crate::scheduling::existing_node::ExistingNode;
use crate::scheduling::nodeclaim::NodeClaim;

/// Why the solve loop stopped before the queue was empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interruption {
    DeadlineExceeded,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct Results {
    pub new_node_claims: Vec<NodeClaim>,
    /// Existing nodes which got at least one pod.
    pub existing_nodes: Vec<ExistingNode>,
    pub pod_errors: BTreeMap<String, PodError>,
    /// Pods never popped from the queue because the loop was interrupted.
    pub pods_remaining: Vec<Pod>,
    pub interruption: Option<Interruption>,
}

impl Results {
    pub fn scheduled_pod_count(&self) -> usize {
        self.new_node_claims.iter().map(|c| c.pods.len()).sum::<usize>()
            + self.existing_nodes.iter().map(|n| n.pods.len()).sum::<usize>()
    }

    /// Pods deferred because of reserved capacity rather than found unschedulable.
    pub fn reserved_offering_errors(&self) -> impl Iterator<Item = (&String, &PodError)> {
        self.pod_errors
            .iter()
            .filter(|(_, e)| e.is_reserved_offering_error())
    }

    pub fn non_pending_pod_scheduling_errors(&self) -> String {
        let parts: Vec<String> = self
            .pod_errors
            .iter()
            .filter(|(_, e)| !e.is_reserved_offering_error())
            .map(|(key, e)| format!("pod {:?}: {}", key, e))
            .collect();
        parts.join(", ")
    }
}
