//! Builders for pods, nodes, node pools and instance types used across tests.

use std::collections::BTreeMap;

use crate::core::common::ResourceList;
use crate::core::instance_type::{CapacityType, InstanceType, Offering};
use crate::core::labels::LABEL_ARCH;
use crate::core::node::{Node, StateNode};
use crate::core::node_pool::NodePool;
use crate::core::pod::Pod;
use crate::provisioner::Catalog;

pub fn offering(zone: &str, price: f64) -> Offering {
    Offering {
        zone: zone.to_string(),
        capacity_type: CapacityType::OnDemand,
        price,
        available: true,
        reservation_id: None,
        reservation_capacity: 0,
    }
}

pub fn reserved_offering(zone: &str, price: f64, reservation_id: &str, capacity: u32) -> Offering {
    Offering {
        capacity_type: CapacityType::Reserved,
        reservation_id: Some(reservation_id.to_string()),
        reservation_capacity: capacity,
        ..offering(zone, price)
    }
}

pub fn instance_type(name: &str, cpu: u64, memory: u64, offerings: Vec<Offering>) -> InstanceType {
    InstanceType {
        name: name.to_string(),
        labels: BTreeMap::new(),
        capacity: ResourceList::cpu_memory(cpu, memory),
        overhead: ResourceList::new(),
        offerings,
    }
}

pub fn with_arch(mut instance_type: InstanceType, arch: &str) -> InstanceType {
    instance_type
        .labels
        .insert(LABEL_ARCH.to_string(), arch.to_string());
    instance_type
}

pub fn pod(name: &str, cpu: u64, memory: u64) -> Pod {
    Pod::new(name.to_string(), cpu, memory)
}

pub fn with_labels(mut pod: Pod, labels: &[(&str, &str)]) -> Pod {
    for (key, value) in labels {
        pod.metadata
            .labels
            .insert(key.to_string(), value.to_string());
    }
    pod
}

pub fn node_pool(name: &str, weight: i32) -> NodePool {
    let mut node_pool = NodePool::new(name);
    node_pool.spec.weight = weight;
    node_pool
}

pub fn state_node(name: &str, cpu: u64, memory: u64) -> StateNode {
    StateNode {
        node: Node::new(name, cpu, memory),
        pods: Vec::new(),
        marked_for_deletion: false,
    }
}

/// Catalog with the given node pools, each with its own instance types.
pub fn catalog(node_pools: Vec<(NodePool, Vec<InstanceType>)>) -> Catalog {
    let mut catalog = Catalog::default();
    for (node_pool, instance_types) in node_pools {
        catalog
            .instance_types
            .insert(node_pool.name().to_string(), instance_types);
        catalog.node_pools.push(node_pool);
    }
    catalog
}
