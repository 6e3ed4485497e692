//! Well-known node label keys.
//!
//! Values of well-known labels are not fixed by a node pool: they are decided by the instance type
//! (and offering) a node claim finally launches with, so a pod may require them even if the node
//! pool does not mention them.

use std::collections::HashSet;

use lazy_static::lazy_static;

pub const LABEL_HOSTNAME: &str = "kubernetes.io/hostname";
pub const LABEL_TOPOLOGY_ZONE: &str = "topology.kubernetes.io/zone";
pub const LABEL_INSTANCE_TYPE: &str = "node.kubernetes.io/instance-type";
pub const LABEL_ARCH: &str = "kubernetes.io/arch";
pub const LABEL_CAPACITY_TYPE: &str = "kubernetriks.io/capacity-type";
pub const LABEL_NODE_POOL: &str = "kubernetriks.io/node-pool";

lazy_static! {
    pub static ref WELL_KNOWN_LABELS: HashSet<&'static str> = HashSet::from([
        LABEL_HOSTNAME,
        LABEL_TOPOLOGY_ZONE,
        LABEL_INSTANCE_TYPE,
        LABEL_ARCH,
        LABEL_CAPACITY_TYPE,
        LABEL_NODE_POOL,
    ]);
}

pub fn is_well_known(key: &str) -> bool {
    WELL_KNOWN_LABELS.contains(key)
}
