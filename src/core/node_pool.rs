//! Type definition for node pool: a named template for node creation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, ResourceList};
use crate::core::requirements::NodeSelectorRequirement;

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodePoolSpec {
    /// Relative preference; pools with higher weight are tried first.
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub requirements: Vec<NodeSelectorRequirement>,
    /// Labels every node of the pool gets.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Total resources all nodes of the pool may ever have. None means unlimited.
    #[serde(default)]
    pub limits: Option<ResourceList>,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodePool {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NodePoolSpec,
}

impl NodePool {
    pub fn new(name: &str) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
            spec: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}
