//! Common primitives shared by pods, nodes, node pools and instance types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Cpu quantity in millicores.
pub const RESOURCE_CPU: &str = "cpu";
/// Memory quantity in bytes.
pub const RESOURCE_MEMORY: &str = "memory";

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    /// Unique identifier. When empty the name is used as identity.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Opaque owner reference in `kind/name` form, used only for diagnostics.
    #[serde(default)]
    pub owner_reference: Option<String>,
}

impl ObjectMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> &str {
        if self.uid.is_empty() {
            &self.name
        } else {
            &self.uid
        }
    }
}

/// Named resource quantities. Cpu is counted in millicores, memory in bytes, everything else in
/// plain units. Missing entries are zero.
#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct ResourceList(BTreeMap<String, u64>);

impl ResourceList {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn cpu_memory(cpu: u64, memory: u64) -> Self {
        Self::from_pairs(&[(RESOURCE_CPU, cpu), (RESOURCE_MEMORY, memory)])
    }

    pub fn from_pairs(pairs: &[(&str, u64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(name, quantity)| (name.to_string(), *quantity))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    /// Adds `other` quantity by quantity, saturating at `u64::MAX`.
    pub fn add(&mut self, other: &ResourceList) {
        for (name, quantity) in other.0.iter() {
            let entry = self.0.entry(name.clone()).or_insert(0);
            *entry = entry.saturating_add(*quantity);
        }
    }

    pub fn merged(&self, other: &ResourceList) -> ResourceList {
        let mut result = self.clone();
        result.add(other);
        result
    }

    /// Subtracts `other` keeping only names present in `self`, never going below zero.
    pub fn saturating_sub(&self, other: &ResourceList) -> ResourceList {
        ResourceList(
            self.0
                .iter()
                .map(|(name, quantity)| (name.clone(), quantity.saturating_sub(other.get(name))))
                .collect(),
        )
    }

    /// Returns true if every requested quantity is available in `available`.
    pub fn fits(&self, available: &ResourceList) -> bool {
        self.0
            .iter()
            .all(|(name, quantity)| *quantity <= available.get(name))
    }

    /// Names of resources whose request exceeds `available`.
    pub fn exceeding(&self, available: &ResourceList) -> Vec<String> {
        self.0
            .iter()
            .filter(|(name, quantity)| **quantity > available.get(name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Per-resource maximum over all lists.
    pub fn max_of<'a>(lists: impl IntoIterator<Item = &'a ResourceList>) -> ResourceList {
        let mut result = ResourceList::new();
        for list in lists {
            for (name, quantity) in list.0.iter() {
                let entry = result.0.entry(name.clone()).or_insert(0);
                *entry = (*entry).max(*quantity);
            }
        }
        result
    }
}

impl fmt::Display for ResourceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, quantity)| match name.as_str() {
                RESOURCE_CPU => format!("{}={}m", name, quantity),
                _ => format!("{}={}", name, quantity),
            })
            .collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}
