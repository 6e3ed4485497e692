//! Type definitions for instance types (node shapes) and their offerings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::common::ResourceList;
use crate::core::labels::{LABEL_CAPACITY_TYPE, LABEL_INSTANCE_TYPE, LABEL_TOPOLOGY_ZONE};
use crate::core::requirements::{Operator, Requirement, Requirements};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityType {
    OnDemand,
    Spot,
    Reserved,
}

impl CapacityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityType::OnDemand => "on-demand",
            CapacityType::Spot => "spot",
            CapacityType::Reserved => "reserved",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Offering {
    pub zone: String,
    pub capacity_type: CapacityType,
    pub price: f64,
    #[serde(default = "available_default")]
    pub available: bool,
    /// Set only for reserved offerings.
    #[serde(default)]
    pub reservation_id: Option<String>,
    /// Number of nodes the reservation can still back.
    #[serde(default)]
    pub reservation_capacity: u32,
}

fn available_default() -> bool {
    true
}

impl Offering {
    pub fn is_reserved(&self) -> bool {
        self.capacity_type == CapacityType::Reserved && self.reservation_id.is_some()
    }

    /// Checks zone and capacity type against requirements. Keys absent from `requirements` are
    /// unconstrained.
    pub fn compatible(&self, requirements: &Requirements) -> bool {
        let zone_ok = requirements
            .get(LABEL_TOPOLOGY_ZONE)
            .map_or(true, |r| r.has(&self.zone));
        let capacity_type_ok = requirements
            .get(LABEL_CAPACITY_TYPE)
            .map_or(true, |r| r.has(self.capacity_type.as_str()));
        zone_ok && capacity_type_ok
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InstanceType {
    pub name: String,
    /// Static labels of the shape, e.g. architecture.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub capacity: ResourceList,
    /// Capacity reserved for the system and kubelet, not available to pods.
    #[serde(default)]
    pub overhead: ResourceList,
    pub offerings: Vec<Offering>,
}

impl InstanceType {
    pub fn allocatable(&self) -> ResourceList {
        self.capacity.saturating_sub(&self.overhead)
    }

    pub fn available_offerings(&self) -> impl Iterator<Item = &Offering> {
        self.offerings.iter().filter(|o| o.available)
    }

    pub fn compatible_offerings<'a>(
        &'a self,
        requirements: &'a Requirements,
    ) -> impl Iterator<Item = &'a Offering> + 'a {
        self.available_offerings()
            .filter(move |o| o.compatible(requirements))
    }

    /// Requirements describing every node this instance type could become.
    pub fn requirements(&self) -> Requirements {
        let mut requirements = Requirements::new();
        requirements.add(Requirement::new(
            LABEL_INSTANCE_TYPE,
            Operator::In,
            [self.name.as_str()],
        ));
        for (key, value) in self.labels.iter() {
            requirements.add(Requirement::new(key, Operator::In, [value.as_str()]));
        }
        let zones: BTreeSet<String> = self.available_offerings().map(|o| o.zone.clone()).collect();
        requirements.add(Requirement::with_values(LABEL_TOPOLOGY_ZONE, zones));
        let capacity_types: BTreeSet<String> = self
            .available_offerings()
            .map(|o| o.capacity_type.as_str().to_string())
            .collect();
        requirements.add(Requirement::with_values(LABEL_CAPACITY_TYPE, capacity_types));
        requirements
    }

    /// Instance type can back a node satisfying `requirements`: its own labels intersect them and
    /// at least one available offering is compatible.
    pub fn compatible(&self, requirements: &Requirements) -> bool {
        requirements.intersects(&self.requirements()).is_ok()
            && self.compatible_offerings(requirements).next().is_some()
    }

    /// Instance type decides the value of label `key` on its nodes.
    pub fn defines_label(&self, key: &str) -> bool {
        matches!(
            key,
            LABEL_TOPOLOGY_ZONE | LABEL_CAPACITY_TYPE | LABEL_INSTANCE_TYPE
        ) || self.labels.contains_key(key)
    }

    /// Values this instance type could give to label `key` on a node satisfying `requirements`.
    pub fn label_values(&self, key: &str, requirements: &Requirements) -> BTreeSet<String> {
        let values: BTreeSet<String> = match key {
            LABEL_TOPOLOGY_ZONE => self
                .compatible_offerings(requirements)
                .map(|o| o.zone.clone())
                .collect(),
            LABEL_CAPACITY_TYPE => self
                .compatible_offerings(requirements)
                .map(|o| o.capacity_type.as_str().to_string())
                .collect(),
            LABEL_INSTANCE_TYPE => BTreeSet::from([self.name.clone()]),
            _ => self.labels.get(key).cloned().into_iter().collect(),
        };
        match requirements.get(key) {
            Some(requirement) => values.into_iter().filter(|v| requirement.has(v)).collect(),
            None => values,
        }
    }

    pub fn cheapest_price(&self, requirements: &Requirements) -> Option<f64> {
        self.compatible_offerings(requirements)
            .map(|o| o.price)
            .min_by(|a, b| a.total_cmp(b))
    }
}
