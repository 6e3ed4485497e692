//! Tracks how pods matching topology spread constraints are distributed over topology domains.
//!
//! A group is identified by topology key, max skew and label selector, so pods declaring the same
//! constraint share one group. The tracker is seeded with pods already running on active nodes and
//! then updated with every pod the simulation places.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::core::labels::LABEL_HOSTNAME;
use crate::core::node::StateNode;
use crate::core::pod::{Pod, TopologySpreadConstraint};
use crate::core::requirements::Requirement;
use crate::scheduling::template::NodeClaimTemplate;

/// Value of `key` on an existing node. Hostname falls back to the node name.
pub fn node_domain(node: &StateNode, key: &str) -> Option<String> {
    match node.node.metadata.labels.get(key) {
        Some(value) => Some(value.clone()),
        None if key == LABEL_HOSTNAME => Some(node.name().to_string()),
        None => None,
    }
}

#[derive(Debug, Clone)]
pub struct TopologyGroup {
    pub key: String,
    pub max_skew: u32,
    pub selector: BTreeMap<String, String>,
    domains: BTreeMap<String, u32>,
}

impl TopologyGroup {
    fn new(constraint: &TopologySpreadConstraint) -> Self {
        Self {
            key: constraint.topology_key.clone(),
            max_skew: constraint.max_skew,
            selector: constraint.label_selector.clone(),
            domains: BTreeMap::new(),
        }
    }

    fn is_declared_by(&self, constraint: &TopologySpreadConstraint) -> bool {
        self.key == constraint.topology_key
            && self.max_skew == constraint.max_skew
            && self.selector == constraint.label_selector
    }

    /// A fresh node is always possible, so hostname groups have a virtual empty domain.
    fn has_empty_domain(&self) -> bool {
        self.key == LABEL_HOSTNAME
    }

    fn count(&self, domain: &str) -> u32 {
        self.domains.get(domain).copied().unwrap_or(0)
    }

    /// Smallest count among domains the pod could land in.
    fn min_count(&self, eligible: Option<&Requirement>) -> u32 {
        if self.has_empty_domain() {
            return 0;
        }
        self.domains
            .iter()
            .filter(|(domain, _)| eligible.map_or(true, |r| r.has(domain)))
            .map(|(_, count)| *count)
            .min()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopologyTracker {
    groups: Vec<TopologyGroup>,
}

impl TopologyTracker {
    /// Builds groups for spread constraints of `pods`, registers the domain universe from
    /// templates and nodes, and counts pods running on active nodes.
    pub fn new(pods: &[Pod], nodes: &[StateNode], templates: &[NodeClaimTemplate]) -> Self {
        let mut tracker = Self::default();
        for pod in pods.iter() {
            for constraint in pod.spec.topology_spread_constraints.iter() {
                if tracker.group_id(constraint).is_none() {
                    tracker.groups.push(TopologyGroup::new(constraint));
                }
            }
        }
        if tracker.groups.is_empty() {
            return tracker;
        }

        for group in tracker.groups.iter_mut() {
            for template in templates.iter() {
                if let Some(values) = template.requirements.get(&group.key).and_then(|r| r.values()) {
                    for value in values.iter() {
                        group.domains.entry(value.clone()).or_insert(0);
                    }
                }
                for instance_type in template.instance_type_options.iter() {
                    for value in instance_type.label_values(&group.key, &template.requirements) {
                        group.domains.entry(value).or_insert(0);
                    }
                }
            }
            for node in nodes.iter().filter(|n| n.is_active()) {
                let Some(domain) = node_domain(node, &group.key) else {
                    continue;
                };
                let matching = node
                    .pods
                    .iter()
                    .filter(|p| p.matches_selector(&group.selector))
                    .count() as u32;
                *group.domains.entry(domain).or_insert(0) += matching;
            }
            debug!(
                "Topology group {:?} max skew {} has domains {:?}",
                group.key, group.max_skew, group.domains
            );
        }
        tracker
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, id: usize) -> &TopologyGroup {
        &self.groups[id]
    }

    pub fn group_id(&self, constraint: &TopologySpreadConstraint) -> Option<usize> {
        self.groups.iter().position(|g| g.is_declared_by(constraint))
    }

    /// Groups whose selector matches the pod labels, whether or not the pod declares them.
    pub fn matching_groups(&self, pod: &Pod) -> Vec<usize> {
        (0..self.groups.len())
            .filter(|id| pod.matches_selector(&self.groups[*id].selector))
            .collect()
    }

    /// Placing one more matching pod into `domain` keeps the skew within the group's max skew.
    pub fn is_compatible(&self, group: usize, domain: &str, eligible: Option<&Requirement>) -> bool {
        let group = &self.groups[group];
        let min = group.min_count(eligible);
        (group.count(domain) + 1).saturating_sub(min) <= group.max_skew
    }

    /// Compatible domain with the lowest count among `candidates`, ties broken by name.
    pub fn next_domain(
        &self,
        group: usize,
        candidates: &BTreeSet<String>,
        eligible: Option<&Requirement>,
    ) -> Option<String> {
        candidates
            .iter()
            .filter(|domain| self.is_compatible(group, domain, eligible))
            .min_by_key(|domain| self.groups[group].count(domain))
            .cloned()
    }

    pub fn record(&mut self, group: usize, domain: &str) {
        *self.groups[group]
            .domains
            .entry(domain.to_string())
            .or_insert(0) += 1;
    }

    pub fn unrecord(&mut self, group: usize, domain: &str) {
        if let Some(count) = self.groups[group].domains.get_mut(domain) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn count(&self, group: usize, domain: &str) -> u32 {
        self.groups[group].count(domain)
    }

    /// Difference between the largest and the smallest domain count of a group.
    pub fn skew(&self, group: usize) -> u32 {
        let group = &self.groups[group];
        let max = group.domains.values().copied().max().unwrap_or(0);
        max - group.min_count(None).min(max)
    }
}
