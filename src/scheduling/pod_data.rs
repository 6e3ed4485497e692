//! Data derived from a pod once per scheduling simulation.

use log::debug;

use crate::core::common::ResourceList;
use crate::core::pod::{HostPort, Pod, TopologySpreadConstraint, WhenUnsatisfiable};
use crate::core::requirements::{NodeSelectorRequirement, Requirements};

#[derive(Debug, Clone, PartialEq)]
pub struct PodData {
    pub requests: ResourceList,
    /// Required node requirements plus preferences which are still in effect.
    pub requirements: Requirements,
    pub strict_requirements: Requirements,
    /// Preferred requirements still in effect, most important first.
    pub preferences: Vec<NodeSelectorRequirement>,
    pub host_ports: Vec<HostPort>,
    /// Spread constraints still in effect, soft ones included until relaxed.
    pub spread_constraints: Vec<TopologySpreadConstraint>,
}

impl PodData {
    pub fn new(pod: &Pod, ignore_preferences: bool) -> Self {
        let strict_requirements = Requirements::from_selectors(&pod.spec.node_requirements);
        let preferences = if ignore_preferences {
            vec![]
        } else {
            pod.spec.preferred_node_requirements.clone()
        };
        let spread_constraints = pod
            .spec
            .topology_spread_constraints
            .iter()
            .filter(|c| {
                !(ignore_preferences && c.when_unsatisfiable == WhenUnsatisfiable::ScheduleAnyway)
            })
            .cloned()
            .collect();

        let mut data = Self {
            requests: pod.spec.resources.requests.clone(),
            requirements: Requirements::new(),
            strict_requirements,
            preferences,
            host_ports: pod.spec.host_ports.clone(),
            spread_constraints,
        };
        data.rebuild_requirements();
        data
    }

    fn rebuild_requirements(&mut self) {
        let mut requirements = self.strict_requirements.clone();
        requirements.extend(&Requirements::from_selectors(&self.preferences));
        self.requirements = requirements;
    }

    /// Drops the least important preference. Returns false if there was nothing left to relax.
    pub fn relax(&mut self, pod_key: &str) -> bool {
        if let Some(dropped) = self.preferences.pop() {
            debug!("Relaxing preferred requirement {:?} of pod {:?}", dropped.key, pod_key);
            self.rebuild_requirements();
            return true;
        }
        if let Some(idx) = self
            .spread_constraints
            .iter()
            .rposition(|c| c.when_unsatisfiable == WhenUnsatisfiable::ScheduleAnyway)
        {
            let dropped = self.spread_constraints.remove(idx);
            debug!(
                "Relaxing topology spread constraint {:?} of pod {:?}",
                dropped.topology_key, pod_key
            );
            return true;
        }
        false
    }
}
