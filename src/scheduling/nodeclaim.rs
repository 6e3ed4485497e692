//! Node claim: a node which does not exist yet and is being built up pod by pod during one
//! scheduling simulation.
//!
//! A claim starts with every instance type of its template that fits the node pool budget and
//! narrows the options with every pod it accepts. Adding a pod either commits completely or leaves
//! the claim untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;

use crate::core::common::{ResourceList, RESOURCE_CPU, RESOURCE_MEMORY};
use crate::core::instance_type::{CapacityType, InstanceType};
use crate::core::labels::{LABEL_CAPACITY_TYPE, LABEL_HOSTNAME};
use crate::core::pod::Pod;
use crate::core::requirements::{Operator, Requirement, Requirements};
use crate::scheduling::errors::{ClaimError, OptionFilter};
use crate::scheduling::host_ports::HostPortUsage;
use crate::scheduling::options::{MinValuesPolicy, ReservedOfferingMode};
use crate::scheduling::pod_data::PodData;
use crate::scheduling::reservation::{ReservationManager, ReservationOutcome};
use crate::scheduling::template::NodeClaimTemplate;
use crate::scheduling::topology::TopologyTracker;

/// Values label `key` may take on a node launched from one of `options`.
pub fn possible_domains(
    key: &str,
    requirements: &Requirements,
    options: &[Arc<InstanceType>],
) -> BTreeSet<String> {
    if options.iter().any(|it| it.defines_label(key)) {
        return options
            .iter()
            .filter(|it| it.defines_label(key))
            .flat_map(|it| it.label_values(key, requirements))
            .collect();
    }
    requirements
        .get(key)
        .and_then(|r| r.values())
        .cloned()
        .unwrap_or_default()
}

/// Checks every requirement with `min_values` against the distinct values `options` still offer.
pub fn check_min_values(
    options: &[Arc<InstanceType>],
    requirements: &Requirements,
    policy: MinValuesPolicy,
) -> Result<(), ClaimError> {
    for requirement in requirements.iter() {
        let Some(min_values) = requirement.min_values else {
            continue;
        };
        let available = possible_domains(&requirement.key, requirements, options).len();
        if available >= min_values {
            continue;
        }
        match policy {
            MinValuesPolicy::Strict => {
                return Err(ClaimError::MinValues {
                    key: requirement.key.clone(),
                    min_values,
                    available,
                })
            }
            MinValuesPolicy::BestEffort => debug!(
                "Relaxing min values of {:?}: need {} got {}",
                requirement.key, min_values, available
            ),
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NodeClaim {
    pub hostname: String,
    pub node_pool: String,
    pub requirements: Requirements,
    pub instance_type_options: Vec<Arc<InstanceType>>,
    initial_option_count: usize,
    pub pods: Vec<Pod>,
    /// Daemon overhead plus requests of every placed pod.
    pub requests: ResourceList,
    pub daemon_overhead: ResourceList,
    host_ports: HostPortUsage,
    topology_records: Vec<(usize, String)>,
    finalized: bool,
}

impl NodeClaim {
    /// `options` are the template options which fit the remaining budget of the node pool.
    pub fn new(
        template: &NodeClaimTemplate,
        hostname: String,
        options: Vec<Arc<InstanceType>>,
    ) -> Self {
        let mut requirements = template.requirements.clone();
        requirements.add(Requirement::new(
            LABEL_HOSTNAME,
            Operator::In,
            [hostname.as_str()],
        ));
        Self {
            hostname,
            node_pool: template.node_pool.clone(),
            requirements,
            initial_option_count: options.len(),
            instance_type_options: options,
            pods: Vec::new(),
            requests: template.daemon_overhead.clone(),
            daemon_overhead: template.daemon_overhead.clone(),
            host_ports: HostPortUsage::from_ports(&template.daemon_host_ports),
            topology_records: Vec::new(),
            finalized: false,
        }
    }

    pub fn initial_option_count(&self) -> usize {
        self.initial_option_count
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn no_instance_types(
        filter: OptionFilter,
        requests: &ResourceList,
        requirements: &Requirements,
    ) -> ClaimError {
        ClaimError::NoInstanceTypes {
            filter,
            requests: requests.clone(),
            requirements: requirements.to_string(),
        }
    }

    pub fn add(
        &mut self,
        pod: &Pod,
        pod_data: &PodData,
        topology: &mut TopologyTracker,
        reservations: &mut ReservationManager,
        min_values_policy: MinValuesPolicy,
    ) -> Result<(), ClaimError> {
        let options = &self.instance_type_options;
        self.requirements
            .compatible_with(&pod_data.requirements, |key| {
                options.iter().any(|it| it.defines_label(key))
            })
            .map_err(ClaimError::IncompatibleRequirements)?;
        let mut requirements = self.requirements.clone();
        requirements.extend(&pod_data.requirements);

        self.host_ports
            .conflicts(&pod_data.host_ports)
            .map_err(ClaimError::HostPortConflict)?;

        let requests = self.requests.merged(&pod_data.requests);
        let compatible: Vec<Arc<InstanceType>> = self
            .instance_type_options
            .iter()
            .filter(|it| it.compatible(&requirements))
            .cloned()
            .collect();
        if compatible.is_empty() {
            return Err(Self::no_instance_types(
                OptionFilter::Requirements,
                &pod_data.requests,
                &requirements,
            ));
        }
        let mut options: Vec<Arc<InstanceType>> = compatible
            .into_iter()
            .filter(|it| requests.fits(&it.allocatable()))
            .collect();
        if options.is_empty() {
            return Err(Self::no_instance_types(
                OptionFilter::Resources,
                &pod_data.requests,
                &requirements,
            ));
        }

        let granted = self.filter_reservations(
            &mut options,
            &mut requirements,
            reservations,
            &pod_data.requests,
        )?;

        let records = self.pin_topology(pod, pod_data, &mut options, &mut requirements, topology)?;

        check_min_values(&options, &requirements, min_values_policy)?;

        let reservation_ids: BTreeSet<String> = options
            .iter()
            .flat_map(|it| it.compatible_offerings(&requirements))
            .filter_map(|o| o.reservation_id.clone())
            .filter(|id| granted.contains(id))
            .collect();
        reservations.commit(&self.hostname, &reservation_ids);
        for (group, domain) in records.iter() {
            topology.record(*group, domain);
        }
        self.topology_records.extend(records);
        self.instance_type_options = options;
        self.requirements = requirements;
        self.requests = requests;
        self.host_ports.add(&pod_data.host_ports);
        self.pods.push(pod.clone());
        Ok(())
    }

    /// Narrows `options` according to the reserved offering mode. Returns reservations which
    /// granted a unit to this claim.
    fn filter_reservations(
        &self,
        options: &mut Vec<Arc<InstanceType>>,
        requirements: &mut Requirements,
        reservations: &ReservationManager,
        pod_requests: &ResourceList,
    ) -> Result<BTreeSet<String>, ClaimError> {
        let mut granted = BTreeSet::new();
        if reservations.mode() == ReservedOfferingMode::Disabled {
            return Ok(granted);
        }

        let mut reserved_options = Vec::new();
        let mut any_reserved = false;
        let mut exhausted = false;
        for it in options.iter() {
            let mut any_granted = false;
            for offering in it.compatible_offerings(requirements).filter(|o| o.is_reserved()) {
                any_reserved = true;
                match reservations.try_reserve(&self.hostname, &self.node_pool, it, offering) {
                    ReservationOutcome::Granted => {
                        any_granted = true;
                        granted.extend(offering.reservation_id.iter().cloned());
                    }
                    ReservationOutcome::FallbackRequired => {}
                    ReservationOutcome::Exhausted => exhausted = true,
                }
            }
            if any_granted {
                reserved_options.push(it.clone());
            }
        }

        let reserved = CapacityType::Reserved.as_str();
        if !any_reserved && reservations.mode() == ReservedOfferingMode::BestEffort {
            return Ok(granted);
        }
        if !reserved_options.is_empty() {
            requirements.add(Requirement::new(LABEL_CAPACITY_TYPE, Operator::In, [reserved]));
            *options = reserved_options;
            return Ok(granted);
        }
        if exhausted {
            return Err(ClaimError::ReservedOffering(format!(
                "reserved offerings compatible with nodepool {:?} are exhausted and fallback is not allowed",
                self.node_pool
            )));
        }
        if reservations.mode() == ReservedOfferingMode::Strict {
            return Err(Self::no_instance_types(
                OptionFilter::Reservations,
                pod_requests,
                requirements,
            ));
        }

        requirements.add(Requirement::new(LABEL_CAPACITY_TYPE, Operator::NotIn, [reserved]));
        options.retain(|it| it.compatible(requirements));
        if options.is_empty() {
            return Err(Self::no_instance_types(
                OptionFilter::Reservations,
                pod_requests,
                requirements,
            ));
        }
        Ok(granted)
    }

    /// Picks a domain for every spread constraint of the pod and pins the claim to it. Returns the
    /// topology records to make on commit.
    fn pin_topology(
        &self,
        pod: &Pod,
        pod_data: &PodData,
        options: &mut Vec<Arc<InstanceType>>,
        requirements: &mut Requirements,
        topology: &TopologyTracker,
    ) -> Result<Vec<(usize, String)>, ClaimError> {
        let mut records = Vec::new();
        if topology.is_empty() {
            return Ok(records);
        }

        let mut declared = Vec::new();
        for constraint in pod_data.spread_constraints.iter() {
            let Some(group) = topology.group_id(constraint) else {
                continue;
            };
            declared.push(group);
            let key = constraint.topology_key.as_str();
            let candidates = possible_domains(key, requirements, options);
            let Some(domain) =
                topology.next_domain(group, &candidates, pod_data.requirements.get(key))
            else {
                return Err(ClaimError::TopologySpread {
                    key: key.to_string(),
                    max_skew: constraint.max_skew,
                });
            };

            requirements.add(Requirement::new(key, Operator::In, [domain.as_str()]));
            options.retain(|it| {
                !it.defines_label(key) || it.label_values(key, requirements).contains(&domain)
            });
            if options.is_empty() {
                return Err(Self::no_instance_types(
                    OptionFilter::TopologySpread,
                    &pod_data.requests,
                    requirements,
                ));
            }
            if pod.matches_selector(&topology.group(group).selector) {
                records.push((group, domain));
            }
        }

        // Pods counted by groups they do not declare, once the claim domain is known.
        for group in topology.matching_groups(pod) {
            if declared.contains(&group) {
                continue;
            }
            let key = &topology.group(group).key;
            if let Some(domain) = requirements.get(key).and_then(|r| r.single_value()) {
                records.push((group, domain.to_string()));
            }
        }
        Ok(records)
    }

    /// Orders options by the cheapest compatible offering, then by name.
    pub fn finalize_scheduling(&mut self) {
        let requirements = &self.requirements;
        self.instance_type_options.sort_by(|a, b| {
            let price_a = a.cheapest_price(requirements).unwrap_or(f64::INFINITY);
            let price_b = b.cheapest_price(requirements).unwrap_or(f64::INFINITY);
            price_a.total_cmp(&price_b).then(a.name.cmp(&b.name))
        });
        self.finalized = true;
    }

    /// Gives back everything the claim holds in the topology tracker and reservation manager.
    pub fn destroy(self, topology: &mut TopologyTracker, reservations: &mut ReservationManager) {
        for (group, domain) in self.topology_records.iter() {
            topology.unrecord(*group, domain);
        }
        reservations.release(&self.hostname);
        debug!(
            "Destroyed node claim {:?} of nodepool {:?} with {} pods",
            self.hostname,
            self.node_pool,
            self.pods.len()
        );
    }

    /// Largest share of cpu or memory requested relative to the biggest remaining option.
    pub fn utilization(&self) -> f64 {
        let allocatable: Vec<ResourceList> = self
            .instance_type_options
            .iter()
            .map(|it| it.allocatable())
            .collect();
        let max_allocatable = ResourceList::max_of(allocatable.iter());
        [RESOURCE_CPU, RESOURCE_MEMORY]
            .iter()
            .filter(|name| max_allocatable.get(name) > 0)
            .map(|name| self.requests.get(name) as f64 / max_allocatable.get(name) as f64)
            .fold(0.0, f64::max)
    }

    /// Keeps the `max` cheapest options. Fails without changes if fewer options would violate
    /// `min_values` under the strict policy.
    pub fn truncate_options(&mut self, max: usize, policy: MinValuesPolicy) -> Result<(), ClaimError> {
        if !self.finalized {
            self.finalize_scheduling();
        }
        if self.instance_type_options.len() <= max {
            return Ok(());
        }
        let truncated: Vec<Arc<InstanceType>> =
            self.instance_type_options.iter().take(max).cloned().collect();
        check_min_values(&truncated, &self.requirements, policy)?;
        self.instance_type_options = truncated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::NodeClaim;
    use crate::core::common::ResourceList;
    use crate::core::instance_type::InstanceType;
    use crate::core::labels::{LABEL_INSTANCE_TYPE, LABEL_TOPOLOGY_ZONE};
    use crate::core::pod::{HostPort, Pod, Protocol, TopologySpreadConstraint, WhenUnsatisfiable};
    use crate::core::requirements::{NodeSelectorRequirement, Operator};
    use crate::scheduling::errors::{ClaimError, OptionFilter};
    use crate::scheduling::options::{MinValuesPolicy, SchedulerOptions};
    use crate::scheduling::pod_data::PodData;
    use crate::scheduling::reservation::ReservationManager;
    use crate::scheduling::template::NodeClaimTemplate;
    use crate::scheduling::topology::TopologyTracker;
    use crate::test_util::helpers::{
        instance_type, node_pool, offering, pod, reserved_offering, with_labels,
    };

    struct Fixture {
        template: NodeClaimTemplate,
        topology: TopologyTracker,
        reservations: ReservationManager,
    }

    impl Fixture {
        fn new(types: Vec<InstanceType>, pods: &[Pod], options: &SchedulerOptions) -> Self {
            let template = NodeClaimTemplate::new(&node_pool("default", 0), &types, &[]);
            let topology = TopologyTracker::new(pods, &[], std::slice::from_ref(&template));
            let reservations = ReservationManager::new(
                &BTreeMap::from([("default".to_string(), types)]),
                options,
            );
            Self {
                template,
                topology,
                reservations,
            }
        }

        fn claim(&self, hostname: &str) -> NodeClaim {
            NodeClaim::new(
                &self.template,
                hostname.to_string(),
                self.template.filter_by_remaining(None),
            )
        }

        fn add(&mut self, claim: &mut NodeClaim, pod: &Pod) -> Result<(), ClaimError> {
            let data = PodData::new(pod, false);
            claim.add(
                pod,
                &data,
                &mut self.topology,
                &mut self.reservations,
                MinValuesPolicy::Strict,
            )
        }
    }

    fn three_sizes() -> Vec<InstanceType> {
        vec![
            instance_type("small", 1000, 1024, vec![offering("z1", 1.0)]),
            instance_type("medium", 2000, 2048, vec![offering("z1", 2.0)]),
            instance_type("large", 4000, 4096, vec![offering("z1", 4.0)]),
        ]
    }

    #[test]
    fn test_options_narrow_with_every_pod() {
        let mut fixture = Fixture::new(three_sizes(), &[], &SchedulerOptions::default());
        let mut claim = fixture.claim("claim-1");
        assert_eq!(3, claim.initial_option_count());

        fixture.add(&mut claim, &pod("a", 800, 512)).unwrap();
        assert_eq!(3, claim.instance_type_options.len());
        fixture.add(&mut claim, &pod("b", 800, 512)).unwrap();
        assert_eq!(2, claim.instance_type_options.len());
        fixture.add(&mut claim, &pod("c", 1600, 512)).unwrap();
        assert_eq!(1, claim.instance_type_options.len());
        assert_eq!(ResourceList::cpu_memory(3200, 1536), claim.requests);
    }

    #[test]
    fn test_failed_add_leaves_claim_unchanged() {
        let mut fixture = Fixture::new(three_sizes(), &[], &SchedulerOptions::default());
        let mut claim = fixture.claim("claim-1");
        fixture.add(&mut claim, &pod("a", 3000, 512)).unwrap();
        let before = claim.clone();

        let error = fixture.add(&mut claim, &pod("b", 2000, 512)).unwrap_err();
        assert!(matches!(
            error,
            ClaimError::NoInstanceTypes {
                filter: OptionFilter::Resources,
                ..
            }
        ));
        assert_eq!(before.pods, claim.pods);
        assert_eq!(before.requests, claim.requests);
        assert_eq!(
            before.instance_type_options.len(),
            claim.instance_type_options.len()
        );
    }

    #[test]
    fn test_incompatible_requirements() {
        let mut fixture = Fixture::new(three_sizes(), &[], &SchedulerOptions::default());
        let mut claim = fixture.claim("claim-1");

        let mut custom = pod("custom", 100, 100);
        custom.spec.node_requirements =
            vec![NodeSelectorRequirement::new("team", Operator::In, &["a"])];
        assert!(matches!(
            fixture.add(&mut claim, &custom),
            Err(ClaimError::IncompatibleRequirements(_))
        ));

        let mut pinned = pod("pinned", 100, 100);
        pinned.spec.node_requirements =
            vec![NodeSelectorRequirement::new(LABEL_INSTANCE_TYPE, Operator::In, &["medium"])];
        fixture.add(&mut claim, &pinned).unwrap();
        assert_eq!(1, claim.instance_type_options.len());
        assert_eq!("medium", claim.instance_type_options[0].name);
    }

    #[test]
    fn test_host_port_conflict() {
        let mut fixture = Fixture::new(three_sizes(), &[], &SchedulerOptions::default());
        let mut claim = fixture.claim("claim-1");
        let mut with_port = pod("a", 100, 100);
        with_port.spec.host_ports = vec![HostPort {
            port: 8080,
            protocol: Protocol::TCP,
            ip: String::new(),
        }];
        let mut other = with_port.clone();
        other.metadata.name = "b".to_string();

        fixture.add(&mut claim, &with_port).unwrap();
        assert!(matches!(
            fixture.add(&mut claim, &other),
            Err(ClaimError::HostPortConflict(_))
        ));
    }

    #[test]
    fn test_reserved_offering_is_preferred_then_falls_back() {
        let types = vec![instance_type(
            "m",
            4000,
            4096,
            vec![reserved_offering("z1", 0.1, "r-1", 1), offering("z1", 1.0)],
        )];
        let mut fixture = Fixture::new(types, &[], &SchedulerOptions::default());

        let mut first = fixture.claim("claim-1");
        fixture.add(&mut first, &pod("a", 1000, 1000)).unwrap();
        assert_eq!(0, fixture.reservations.remaining("r-1"));
        assert!(first
            .requirements
            .get(crate::core::labels::LABEL_CAPACITY_TYPE)
            .unwrap()
            .has("reserved"));

        let mut second = fixture.claim("claim-2");
        fixture.add(&mut second, &pod("b", 1000, 1000)).unwrap();
        assert!(!second
            .requirements
            .get(crate::core::labels::LABEL_CAPACITY_TYPE)
            .unwrap()
            .has("reserved"));

        first.destroy(&mut fixture.topology, &mut fixture.reservations);
        assert_eq!(1, fixture.reservations.remaining("r-1"));
    }

    #[test]
    fn test_reserved_offering_error_without_fallback() {
        let types = vec![instance_type(
            "m",
            4000,
            4096,
            vec![reserved_offering("z1", 0.1, "r-1", 1), offering("z1", 1.0)],
        )];
        let options = SchedulerOptions {
            disable_reserved_capacity_fallback: true,
            ..Default::default()
        };
        let mut fixture = Fixture::new(types, &[], &options);

        let mut first = fixture.claim("claim-1");
        fixture.add(&mut first, &pod("a", 1000, 1000)).unwrap();
        let mut second = fixture.claim("claim-2");
        let error = fixture.add(&mut second, &pod("b", 1000, 1000)).unwrap_err();
        assert!(error.is_reserved_offering_error());
        assert!(second.pods.is_empty());
    }

    #[test]
    fn test_topology_pins_zone() {
        let types = vec![
            instance_type("m", 4000, 4096, vec![offering("z1", 1.0), offering("z2", 1.0)]),
            instance_type("z2-only", 4000, 4096, vec![offering("z2", 1.0)]),
        ];
        let mut spread_pod = with_labels(pod("a", 100, 100), &[("app", "web")]);
        spread_pod.spec.topology_spread_constraints = vec![TopologySpreadConstraint {
            topology_key: LABEL_TOPOLOGY_ZONE.to_string(),
            max_skew: 1,
            when_unsatisfiable: WhenUnsatisfiable::DoNotSchedule,
            label_selector: BTreeMap::from([("app".to_string(), "web".to_string())]),
        }];
        let mut second_pod = spread_pod.clone();
        second_pod.metadata.name = "b".to_string();
        let pods = vec![spread_pod.clone(), second_pod.clone()];
        let mut fixture = Fixture::new(types, &pods, &SchedulerOptions::default());

        let mut first = fixture.claim("claim-1");
        fixture.add(&mut first, &spread_pod).unwrap();
        assert_eq!(
            Some("z1"),
            first
                .requirements
                .get(LABEL_TOPOLOGY_ZONE)
                .and_then(|r| r.single_value())
        );
        assert_eq!(1, first.instance_type_options.len());

        // The same claim cannot take a second pod of the group: z1 would lead by two.
        assert!(matches!(
            fixture.add(&mut first, &second_pod),
            Err(ClaimError::TopologySpread { .. })
        ));

        let mut second = fixture.claim("claim-2");
        fixture.add(&mut second, &second_pod).unwrap();
        assert_eq!(
            Some("z2"),
            second
                .requirements
                .get(LABEL_TOPOLOGY_ZONE)
                .and_then(|r| r.single_value())
        );
    }

    #[test]
    fn test_destroy_unrecords_topology() {
        let types = vec![instance_type(
            "m",
            4000,
            4096,
            vec![offering("z1", 1.0), offering("z2", 1.0)],
        )];
        let constraint = TopologySpreadConstraint {
            topology_key: LABEL_TOPOLOGY_ZONE.to_string(),
            max_skew: 1,
            when_unsatisfiable: WhenUnsatisfiable::DoNotSchedule,
            label_selector: BTreeMap::from([("app".to_string(), "web".to_string())]),
        };
        let mut first_pod = with_labels(pod("a", 100, 100), &[("app", "web")]);
        first_pod.spec.topology_spread_constraints = vec![constraint.clone()];
        let mut second_pod = first_pod.clone();
        second_pod.metadata.name = "b".to_string();
        let pods = vec![first_pod.clone(), second_pod.clone()];
        let mut fixture = Fixture::new(types, &pods, &SchedulerOptions::default());
        let group = fixture.topology.group_id(&constraint).unwrap();

        let mut first = fixture.claim("claim-1");
        fixture.add(&mut first, &first_pod).unwrap();
        assert_eq!(1, fixture.topology.count(group, "z1"));

        first.destroy(&mut fixture.topology, &mut fixture.reservations);
        assert_eq!(0, fixture.topology.count(group, "z1"));
        assert_eq!(0, fixture.topology.skew(group));

        // With z1 empty again the next claim of the group lands there.
        let mut second = fixture.claim("claim-2");
        fixture.add(&mut second, &second_pod).unwrap();
        assert_eq!(
            Some("z1"),
            second
                .requirements
                .get(LABEL_TOPOLOGY_ZONE)
                .and_then(|r| r.single_value())
        );
    }

    #[test]
    fn test_min_values_policy() {
        let mut pool = node_pool("default", 0);
        let mut requirement = NodeSelectorRequirement::new(LABEL_INSTANCE_TYPE, Operator::Exists, &[]);
        requirement.min_values = Some(2);
        pool.spec.requirements = vec![requirement];
        let template = NodeClaimTemplate::new(&pool, &three_sizes(), &[]);
        let mut topology = TopologyTracker::default();
        let mut reservations = ReservationManager::new(&BTreeMap::new(), &SchedulerOptions::default());

        let big = pod("big", 3000, 100);
        let data = PodData::new(&big, false);
        let mut claim = NodeClaim::new(&template, "claim-1".to_string(), template.filter_by_remaining(None));
        let error = claim
            .add(&big, &data, &mut topology, &mut reservations, MinValuesPolicy::Strict)
            .unwrap_err();
        assert_eq!(
            ClaimError::MinValues {
                key: LABEL_INSTANCE_TYPE.to_string(),
                min_values: 2,
                available: 1,
            },
            error
        );

        claim
            .add(&big, &data, &mut topology, &mut reservations, MinValuesPolicy::BestEffort)
            .unwrap();
        assert_eq!(1, claim.instance_type_options.len());
    }

    #[test]
    fn test_finalize_orders_by_price_and_truncates() {
        let mut fixture = Fixture::new(
            vec![
                instance_type("b", 4000, 4096, vec![offering("z1", 2.0)]),
                instance_type("c", 4000, 4096, vec![offering("z1", 1.0)]),
                instance_type("a", 4000, 4096, vec![offering("z1", 2.0)]),
            ],
            &[],
            &SchedulerOptions::default(),
        );
        let mut claim = fixture.claim("claim-1");
        fixture.add(&mut claim, &pod("p", 100, 100)).unwrap();
        claim.finalize_scheduling();
        assert!(claim.is_finalized());

        let names: Vec<&str> = claim
            .instance_type_options
            .iter()
            .map(|it| it.name.as_str())
            .collect();
        assert_eq!(vec!["c", "a", "b"], names);

        claim.truncate_options(2, MinValuesPolicy::Strict).unwrap();
        assert_eq!(2, claim.instance_type_options.len());
    }
}
