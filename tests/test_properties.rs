mod helpers;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kubernetriks_provisioner::config::ProvisionerConfig;
use kubernetriks_provisioner::core::common::{ResourceList, RESOURCE_CPU};
use kubernetriks_provisioner::core::instance_type::InstanceType;
use kubernetriks_provisioner::core::labels::LABEL_TOPOLOGY_ZONE;
use kubernetriks_provisioner::core::pod::{
    HostPort, Pod, Protocol, TopologySpreadConstraint, WhenUnsatisfiable,
};
use kubernetriks_provisioner::scheduling::errors::PodError;
use kubernetriks_provisioner::scheduling::pod_data::PodData;
use kubernetriks_provisioner::scheduling::results::Interruption;
use kubernetriks_provisioner::scheduling::scheduler::{SolveContext, SolveState};
use kubernetriks_provisioner::scheduling::strategy::{BestFitStrategy, PlacementStrategy};
use kubernetriks_provisioner::test_util::helpers::{
    catalog, instance_type, node_pool, offering, pod, with_labels,
};

use helpers::{
    check_exclusivity, claim_label, claim_pod_keys, engine, engine_with_config, pending,
};

fn sized_instance_types(count: u64) -> Vec<InstanceType> {
    (1..=count)
        .map(|i| {
            instance_type(
                &format!("m{:02}", i),
                1000 * i,
                1024 * i,
                vec![offering("z1", 0.1 * i as f64)],
            )
        })
        .collect()
}

#[test]
fn test_ledger_never_goes_below_zero() {
    let mut pool = node_pool("limited", 0);
    pool.spec.limits = Some(ResourceList::from_pairs(&[(RESOURCE_CPU, 3000)]));
    let catalog = catalog(vec![(
        pool,
        vec![
            instance_type("small", 1000, 4096, vec![offering("z1", 0.1)]),
            instance_type("large", 2000, 4096, vec![offering("z1", 0.2)]),
        ],
    )]);
    let pods: Vec<Pod> = (0..5).map(|i| pod(&format!("pod_{}", i), 900, 128)).collect();
    let input = pending(pods);
    let decision = engine(catalog).compute_scheduling_decision(&input).unwrap();

    check_exclusivity(&input, &decision);
    let charged: u64 = decision
        .new_node_claims
        .iter()
        .map(|c| {
            ResourceList::max_of(c.instance_type_options.iter().map(|it| &it.capacity))
                .get(RESOURCE_CPU)
        })
        .sum();
    assert!(charged <= 3000);
    assert_eq!(3, decision.new_node_claims.iter().map(|c| c.pods.len()).sum::<usize>());
    assert_eq!(2, decision.pod_errors.len());
    assert!(decision.pod_errors.values().all(|e| e.is_limit_exceeded()));

    // Only one of two instance types still fits the limits when the second claim opens.
    let second: Vec<&str> = decision.new_node_claims[1]
        .instance_type_options
        .iter()
        .map(|it| it.name.as_str())
        .collect();
    assert_eq!(vec!["small"], second);
}

#[test]
fn test_options_are_narrowed_and_truncated() {
    let mut config = ProvisionerConfig::default();
    config.max_instance_types = 3;
    let catalog = catalog(vec![(node_pool("default", 0), sized_instance_types(10))]);
    let pods: Vec<Pod> = (0..4).map(|i| pod(&format!("pod_{}", i), 1500, 512)).collect();
    let input = pending(pods);
    let (engine, _) = engine_with_config(catalog, &config);
    let decision = engine.compute_scheduling_decision(&input).unwrap();

    check_exclusivity(&input, &decision);
    assert!(decision.pod_errors.is_empty());
    for claim in decision.new_node_claims.iter() {
        assert!(claim.instance_type_options.len() <= 3);
        assert!(claim.instance_type_options.len() <= claim.initial_instance_type_count);
        for it in claim.instance_type_options.iter() {
            assert!(claim.requests.fits(&it.capacity));
        }
    }
    // Cheapest options which fit all four pods.
    assert_eq!(1, decision.new_node_claims.len());
    let names: Vec<&str> = decision.new_node_claims[0]
        .instance_type_options
        .iter()
        .map(|it| it.name.as_str())
        .collect();
    assert_eq!(vec!["m06", "m07", "m08"], names);
    assert_eq!(10, decision.new_node_claims[0].initial_instance_type_count);
}

#[test]
fn test_spread_stays_within_max_skew() {
    let catalog = catalog(vec![(
        node_pool("default", 0),
        vec![instance_type(
            "m",
            8000,
            8192,
            vec![offering("z1", 1.0), offering("z2", 1.0), offering("z3", 1.0)],
        )],
    )]);
    let pods: Vec<Pod> = (0..7)
        .map(|i| {
            let mut p = with_labels(pod(&format!("web_{}", i), 100, 128), &[("app", "web")]);
            p.spec.topology_spread_constraints = vec![TopologySpreadConstraint {
                topology_key: LABEL_TOPOLOGY_ZONE.to_string(),
                max_skew: 1,
                when_unsatisfiable: WhenUnsatisfiable::DoNotSchedule,
                label_selector: BTreeMap::from([("app".to_string(), "web".to_string())]),
            }];
            p
        })
        .collect();
    let input = pending(pods);
    let decision = engine(catalog).compute_scheduling_decision(&input).unwrap();

    check_exclusivity(&input, &decision);
    assert!(decision.pod_errors.is_empty());
    let mut per_zone: BTreeMap<String, usize> = BTreeMap::new();
    for claim in decision.new_node_claims.iter() {
        let zone = claim_label(claim, LABEL_TOPOLOGY_ZONE).unwrap();
        *per_zone.entry(zone).or_insert(0) += claim.pods.len();
    }
    assert_eq!(3, per_zone.len());
    let max = per_zone.values().max().unwrap();
    let min = per_zone.values().min().unwrap();
    assert!(max - min <= 1);
    assert_eq!(3, decision.new_node_claims.len());
}

#[test]
fn test_host_port_conflict_opens_new_claim() {
    let catalog = catalog(vec![(
        node_pool("default", 0),
        vec![instance_type("m", 4000, 4096, vec![offering("z1", 1.0)])],
    )]);
    let with_port = |name: &str| {
        let mut p = pod(name, 100, 128);
        p.spec.host_ports = vec![HostPort {
            port: 8080,
            protocol: Protocol::TCP,
            ip: String::new(),
        }];
        p
    };
    let input = pending(vec![with_port("a"), with_port("b"), pod("c", 100, 128)]);
    let decision = engine(catalog).compute_scheduling_decision(&input).unwrap();

    check_exclusivity(&input, &decision);
    assert_eq!(2, decision.new_node_claims.len());
    assert_eq!(2, decision.new_node_claims[0].pods.len());
    assert_eq!(1, decision.new_node_claims[1].pods.len());
}

#[test]
fn test_replay_gives_same_decision() {
    let catalog = catalog(vec![
        (node_pool("general", 10), sized_instance_types(4)),
        (node_pool("spare", 0), sized_instance_types(2)),
    ]);
    let pods: Vec<Pod> = (0..20)
        .map(|i| pod(&format!("pod_{}", i), 300 + 50 * (i % 5), 256))
        .collect();
    let input = pending(pods);
    let engine = engine(catalog);

    let first = engine.compute_scheduling_decision(&input).unwrap();
    let second = engine.compute_scheduling_decision(&input).unwrap();
    assert_ne!(first.scheduling_id, second.scheduling_id);
    assert_eq!(first.new_node_claims, second.new_node_claims);
    assert_eq!(first.existing_nodes, second.existing_nodes);
    assert_eq!(first.pod_errors, second.pod_errors);

    // A clone of the engine shares the catalog and decides the same way.
    let cloned = engine.clone();
    let third = cloned.compute_scheduling_decision(&input).unwrap();
    assert!(Arc::ptr_eq(engine.catalog(), cloned.catalog()));
    assert_eq!(first.new_node_claims, third.new_node_claims);
}

#[test]
fn test_deadline_keeps_pods_remaining() {
    let mut config = ProvisionerConfig::default();
    config.solve_timeout = 0.0;
    let catalog = catalog(vec![(node_pool("default", 0), sized_instance_types(2))]);
    let input = pending(vec![pod("a", 100, 128), pod("b", 100, 128)]);
    let (engine, _) = engine_with_config(catalog, &config);
    let decision = engine.compute_scheduling_decision(&input).unwrap();

    check_exclusivity(&input, &decision);
    assert_eq!(Some(Interruption::DeadlineExceeded), decision.interruption);
    assert_eq!(2, decision.pods_remaining.len());
    assert!(decision.pod_errors.is_empty());
    assert!(decision.new_node_claims.is_empty());
}

#[test]
fn test_cancelled_solve() {
    let catalog = catalog(vec![(node_pool("default", 0), sized_instance_types(2))]);
    let input = pending(vec![pod("a", 100, 128)]);
    let engine = engine(catalog);

    let ctx = SolveContext::new().with_cancel_flag(Arc::new(AtomicBool::new(true)));
    let decision = engine
        .compute_scheduling_decision_with_context(&input, &ctx)
        .unwrap();
    assert_eq!(Some(Interruption::Cancelled), decision.interruption);
    assert_eq!(1, decision.pods_remaining.len());

    let ctx = SolveContext::new()
        .with_cancel_flag(Arc::new(AtomicBool::new(false)))
        .with_timeout(Duration::from_secs(60));
    let decision = engine
        .compute_scheduling_decision_with_context(&input, &ctx)
        .unwrap();
    assert_eq!(None, decision.interruption);
    assert!(decision.pods_remaining.is_empty());
    assert_eq!(1, decision.new_node_claims.len());
}

/// Best fit which trips the cancel flag once a pod has been placed.
#[derive(Clone)]
struct CancelAfterPlacement {
    cancelled: Arc<AtomicBool>,
}

impl PlacementStrategy for CancelAfterPlacement {
    fn name(&self) -> &'static str {
        "cancel_after_placement"
    }

    fn add_workload_to_claim(
        &self,
        state: &mut SolveState,
        pod: &Pod,
        pod_data: &PodData,
    ) -> Result<(), PodError> {
        let result = BestFitStrategy.add_workload_to_claim(state, pod, pod_data);
        if result.is_ok() {
            self.cancelled.store(true, Ordering::Relaxed);
        }
        result
    }
}

#[test]
fn test_cancel_during_solve_keeps_committed_claims() {
    let catalog = catalog(vec![(node_pool("default", 0), sized_instance_types(2))]);
    let input = pending(vec![
        pod("a", 100, 128),
        pod("b", 100, 128),
        pod("c", 100, 128),
    ]);
    let cancelled = Arc::new(AtomicBool::new(false));
    let engine = engine(catalog).with_strategy(Box::new(CancelAfterPlacement {
        cancelled: cancelled.clone(),
    }));

    let ctx = SolveContext::new().with_cancel_flag(cancelled);
    let decision = engine
        .compute_scheduling_decision_with_context(&input, &ctx)
        .unwrap();

    check_exclusivity(&input, &decision);
    assert_eq!(Some(Interruption::Cancelled), decision.interruption);
    assert_eq!(1, decision.new_node_claims.len());
    assert_eq!(
        vec!["a".to_string()],
        claim_pod_keys(&decision.new_node_claims[0])
    );
    let remaining: Vec<&str> = decision.pods_remaining.iter().map(|p| p.key()).collect();
    assert_eq!(vec!["b", "c"], remaining);
    assert!(decision.pod_errors.is_empty());
}
