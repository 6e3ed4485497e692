//! Node claim templates: the per node pool starting point of every new node claim.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::core::common::ResourceList;
use crate::core::instance_type::InstanceType;
use crate::core::labels::LABEL_NODE_POOL;
use crate::core::node_pool::NodePool;
use crate::core::pod::{HostPort, Pod};
use crate::core::requirements::{Operator, Requirement, Requirements};
use crate::metrics::sink::MetricsSink;

#[derive(Debug, Clone)]
pub struct NodeClaimTemplate {
    pub node_pool: String,
    pub weight: i32,
    /// Node pool requirements, its labels and the node pool label itself.
    pub requirements: Requirements,
    pub labels: BTreeMap<String, String>,
    pub instance_type_options: Vec<Arc<InstanceType>>,
    /// Requests of daemon pods which would run on every node of the template.
    pub daemon_overhead: ResourceList,
    pub daemon_host_ports: Vec<HostPort>,
}

impl NodeClaimTemplate {
    pub fn new(node_pool: &NodePool, instance_types: &[InstanceType], daemon_set_pods: &[Pod]) -> Self {
        let mut requirements = Requirements::from_selectors(&node_pool.spec.requirements);
        requirements.extend(&Requirements::from_labels(&node_pool.spec.labels));
        requirements.add(Requirement::new(
            LABEL_NODE_POOL,
            Operator::In,
            [node_pool.name()],
        ));

        let instance_type_options: Vec<Arc<InstanceType>> = instance_types
            .iter()
            .filter(|it| it.compatible(&requirements))
            .cloned()
            .map(Arc::new)
            .collect();

        let mut labels = node_pool.spec.labels.clone();
        labels.insert(LABEL_NODE_POOL.to_string(), node_pool.name().to_string());

        let mut daemon_overhead = ResourceList::new();
        let mut daemon_host_ports = Vec::new();
        for daemon in daemon_set_pods.iter() {
            let daemon_requirements = Requirements::from_selectors(&daemon.spec.node_requirements);
            if requirements.compatible(&daemon_requirements).is_err() {
                continue;
            }
            daemon_overhead.add(&daemon.spec.resources.requests);
            daemon_host_ports.extend(daemon.spec.host_ports.iter().cloned());
        }

        Self {
            node_pool: node_pool.name().to_string(),
            weight: node_pool.spec.weight,
            requirements,
            labels,
            instance_type_options,
            daemon_overhead,
            daemon_host_ports,
        }
    }

    /// Options whose capacity fits the remaining budget of every limited resource. `None` means the
    /// node pool has no limits.
    pub fn filter_by_remaining(&self, remaining: Option<&ResourceList>) -> Vec<Arc<InstanceType>> {
        let Some(remaining) = remaining else {
            return self.instance_type_options.clone();
        };
        self.instance_type_options
            .iter()
            .filter(|it| {
                remaining
                    .iter()
                    .all(|(name, left)| it.capacity.get(name) <= *left)
            })
            .cloned()
            .collect()
    }
}

/// Templates of node pools with at least one compatible instance type, highest weight first then
/// by name.
pub fn build_templates(
    node_pools: &[NodePool],
    instance_types: &BTreeMap<String, Vec<InstanceType>>,
    daemon_set_pods: &[Pod],
    metrics: &mut dyn MetricsSink,
) -> Vec<NodeClaimTemplate> {
    let mut templates: Vec<NodeClaimTemplate> = Vec::with_capacity(node_pools.len());
    for node_pool in node_pools.iter() {
        let pool_instance_types = instance_types
            .get(node_pool.name())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let template = NodeClaimTemplate::new(node_pool, pool_instance_types, daemon_set_pods);
        if template.instance_type_options.is_empty() {
            warn!(
                "Skipping nodepool {:?}: no instance type satisfies requirements {}",
                node_pool.name(),
                template.requirements
            );
            metrics.record_no_compatible_instance_types(node_pool.name());
            continue;
        }
        debug!(
            "Nodepool {:?} template with {} instance types, daemon overhead {}",
            template.node_pool,
            template.instance_type_options.len(),
            template.daemon_overhead
        );
        templates.push(template);
    }
    templates.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.node_pool.cmp(&b.node_pool)));
    templates
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{build_templates, NodeClaimTemplate};
    use crate::core::common::ResourceList;
    use crate::core::labels::LABEL_ARCH;
    use crate::core::requirements::{NodeSelectorRequirement, Operator};
    use crate::metrics::sink::NoopMetricsSink;
    use crate::test_util::helpers::{instance_type, node_pool, offering, pod, with_arch};

    #[test]
    fn test_instance_types_are_filtered_by_requirements() {
        let mut pool = node_pool("arm", 10);
        pool.spec.requirements = vec![NodeSelectorRequirement::new(LABEL_ARCH, Operator::In, &["arm64"])];
        let types = vec![
            with_arch(instance_type("a.large", 2000, 4096, vec![offering("z1", 1.0)]), "arm64"),
            with_arch(instance_type("x.large", 2000, 4096, vec![offering("z1", 1.0)]), "amd64"),
        ];

        let template = NodeClaimTemplate::new(&pool, &types, &[]);
        let names: Vec<&str> = template
            .instance_type_options
            .iter()
            .map(|it| it.name.as_str())
            .collect();
        assert_eq!(vec!["a.large"], names);
    }

    #[test]
    fn test_daemon_overhead_counts_compatible_daemons() {
        let pool = node_pool("default", 0);
        let types = vec![instance_type("m", 4000, 8192, vec![offering("z1", 1.0)])];
        let mut gpu_daemon = pod("gpu-daemon", 500, 500);
        gpu_daemon.spec.node_requirements =
            vec![NodeSelectorRequirement::new("gpu", Operator::In, &["true"])];
        let daemons = vec![pod("logger", 100, 200), gpu_daemon];

        let template = NodeClaimTemplate::new(&pool, &types, &daemons);
        assert_eq!(ResourceList::cpu_memory(100, 200), template.daemon_overhead);
    }

    #[test]
    fn test_filter_by_remaining() {
        let pool = node_pool("default", 0);
        let types = vec![
            instance_type("small", 1000, 1024, vec![offering("z1", 1.0)]),
            instance_type("large", 4000, 4096, vec![offering("z1", 2.0)]),
        ];
        let template = NodeClaimTemplate::new(&pool, &types, &[]);

        assert_eq!(2, template.filter_by_remaining(None).len());
        let remaining = ResourceList::from_pairs(&[("cpu", 2000)]);
        let filtered = template.filter_by_remaining(Some(&remaining));
        assert_eq!(1, filtered.len());
        assert_eq!("small", filtered[0].name);
        assert!(template
            .filter_by_remaining(Some(&ResourceList::from_pairs(&[("cpu", 0)])))
            .is_empty());
    }

    #[test]
    fn test_templates_are_ordered_by_weight_then_name() {
        let pools = vec![node_pool("b", 10), node_pool("a", 10), node_pool("c", 50), node_pool("empty", 90)];
        let it = instance_type("m", 4000, 4096, vec![offering("z1", 1.0)]);
        let instance_types = BTreeMap::from([
            ("a".to_string(), vec![it.clone()]),
            ("b".to_string(), vec![it.clone()]),
            ("c".to_string(), vec![it]),
        ]);

        let templates = build_templates(&pools, &instance_types, &[], &mut NoopMetricsSink);
        let names: Vec<&str> = templates.iter().map(|t| t.node_pool.as_str()).collect();
        assert_eq!(vec!["c", "a", "b"], names);
    }
}
