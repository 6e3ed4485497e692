//! Options which change how one scheduling simulation behaves.

use serde::{Deserialize, Serialize};

/// How reserved offerings are treated while narrowing node claims.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ReservedOfferingMode {
    /// Only reserved offerings are accepted; claims without one fail.
    Strict,
    /// Reserved offerings are preferred, on-demand and spot are used once they are exhausted.
    #[default]
    BestEffort,
    /// Reservation state is ignored and reserved offerings behave like any other offering.
    Disabled,
}

/// What happens when a node pool requirement `min_values` can no longer be satisfied.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum MinValuesPolicy {
    #[default]
    Strict,
    BestEffort,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    /// Pods are popped in input order.
    #[default]
    Input,
    /// Pods with the largest cpu, then memory request go first.
    LargestFirst,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchedulerOptions {
    #[serde(default)]
    pub reserved_offering_mode: ReservedOfferingMode,
    /// When a compatible reserved offering is exhausted the pod is deferred instead of falling
    /// back to another offering or a node pool with lower weight.
    #[serde(default)]
    pub disable_reserved_capacity_fallback: bool,
    /// Advisory only, the solve loop is always sequential.
    #[serde(default = "num_concurrent_reconciles_default")]
    pub num_concurrent_reconciles: usize,
    #[serde(default)]
    pub min_values_policy: MinValuesPolicy,
    /// Drops preferred node requirements and `ScheduleAnyway` spread constraints.
    #[serde(default)]
    pub ignore_preferences: bool,
    #[serde(default)]
    pub queue_order: QueueOrder,
}

fn num_concurrent_reconciles_default() -> usize {
    1
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            reserved_offering_mode: Default::default(),
            disable_reserved_capacity_fallback: false,
            num_concurrent_reconciles: num_concurrent_reconciles_default(),
            min_values_policy: Default::default(),
            ignore_preferences: false,
            queue_order: Default::default(),
        }
    }
}
