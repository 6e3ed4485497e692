//! Error types of the scheduling simulation.
//!
//! A pod which cannot be placed gets a [`PodError`]: a list of typed causes, one per node pool (or
//! node) that rejected it, so callers can tell a deferral caused by reserved capacity from a hard
//! incompatibility.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::core::common::ResourceList;

/// Step of [`crate::scheduling::nodeclaim::NodeClaim::add`] which removed the last instance type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionFilter {
    Requirements,
    Resources,
    Reservations,
    TopologySpread,
}

impl fmt::Display for OptionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionFilter::Requirements => "requirements",
            OptionFilter::Resources => "resources",
            OptionFilter::Reservations => "reservations",
            OptionFilter::TopologySpread => "topology spread",
        };
        f.write_str(name)
    }
}

/// Why a single node claim (or existing node) rejected a pod.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClaimError {
    #[error("incompatible requirements, {0}")]
    IncompatibleRequirements(String),

    #[error("conflicting host ports, {0}")]
    HostPortConflict(String),

    #[error("no instance type satisfied resources {requests} and requirements {requirements}, filtered by {filter}")]
    NoInstanceTypes {
        filter: OptionFilter,
        requests: ResourceList,
        requirements: String,
    },

    #[error("insufficient resources {exceeding:?}, requests {requests}, available {available}")]
    InsufficientResources {
        requests: ResourceList,
        available: ResourceList,
        exceeding: Vec<String>,
    },

    #[error("would violate topology spread constraint {key} with max skew {max_skew}")]
    TopologySpread { key: String, max_skew: u32 },

    #[error("minimum values requirement for {key} is not met, need {min_values} got {available}")]
    MinValues {
        key: String,
        min_values: usize,
        available: usize,
    },

    /// Reserved capacity is exhausted and the fallback policy forbids using anything else.
    #[error("{0}")]
    ReservedOffering(String),
}

impl ClaimError {
    pub fn is_reserved_offering_error(&self) -> bool {
        matches!(self, ClaimError::ReservedOffering(_))
    }
}

/// One cause of a pod scheduling failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementCause {
    #[error("incompatible with nodepool {node_pool:?}, daemonset overhead={daemon_overhead}, {source}")]
    Incompatible {
        node_pool: String,
        daemon_overhead: ResourceList,
        #[source]
        source: ClaimError,
    },

    #[error("compatible with nodepool {node_pool:?} but failed to add pod while adhering to reservation fallback policy, {source}")]
    ReservedOfferingDeferral {
        node_pool: String,
        #[source]
        source: ClaimError,
    },

    #[error("all available instance types exceed limits for nodepool {node_pool:?}")]
    LimitExceeded { node_pool: String },

    #[error("claim dropped after truncating instance types for nodepool {node_pool:?}, {source}")]
    Truncated {
        node_pool: String,
        #[source]
        source: ClaimError,
    },

    #[error("no nodepool can host the pod")]
    NoCompatibleNodePool,
}

/// Aggregated reasons a pod could not be placed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodError {
    pub causes: Vec<PlacementCause>,
}

impl PodError {
    pub fn new() -> Self {
        Self { causes: Vec::new() }
    }

    pub fn push(&mut self, cause: PlacementCause) {
        self.causes.push(cause);
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// The pod was deferred because of reserved capacity, not found unschedulable.
    pub fn is_reserved_offering_error(&self) -> bool {
        self.causes
            .iter()
            .any(|c| matches!(c, PlacementCause::ReservedOfferingDeferral { .. }))
    }

    pub fn is_limit_exceeded(&self) -> bool {
        self.causes
            .iter()
            .any(|c| matches!(c, PlacementCause::LimitExceeded { .. }))
    }
}

impl fmt::Display for PodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.causes.is_empty() {
            return write!(f, "{}", PlacementCause::NoCompatibleNodePool);
        }
        let parts: Vec<String> = self.causes.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for PodError {}

impl Serialize for PodError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Errors which make the whole scheduling input unusable.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("nodepool without a name")]
    UnnamedNodePool,

    #[error("duplicate nodepool {0:?}")]
    DuplicateNodePool(String),

    #[error("nodepool {0:?} has invalid weight {1}, must be within [0, 100]")]
    InvalidWeight(String, i32),

    #[error("unknown placement strategy {0:?}")]
    UnknownPlacementStrategy(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
