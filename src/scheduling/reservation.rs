//! Accounting of reserved offerings during one scheduling simulation.
//!
//! Every reservation can back a limited number of nodes. A node claim holds one unit of every
//! reservation it may still launch with; the hold is taken when a pod is committed to the claim
//! and given back when the claim narrows away from the reservation or is destroyed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::core::instance_type::{InstanceType, Offering};
use crate::scheduling::options::{ReservedOfferingMode, SchedulerOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// A unit of the reservation is free or already held by the claim.
    Granted,
    /// The reservation is exhausted, the claim may use other offerings.
    FallbackRequired,
    /// The reservation is exhausted and nothing else may be used instead.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct ReservationManager {
    mode: ReservedOfferingMode,
    fallback_allowed: bool,
    capacity: HashMap<String, u32>,
    consumed: HashMap<String, u32>,
    /// Claim hostname to the reservations it holds.
    held: HashMap<String, BTreeSet<String>>,
}

impl ReservationManager {
    /// Capacity of a reservation is the smallest one reported by any offering referring to it.
    pub fn new(instance_types: &BTreeMap<String, Vec<InstanceType>>, options: &SchedulerOptions) -> Self {
        let mut capacity: HashMap<String, u32> = HashMap::new();
        for offering in instance_types
            .values()
            .flatten()
            .flat_map(|it| it.offerings.iter())
        {
            let Some(id) = offering.reservation_id.as_ref() else {
                continue;
            };
            capacity
                .entry(id.clone())
                .and_modify(|c| *c = (*c).min(offering.reservation_capacity))
                .or_insert(offering.reservation_capacity);
        }
        Self {
            mode: options.reserved_offering_mode,
            fallback_allowed: options.reserved_offering_mode == ReservedOfferingMode::BestEffort
                && !options.disable_reserved_capacity_fallback,
            capacity,
            consumed: HashMap::new(),
            held: HashMap::new(),
        }
    }

    pub fn mode(&self) -> ReservedOfferingMode {
        self.mode
    }

    pub fn remaining(&self, reservation_id: &str) -> u32 {
        let capacity = self.capacity.get(reservation_id).copied().unwrap_or(0);
        capacity.saturating_sub(self.consumed.get(reservation_id).copied().unwrap_or(0))
    }

    fn holds(&self, claim: &str, reservation_id: &str) -> bool {
        self.held
            .get(claim)
            .is_some_and(|ids| ids.contains(reservation_id))
    }

    /// Answers whether `claim` may launch with `offering`. Nothing is consumed until
    /// [`ReservationManager::commit`].
    pub fn try_reserve(
        &self,
        claim: &str,
        node_pool: &str,
        instance_type: &InstanceType,
        offering: &Offering,
    ) -> ReservationOutcome {
        let Some(id) = offering.reservation_id.as_deref() else {
            return ReservationOutcome::Granted;
        };
        if self.holds(claim, id) || self.remaining(id) > 0 {
            return ReservationOutcome::Granted;
        }
        debug!(
            "Reservation {:?} of instance type {:?} in nodepool {:?} is exhausted for claim {:?}",
            id, instance_type.name, node_pool, claim
        );
        if self.fallback_allowed {
            ReservationOutcome::FallbackRequired
        } else {
            ReservationOutcome::Exhausted
        }
    }

    /// Makes `claim` hold exactly `reservation_ids`, consuming new ones and giving back the rest.
    pub fn commit(&mut self, claim: &str, reservation_ids: &BTreeSet<String>) {
        let previous = self.held.remove(claim).unwrap_or_default();
        for id in previous.difference(reservation_ids) {
            if let Some(consumed) = self.consumed.get_mut(id) {
                *consumed = consumed.saturating_sub(1);
            }
        }
        for id in reservation_ids.difference(&previous) {
            *self.consumed.entry(id.clone()).or_insert(0) += 1;
        }
        if !reservation_ids.is_empty() {
            self.held.insert(claim.to_string(), reservation_ids.clone());
        }
    }

    pub fn release(&mut self, claim: &str) {
        self.commit(claim, &BTreeSet::new());
    }

    pub fn held_by(&self, claim: &str) -> Option<&BTreeSet<String>> {
        self.held.get(claim)
    }
}
