//! Node label requirements and their set algebra.
//!
//! A [`Requirement`] is kept in normalized form: a set of values plus a `complement` flag. `In` is a
//! plain set, `NotIn` is a complemented set, `Exists` is the complement of the empty set and
//! `DoesNotExist` is the empty set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::labels::is_well_known;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// Requirement as it is written in pod, daemon set and node pool specs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeSelectorRequirement {
    pub key: String,
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<String>,
    /// Minimum number of distinct values the remaining instance types of a node claim must offer
    /// for this key.
    #[serde(default)]
    pub min_values: Option<usize>,
}

impl NodeSelectorRequirement {
    pub fn new(key: &str, operator: Operator, values: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            operator,
            values: values.iter().map(|v| v.to_string()).collect(),
            min_values: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    complement: bool,
    values: BTreeSet<String>,
    pub min_values: Option<usize>,
}

impl Requirement {
    pub fn new<'a>(key: &str, operator: Operator, values: impl IntoIterator<Item = &'a str>) -> Self {
        let values: BTreeSet<String> = values.into_iter().map(|v| v.to_string()).collect();
        let (complement, values) = match operator {
            Operator::In => (false, values),
            Operator::NotIn => (true, values),
            Operator::Exists => (true, BTreeSet::new()),
            Operator::DoesNotExist => (false, BTreeSet::new()),
        };
        Self {
            key: key.to_string(),
            complement,
            values,
            min_values: None,
        }
    }

    pub fn with_values(key: &str, values: BTreeSet<String>) -> Self {
        Self {
            key: key.to_string(),
            complement: false,
            values,
            min_values: None,
        }
    }

    pub fn from_selector(selector: &NodeSelectorRequirement) -> Self {
        let mut requirement = Self::new(
            &selector.key,
            selector.operator,
            selector.values.iter().map(|v| v.as_str()),
        );
        requirement.min_values = selector.min_values;
        requirement
    }

    pub fn operator(&self) -> Operator {
        match (self.complement, self.values.is_empty()) {
            (true, true) => Operator::Exists,
            (true, false) => Operator::NotIn,
            (false, true) => Operator::DoesNotExist,
            (false, false) => Operator::In,
        }
    }

    pub fn has(&self, value: &str) -> bool {
        self.values.contains(value) != self.complement
    }

    /// True if no value can satisfy the requirement.
    pub fn is_empty(&self) -> bool {
        !self.complement && self.values.is_empty()
    }

    /// Finite set of allowed values, `None` for complemented requirements.
    pub fn values(&self) -> Option<&BTreeSet<String>> {
        if self.complement {
            None
        } else {
            Some(&self.values)
        }
    }

    /// The only allowed value, if the requirement pins exactly one.
    pub fn single_value(&self) -> Option<&str> {
        match self.values() {
            Some(values) if values.len() == 1 => values.iter().next().map(|v| v.as_str()),
            _ => None,
        }
    }

    pub fn intersection(&self, other: &Requirement) -> Requirement {
        let (complement, values) = match (self.complement, other.complement) {
            (true, true) => (true, self.values.union(&other.values).cloned().collect()),
            (true, false) => (false, other.values.difference(&self.values).cloned().collect()),
            (false, true) => (false, self.values.difference(&other.values).cloned().collect()),
            (false, false) => (
                false,
                self.values.intersection(&other.values).cloned().collect(),
            ),
        };
        Requirement {
            key: self.key.clone(),
            complement,
            values,
            min_values: self.min_values.max(other.min_values),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator() {
            Operator::Exists | Operator::DoesNotExist => {
                write!(f, "{} {:?}", self.key, self.operator())
            }
            operator => {
                let values: Vec<&str> = self.values.iter().map(|v| v.as_str()).collect();
                write!(f, "{} {:?} [{}]", self.key, operator, values.join(","))
            }
        }
    }
}

/// Set of requirements keyed by label key; adding a requirement for a present key intersects them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements(BTreeMap<String, Requirement>);

impl Requirements {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_selectors(selectors: &[NodeSelectorRequirement]) -> Self {
        let mut requirements = Self::new();
        for selector in selectors {
            requirements.add(Requirement::from_selector(selector));
        }
        requirements
    }

    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        let mut requirements = Self::new();
        for (key, value) in labels {
            requirements.add(Requirement::new(key, Operator::In, [value.as_str()]));
        }
        requirements
    }

    pub fn add(&mut self, requirement: Requirement) {
        let merged = match self.0.get(&requirement.key) {
            Some(existing) => existing.intersection(&requirement),
            None => requirement,
        };
        self.0.insert(merged.key.clone(), merged);
    }

    pub fn extend(&mut self, other: &Requirements) {
        for requirement in other.0.values() {
            self.add(requirement.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Requirement> {
        self.0.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.0.values()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks that `incoming` can be satisfied by a node described by `self`.
    ///
    /// Keys present in both must intersect. A custom key required by `incoming` but unknown to
    /// `self` is rejected; well-known keys are allowed to be undefined because instance types
    /// decide them later.
    pub fn compatible(&self, incoming: &Requirements) -> Result<(), String> {
        self.compatible_with(incoming, |_| false)
    }

    /// Same as [`Requirements::compatible`], with `defined` telling which other custom keys will
    /// get a value, e.g. labels of instance types still available to a node claim.
    pub fn compatible_with(
        &self,
        incoming: &Requirements,
        defined: impl Fn(&str) -> bool,
    ) -> Result<(), String> {
        for requirement in incoming.iter() {
            if self.has(&requirement.key)
                || is_well_known(&requirement.key)
                || defined(&requirement.key)
            {
                continue;
            }
            match requirement.operator() {
                Operator::NotIn | Operator::DoesNotExist => continue,
                _ => return Err(format!("label {:?} does not have known values", requirement.key)),
            }
        }
        self.intersects(incoming)
    }

    /// Checks that every key present in both sets has at least one common value.
    pub fn intersects(&self, incoming: &Requirements) -> Result<(), String> {
        for requirement in incoming.iter() {
            let Some(existing) = self.get(&requirement.key) else {
                continue;
            };
            if !existing.intersection(requirement).is_empty() {
                continue;
            }
            let negative = |op: Operator| op == Operator::NotIn || op == Operator::DoesNotExist;
            if negative(requirement.operator()) && negative(existing.operator()) {
                continue;
            }
            return Err(format!(
                "key {}, {} not in {}",
                requirement.key, requirement, existing
            ));
        }
        Ok(())
    }

    /// Checks a plain label map (an existing node) against the requirements.
    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> Result<(), String> {
        for requirement in self.iter() {
            let satisfied = match labels.get(&requirement.key) {
                Some(value) => requirement.has(value),
                None => matches!(
                    requirement.operator(),
                    Operator::NotIn | Operator::DoesNotExist
                ),
            };
            if !satisfied {
                return Err(format!(
                    "label {:?}={:?} does not satisfy {}",
                    requirement.key,
                    labels.get(&requirement.key),
                    requirement
                ));
            }
        }
        Ok(())
    }

    /// Requirements in the form they are written in specs.
    pub fn to_selectors(&self) -> Vec<NodeSelectorRequirement> {
        self.0
            .values()
            .map(|r| NodeSelectorRequirement {
                key: r.key.clone(),
                operator: r.operator(),
                values: r.values.iter().cloned().collect(),
                min_values: r.min_values,
            })
            .collect()
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.values().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}
