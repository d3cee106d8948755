//! Per-category fingerprints and equivalence classes
//!
//! A fingerprint is the filtered set of records one policy pass keeps for one
//! system. Two systems are equivalent in a pass iff their fingerprints are
//! set-equal; the equivalence classes of a pass feed the partition refiner.
//!
//! Passes are independent of each other, so [`build_all`] runs them on scoped
//! threads and returns the groupings in table order.

use crate::policy::{CompiledPolicy, PolicyTable};
use crate::record::{AttributeRecord, Category, SystemId, SystemRecords};
use fnv::FnvHashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Filtered, comparable identity of one system within one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint {
    records: BTreeSet<AttributeRecord>,
}

impl Fingerprint {
    pub fn new(records: impl IntoIterator<Item = AttributeRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn records(&self) -> &BTreeSet<AttributeRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// SHA-256 digest of the sorted record list, hex encoded
    ///
    /// Fields are length-prefixed so that no two distinct fingerprints share
    /// a byte stream.
    pub fn canonical_key(&self) -> String {
        let mut hasher = Sha256::new();
        for record in &self.records {
            for field in [
                record.category.as_str(),
                record.component.as_str(),
                record.attribute.as_str(),
                record.value.as_str(),
            ] {
                hasher.update((field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Apply one policy pass to a system's records
pub fn build_fingerprint(records: &[AttributeRecord], policy: &CompiledPolicy) -> Fingerprint {
    let category = policy.category();
    Fingerprint::new(
        records
            .iter()
            .filter(|r| r.category == category)
            .filter(|r| policy.matches_component(&r.component))
            .filter(|r| policy.admits_attribute(&r.attribute))
            .cloned(),
    )
}

/// Systems sharing one fingerprint in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquivalenceClass {
    pub key: String,
    pub fingerprint: Fingerprint,
    pub members: BTreeSet<SystemId>,
}

/// All equivalence classes of one pass, ordered by smallest member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGrouping {
    pub pass: String,
    pub category: Category,
    pub classes: Vec<EquivalenceClass>,
}

impl CategoryGrouping {
    pub fn member_sets(&self) -> Vec<&BTreeSet<SystemId>> {
        self.classes.iter().map(|c| &c.members).collect()
    }

    /// True when every system produced the same fingerprint
    pub fn is_uniform(&self) -> bool {
        self.classes.len() <= 1
    }

    pub fn class_of(&self, system: &SystemId) -> Option<&EquivalenceClass> {
        self.classes.iter().find(|c| c.members.contains(system))
    }

    /// Index of the class containing `system`
    pub fn class_index(&self, system: &SystemId) -> Option<usize> {
        self.classes.iter().position(|c| c.members.contains(system))
    }
}

/// Group systems by fingerprint equality for one pass
pub fn group_by_fingerprint(systems: &[SystemRecords], policy: &CompiledPolicy) -> CategoryGrouping {
    let mut by_fingerprint: FnvHashMap<Fingerprint, BTreeSet<SystemId>> = FnvHashMap::default();

    for system in systems {
        let fingerprint = build_fingerprint(&system.records, policy);
        by_fingerprint
            .entry(fingerprint)
            .or_default()
            .insert(system.id.clone());
    }

    let mut classes: Vec<EquivalenceClass> = by_fingerprint
        .into_iter()
        .map(|(fingerprint, members)| EquivalenceClass {
            key: fingerprint.canonical_key(),
            fingerprint,
            members,
        })
        .collect();
    classes.sort_by(|a, b| a.members.iter().next().cmp(&b.members.iter().next()));

    tracing::debug!(
        pass = policy.name(),
        classes = classes.len(),
        "built fingerprint classes"
    );

    CategoryGrouping {
        pass: policy.name().to_string(),
        category: policy.category(),
        classes,
    }
}

/// Build the groupings of every pass in parallel, in table order
pub fn build_all(systems: &[SystemRecords], table: &PolicyTable) -> Vec<CategoryGrouping> {
    let scoped = crossbeam::scope(|scope| {
        let handles: Vec<_> = table
            .passes()
            .iter()
            .map(|policy| scope.spawn(move |_| group_by_fingerprint(systems, policy)))
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(grouping) => grouping,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect::<Vec<_>>()
    });

    match scoped {
        Ok(groupings) => groupings,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
