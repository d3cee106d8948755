//! Three-tier structural diff between two record sets
//!
//! - T1: component ids
//! - T2: `(component, attribute)` pairs
//! - T3: `(component, attribute, value)` triples
//!
//! Each tier is split into unique-to-A, unique-to-B and shared entries. Lower
//! tiers are suppressed when a higher tier already explains them: a T2 entry
//! is dropped when its component is unique at T1, and a T3 entry is dropped
//! when its component is unique at T1 or its pair is unique at T2.

use crate::record::AttributeRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Entries of one side (or the shared part) across all three tiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierSet {
    pub components: BTreeSet<String>,
    pub attributes: BTreeSet<(String, String)>,
    pub values: BTreeSet<(String, String, String)>,
}

impl TierSet {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.attributes.is_empty() && self.values.is_empty()
    }

    fn from_records<'a>(records: impl IntoIterator<Item = &'a AttributeRecord>) -> Self {
        let mut tiers = Self::default();
        for r in records {
            tiers.components.insert(r.component.clone());
            tiers
                .attributes
                .insert((r.component.clone(), r.attribute.clone()));
            tiers
                .values
                .insert((r.component.clone(), r.attribute.clone(), r.value.clone()));
        }
        tiers
    }

    /// Group T2 and T3 entries under their component id
    pub fn nested(&self) -> Vec<ComponentDiff> {
        fn entry<'m>(
            map: &'m mut BTreeMap<String, ComponentDiff>,
            component: &str,
        ) -> &'m mut ComponentDiff {
            map.entry(component.to_string())
                .or_insert_with(|| ComponentDiff {
                    component: component.to_string(),
                    ..ComponentDiff::default()
                })
        }

        let mut by_component = BTreeMap::new();
        for component in &self.components {
            entry(&mut by_component, component).whole = true;
        }
        for (component, attribute) in &self.attributes {
            entry(&mut by_component, component)
                .attributes
                .push(attribute.clone());
        }
        for (component, attribute, value) in &self.values {
            entry(&mut by_component, component)
                .values
                .push((attribute.clone(), value.clone()));
        }

        by_component.into_values().collect()
    }
}

/// Per-component view of one side of a diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentDiff {
    pub component: String,
    /// The component itself is unique to this side
    pub whole: bool,
    pub attributes: Vec<String>,
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub only_a: TierSet,
    pub only_b: TierSet,
    pub shared: TierSet,
}

impl DiffReport {
    /// True when neither side has anything unique
    pub fn is_empty(&self) -> bool {
        self.only_a.is_empty() && self.only_b.is_empty()
    }

    /// The same diff seen from B
    pub fn swapped(&self) -> Self {
        Self {
            only_a: self.only_b.clone(),
            only_b: self.only_a.clone(),
            shared: self.shared.clone(),
        }
    }
}

fn unique<T: Ord + Clone>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> BTreeSet<T> {
    left.difference(right).cloned().collect()
}

fn common<T: Ord + Clone>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> BTreeSet<T> {
    left.intersection(right).cloned().collect()
}

/// Suppress T2/T3 entries already explained by a higher tier
fn suppress(raw: TierSet) -> TierSet {
    let attributes: BTreeSet<(String, String)> = raw
        .attributes
        .into_iter()
        .filter(|(c, _)| !raw.components.contains(c))
        .collect();
    let values = raw
        .values
        .into_iter()
        .filter(|(c, a, _)| {
            !raw.components.contains(c) && !attributes.contains(&(c.clone(), a.clone()))
        })
        .collect();

    TierSet {
        components: raw.components,
        attributes,
        values,
    }
}

pub fn diff<'a, A, B>(a: A, b: B) -> DiffReport
where
    A: IntoIterator<Item = &'a AttributeRecord>,
    B: IntoIterator<Item = &'a AttributeRecord>,
{
    let left = TierSet::from_records(a);
    let right = TierSet::from_records(b);

    let only_a = TierSet {
        components: unique(&left.components, &right.components),
        attributes: unique(&left.attributes, &right.attributes),
        values: unique(&left.values, &right.values),
    };
    let only_b = TierSet {
        components: unique(&right.components, &left.components),
        attributes: unique(&right.attributes, &left.attributes),
        values: unique(&right.values, &left.values),
    };
    let shared = TierSet {
        components: common(&left.components, &right.components),
        attributes: common(&left.attributes, &right.attributes),
        values: common(&left.values, &right.values),
    };

    DiffReport {
        only_a: suppress(only_a),
        only_b: suppress(only_b),
        shared,
    }
}
