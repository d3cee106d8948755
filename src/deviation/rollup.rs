use crate::deviation::classifier::{Classification, StatusKind};
use crate::record::SystemId;
use std::collections::BTreeMap;

/// Fold several metric classifications into one status per host
///
/// A host curious on any metric is curious; otherwise a host unstable on any
/// metric is unstable; otherwise it is consistent.
pub fn rollup<'a>(
    classifications: impl IntoIterator<Item = &'a Classification>,
) -> BTreeMap<SystemId, StatusKind> {
    let mut hosts: BTreeMap<SystemId, StatusKind> = BTreeMap::new();

    for classification in classifications {
        for (id, status) in &classification.hosts {
            let kind = status.kind();
            hosts
                .entry(id.clone())
                .and_modify(|current| *current = (*current).max(kind))
                .or_insert(kind);
        }
    }

    hosts
}
