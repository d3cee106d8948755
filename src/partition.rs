//! Fleet partition refinement
//!
//! A [`Partition`] holds pairwise-disjoint, non-empty blocks of systems whose
//! union is the whole fleet. Refinement only ever splits blocks. Blocks are
//! kept sorted by their smallest member, so two partitions over the same
//! systems compare equal iff they group them the same way.
//!
//! Two equivalent constructions exist:
//! - [`Partition::refine`], folding the classes of one pass at a time into a
//!   fresh generation of blocks;
//! - [`Partition::from_joint_fingerprints`], grouping systems by the vector of
//!   class indices they hold across every pass.
//!
//! The analysis uses the joint construction; the property tests check that
//! both agree for any pass order.

use crate::fingerprint::CategoryGrouping;
use crate::record::SystemId;
use fnv::FnvHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Partition {
    blocks: Vec<BTreeSet<SystemId>>,
}

impl Partition {
    /// The unrefined partition: one block holding every system
    pub fn single(systems: impl IntoIterator<Item = SystemId>) -> Self {
        Self::from_blocks(vec![systems.into_iter().collect()])
    }

    /// Build from arbitrary blocks, dropping empty ones
    ///
    /// Blocks are assumed disjoint; callers building from equivalence classes
    /// of a single pass get that for free.
    pub fn from_blocks(blocks: Vec<BTreeSet<SystemId>>) -> Self {
        let mut blocks: Vec<_> = blocks.into_iter().filter(|b| !b.is_empty()).collect();
        blocks.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));
        Self { blocks }
    }

    pub fn blocks(&self) -> &[BTreeSet<SystemId>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn system_count(&self) -> usize {
        self.blocks.iter().map(BTreeSet::len).sum()
    }

    /// Split every block along the given equivalence classes
    ///
    /// For each class C, every block B with `I = B ∩ C` non-empty and a
    /// strict subset of B is replaced by `I` and `B - I`. Each class produces
    /// a fresh generation of blocks.
    pub fn refine<'a, I>(&self, classes: I) -> Partition
    where
        I: IntoIterator<Item = &'a BTreeSet<SystemId>>,
    {
        let mut current = self.blocks.clone();

        for class in classes {
            let mut next = Vec::with_capacity(current.len() + 1);
            for block in current {
                let inside: BTreeSet<SystemId> = block.intersection(class).cloned().collect();
                if inside.is_empty() || inside.len() == block.len() {
                    next.push(block);
                } else {
                    let outside: BTreeSet<SystemId> = block.difference(&inside).cloned().collect();
                    next.push(inside);
                    next.push(outside);
                }
            }
            current = next;
        }

        Self::from_blocks(current)
    }

    /// Refine by every grouping in turn
    pub fn refine_all(&self, groupings: &[CategoryGrouping]) -> Partition {
        groupings
            .iter()
            .fold(self.clone(), |partition, grouping| {
                partition.refine(grouping.member_sets())
            })
    }

    /// Group systems by their joint class signature across all groupings
    ///
    /// A system absent from a grouping gets no class in it; systems missing
    /// from the same groupings still compare by the classes they do hold.
    pub fn from_joint_fingerprints<'a>(
        systems: impl IntoIterator<Item = &'a SystemId>,
        groupings: &[CategoryGrouping],
    ) -> Partition {
        let mut by_signature: FnvHashMap<Vec<Option<usize>>, BTreeSet<SystemId>> =
            FnvHashMap::default();

        for system in systems {
            let signature: Vec<Option<usize>> = groupings
                .iter()
                .map(|grouping| grouping.class_index(system))
                .collect();
            by_signature
                .entry(signature)
                .or_default()
                .insert(system.clone());
        }

        Self::from_blocks(by_signature.into_values().collect())
    }

    pub fn block_of(&self, system: &SystemId) -> Option<usize> {
        self.blocks.iter().position(|b| b.contains(system))
    }

    /// Number the blocks as groups, in smallest-member order
    pub fn into_groups(self) -> Vec<Group> {
        self.blocks
            .into_iter()
            .enumerate()
            .map(|(id, members)| Group { id, members })
            .collect()
    }
}

/// One final group of identical hardware
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: usize,
    pub members: BTreeSet<SystemId>,
}

impl Group {
    /// Smallest member, used when one system must stand for the group
    pub fn representative(&self) -> Option<&SystemId> {
        self.members.iter().next()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<SystemId> {
        ids.iter().map(|s| SystemId::from(*s)).collect()
    }

    fn fleet() -> Partition {
        Partition::single(["a", "b", "c", "d", "e"].map(SystemId::from))
    }

    #[test]
    fn test_single_block() {
        let p = fleet();
        assert_eq!(p.len(), 1);
        assert_eq!(p.system_count(), 5);
    }

    #[test]
    fn test_refine_splits_block() {
        let refined = fleet().refine([&set(&["a", "c"]), &set(&["b", "d", "e"])]);

        assert_eq!(refined.blocks(), &[set(&["a", "c"]), set(&["b", "d", "e"])]);
    }

    #[test]
    fn test_refine_noop_cases() {
        let p = fleet();
        let whole = set(&["a", "b", "c", "d", "e"]);
        let foreign = set(&["z"]);

        assert_eq!(p.refine([&whole]), p);
        assert_eq!(p.refine([&foreign]), p);
        assert_eq!(p.refine(std::iter::empty()), p);
    }

    #[test]
    fn test_refine_twice_by_same_classes() {
        let classes = [set(&["a", "b"]), set(&["c"]), set(&["d", "e"])];
        let once = fleet().refine(&classes);
        let twice = once.refine(&classes);

        assert_eq!(once.len(), 3);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_refine_intersects_categories() {
        let disks = [set(&["a", "b", "c"]), set(&["d", "e"])];
        let cpus = [set(&["a", "d"]), set(&["b", "c", "e"])];

        let forward = fleet().refine(&disks).refine(&cpus);
        let backward = fleet().refine(&cpus).refine(&disks);

        assert_eq!(forward, backward);
        assert_eq!(
            forward.blocks(),
            &[set(&["a"]), set(&["b", "c"]), set(&["d"]), set(&["e"])]
        );
    }

    #[test]
    fn test_blocks_ordered_by_smallest_member() {
        let p = Partition::from_blocks(vec![set(&["x", "b"]), set(&["a", "z"]), BTreeSet::new()]);

        assert_eq!(p.blocks(), &[set(&["a", "z"]), set(&["b", "x"])]);
        assert_eq!(p.block_of(&SystemId::from("x")), Some(1));
        assert_eq!(p.block_of(&SystemId::from("q")), None);
    }

    #[test]
    fn test_into_groups_numbering() {
        let groups = Partition::from_blocks(vec![set(&["m"]), set(&["c", "q"])]).into_groups();

        assert_eq!(groups[0].id, 0);
        assert_eq!(groups[0].representative().map(SystemId::as_str), Some("c"));
        assert_eq!(groups[1].id, 1);
        assert_eq!(groups[1].len(), 1);
    }
}
