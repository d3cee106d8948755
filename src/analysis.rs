//! Fleet analysis driver
//!
//! Wires the engine together for one run:
//!
//! 1. every policy pass groups the fleet by fingerprint (in parallel)
//! 2. the joint class signature of each system yields the final partition
//! 3. on demand, each group's benchmark series are classified, and any two
//!    groups can be explained by per-category diffs
//!
//! Results are plain values; nothing is cached between runs.

use crate::deviation::{
    classify, rollup, Classification, MetricFamily, ReferenceGrade, ReferenceKind,
    ReferenceTable, StatusKind, ToleranceTable,
};
use crate::diff::{diff, DiffReport};
use crate::error::{AuditError, Result};
use crate::fingerprint::{build_all, CategoryGrouping};
use crate::partition::{Group, Partition};
use crate::policy::PolicyTable;
use crate::record::{Category, SystemId, SystemRecords};
use crate::samples::{cpu_model, extract_samples, MetricSeries};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything a run needs besides the records
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub policies: PolicyTable,
    /// Categories left out of grouping
    pub ignore: BTreeSet<Category>,
    pub tolerances: ToleranceTable,
    pub references: ReferenceTable,
}

impl AnalysisConfig {
    /// Embedded policies, default tolerances, built-in reference table
    pub fn with_defaults() -> Result<Self> {
        Ok(Self {
            policies: PolicyTable::default_policies()?,
            ignore: BTreeSet::new(),
            tolerances: ToleranceTable::default(),
            references: ReferenceTable::builtin(),
        })
    }

    pub fn ignoring(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.ignore.extend(categories);
        self
    }

    fn effective_policies(&self) -> PolicyTable {
        let ignored: Vec<Category> = self.ignore.iter().copied().collect();
        self.policies.without(&ignored)
    }
}

/// Pair of groups and the passes in which they differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupLink {
    pub a: usize,
    pub b: usize,
    pub differing: Vec<String>,
}

/// Structural explanation of one differing pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDiff {
    pub pass: String,
    pub category: Category,
    pub report: DiffReport,
}

/// One classified metric series of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub series: MetricSeries,
    pub classification: Classification,
}

/// Rollup of every component series of one benchmark mode
///
/// A host curious on any component is curious for the mode, even when a
/// later component marks the whole series unstable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSummary {
    pub mode: String,
    pub family: MetricFamily,
    pub unit: &'static str,
    pub hosts: BTreeMap<SystemId, StatusKind>,
    /// Host values summed over the mode's components
    pub totals: BTreeMap<SystemId, f64>,
    /// Set for consistent CPU throughput only
    pub reference: Option<ReferenceGrade>,
    #[serde(skip)]
    measured: BTreeMap<SystemId, usize>,
}

impl ModeSummary {
    fn new(series: &MetricSeries) -> Self {
        Self {
            mode: series.mode.clone(),
            family: series.family,
            unit: series.unit(),
            hosts: BTreeMap::new(),
            totals: BTreeMap::new(),
            reference: None,
            measured: BTreeMap::new(),
        }
    }

    fn add(&mut self, metric: &MetricReport) {
        for id in metric.classification.hosts.keys() {
            if let Some(value) = metric.series.values.get(id) {
                *self.totals.entry(id.clone()).or_default() += value;
                *self.measured.entry(id.clone()).or_default() += 1;
            }
        }
    }

    pub fn hosts_with(&self, kind: StatusKind) -> Vec<&SystemId> {
        self.hosts
            .iter()
            .filter(|(_, status)| **status == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Summed values of the hosts with the given status, in host order
    pub fn totals_of(&self, kind: StatusKind) -> Vec<f64> {
        self.hosts_with(kind)
            .into_iter()
            .filter_map(|id| self.totals.get(id).copied())
            .collect()
    }

    /// Mean value per component of each host with the given status
    fn component_means_of(&self, kind: StatusKind) -> Vec<f64> {
        self.hosts_with(kind)
            .into_iter()
            .filter_map(|id| {
                let total = self.totals.get(id)?;
                let count = *self.measured.get(id)?;
                (count > 0).then(|| total / count as f64)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPerformance {
    pub group: usize,
    pub cpu_model: Option<String>,
    pub metrics: Vec<MetricReport>,
    /// One entry per benchmark mode, in metric order
    pub modes: Vec<ModeSummary>,
}

impl GroupPerformance {
    /// Host status over every metric of the group
    pub fn hosts(&self) -> BTreeMap<SystemId, StatusKind> {
        rollup(self.metrics.iter().map(|m| &m.classification))
    }

    pub fn mode(&self, mode: &str) -> Option<&ModeSummary> {
        self.modes.iter().find(|m| m.mode == mode)
    }
}

/// Result of grouping one fleet
#[derive(Debug, Clone)]
pub struct FleetAnalysis {
    systems: BTreeMap<SystemId, SystemRecords>,
    groupings: Vec<CategoryGrouping>,
    groups: Vec<Group>,
}

impl FleetAnalysis {
    /// Fingerprint every system and partition the fleet
    ///
    /// A system id seen twice keeps its first record set.
    pub fn run(systems: Vec<SystemRecords>, config: &AnalysisConfig) -> Self {
        let mut unique = Vec::with_capacity(systems.len());
        let mut seen = BTreeSet::new();
        for system in systems {
            if seen.insert(system.id.clone()) {
                unique.push(system);
            } else {
                tracing::warn!(system = %system.id, "duplicate system id, keeping first");
            }
        }

        let policies = config.effective_policies();
        let groupings = build_all(&unique, &policies);
        let partition = Partition::from_joint_fingerprints(unique.iter().map(|s| &s.id), &groupings);
        let groups = partition.into_groups();

        tracing::info!(
            systems = unique.len(),
            groups = groups.len(),
            passes = groupings.len(),
            "fleet partitioned"
        );

        Self {
            systems: unique.into_iter().map(|s| (s.id.clone(), s)).collect(),
            groupings,
            groups,
        }
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn system(&self, id: &SystemId) -> Option<&SystemRecords> {
        self.systems.get(id)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: usize) -> Result<&Group> {
        self.groups.get(id).ok_or(AuditError::UnknownGroup(id))
    }

    pub fn groupings(&self) -> &[CategoryGrouping] {
        &self.groupings
    }

    /// Passes in which every system agrees
    pub fn shared_categories(&self) -> Vec<&str> {
        self.groupings
            .iter()
            .filter(|g| g.is_uniform())
            .map(|g| g.pass.as_str())
            .collect()
    }

    fn differing_passes(&self, a: &Group, b: &Group) -> Vec<&CategoryGrouping> {
        let (Some(rep_a), Some(rep_b)) = (a.representative(), b.representative()) else {
            return Vec::new();
        };
        self.groupings
            .iter()
            .filter(|g| g.class_index(rep_a) != g.class_index(rep_b))
            .collect()
    }

    /// Every pair of groups with the passes that separate them
    pub fn links(&self) -> Vec<GroupLink> {
        let mut links = Vec::new();
        for (i, a) in self.groups.iter().enumerate() {
            for b in &self.groups[i + 1..] {
                links.push(GroupLink {
                    a: a.id,
                    b: b.id,
                    differing: self
                        .differing_passes(a, b)
                        .into_iter()
                        .map(|g| g.pass.clone())
                        .collect(),
                });
            }
        }
        links
    }

    /// Diff the representative fingerprints of two groups, pass by pass
    pub fn explain(&self, a: usize, b: usize) -> Result<Vec<CategoryDiff>> {
        let group_a = self.group(a)?;
        let group_b = self.group(b)?;

        let (Some(rep_a), Some(rep_b)) = (group_a.representative(), group_b.representative())
        else {
            return Ok(Vec::new());
        };

        Ok(self
            .differing_passes(group_a, group_b)
            .into_iter()
            .filter_map(|grouping| {
                let fp_a = &grouping.class_of(rep_a)?.fingerprint;
                let fp_b = &grouping.class_of(rep_b)?.fingerprint;
                Some(CategoryDiff {
                    pass: grouping.pass.clone(),
                    category: grouping.category,
                    report: diff(fp_a.records(), fp_b.records()),
                })
            })
            .collect())
    }

    fn members(&self, group: &Group) -> Vec<&SystemRecords> {
        group
            .members
            .iter()
            .filter_map(|id| self.systems.get(id))
            .collect()
    }

    /// Classify the benchmark series of one group
    pub fn classify_group(&self, group: &Group, config: &AnalysisConfig) -> GroupPerformance {
        let members = self.members(group);
        let model = cpu_model(&members);

        let metrics: Vec<MetricReport> = extract_samples(&members)
            .into_iter()
            .filter_map(|series| {
                let tolerance = config.tolerances.get(series.family);
                let Some(classification) = classify(&series.key(), &series.values, tolerance)
                else {
                    tracing::debug!(group = group.id, metric = %series.key(), "empty metric skipped");
                    return None;
                };
                Some(MetricReport {
                    series,
                    classification,
                })
            })
            .collect();
        let modes = summarize_modes(&metrics, model.as_deref(), &config.references);

        GroupPerformance {
            group: group.id,
            cpu_model: model,
            metrics,
            modes,
        }
    }

    pub fn classify_groups(&self, config: &AnalysisConfig) -> Vec<GroupPerformance> {
        self.groups
            .iter()
            .map(|group| self.classify_group(group, config))
            .collect()
    }
}

/// Fold the metrics of each mode, keeping the order modes first appear in
fn summarize_modes(
    metrics: &[MetricReport],
    model: Option<&str>,
    references: &ReferenceTable,
) -> Vec<ModeSummary> {
    let mut summaries: Vec<ModeSummary> = Vec::new();
    for metric in metrics {
        let index = match summaries.iter().position(|s| s.mode == metric.series.mode) {
            Some(index) => index,
            None => {
                summaries.push(ModeSummary::new(&metric.series));
                summaries.len() - 1
            }
        };
        summaries[index].add(metric);
    }

    for summary in &mut summaries {
        summary.hosts = rollup(
            metrics
                .iter()
                .filter(|m| m.series.mode == summary.mode)
                .map(|m| &m.classification),
        );
        summary.reference = grade_reference(summary, model, references);
    }
    summaries
}

/// Grade consistent CPU throughput against the reference minimum
///
/// The table holds per-core minimums, so each consistent host contributes
/// its mean over the measured cores.
fn grade_reference(
    summary: &ModeSummary,
    model: Option<&str>,
    references: &ReferenceTable,
) -> Option<ReferenceGrade> {
    if summary.family != MetricFamily::Cpu {
        return None;
    }
    let kind = ReferenceKind::from_mode(&summary.mode)?;
    let consistent = summary.component_means_of(StatusKind::Consistent);
    if consistent.is_empty() {
        return None;
    }
    let mean = consistent.iter().sum::<f64>() / consistent.len() as f64;
    Some(references.grade(kind, model.unwrap_or_default(), mean))
}
