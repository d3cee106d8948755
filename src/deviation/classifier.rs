// Per-host deviation classification against the 2-sigma band
//
// Statistics are computed over every host first; only then is each host
// compared against the band. The result is an immutable mapping with exactly
// one status per host.

use crate::deviation::config::Tolerance;
use crate::record::SystemId;
use crate::stats::GroupStatistics;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome for one host on one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostStatus {
    Consistent,
    CuriousOver { percent_above: f64 },
    CuriousUnder { percent_below: f64 },
    Unstable,
}

impl HostStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            HostStatus::Consistent => StatusKind::Consistent,
            HostStatus::CuriousOver { .. } | HostStatus::CuriousUnder { .. } => StatusKind::Curious,
            HostStatus::Unstable => StatusKind::Unstable,
        }
    }

    pub fn is_curious(&self) -> bool {
        self.kind() == StatusKind::Curious
    }
}

/// Status without the deviation amount
///
/// Ordered by rollup precedence: a host curious on any metric is curious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Consistent,
    Unstable,
    Curious,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Consistent => "consistent",
            StatusKind::Unstable => "unstable",
            StatusKind::Curious => "curious",
        }
    }
}

/// Group-level reading of a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupVerdict {
    /// Every host inside the band
    Consistent,
    /// At least one curious host
    Suspicious,
    /// Variance beyond the tolerance maximum
    Unstable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub metric: String,
    pub statistics: GroupStatistics,
    pub tolerance: Tolerance,
    pub hosts: BTreeMap<SystemId, HostStatus>,
}

impl Classification {
    pub fn verdict(&self) -> GroupVerdict {
        if self.statistics.coefficient_of_variation > self.tolerance.max {
            GroupVerdict::Unstable
        } else if self.hosts.values().any(HostStatus::is_curious) {
            GroupVerdict::Suspicious
        } else {
            GroupVerdict::Consistent
        }
    }

    pub fn hosts_with(&self, kind: StatusKind) -> Vec<&SystemId> {
        self.hosts
            .iter()
            .filter(|(_, status)| status.kind() == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Values of the hosts with the given status, in host order
    pub fn values_of(&self, kind: StatusKind, samples: &BTreeMap<SystemId, f64>) -> Vec<f64> {
        self.hosts_with(kind)
            .into_iter()
            .filter_map(|id| samples.get(id).copied())
            .collect()
    }
}

fn percent_beyond(distance: f64, band: f64) -> f64 {
    if band.abs() < f64::EPSILON {
        0.0
    } else {
        distance / band * 100.0
    }
}

/// Classify every host of one metric series
///
/// Returns `None` when there is no finite sample. Non-finite values are
/// dropped before statistics are computed.
pub fn classify(
    metric: &str,
    samples: &BTreeMap<SystemId, f64>,
    tolerance: Tolerance,
) -> Option<Classification> {
    let finite: BTreeMap<&SystemId, f64> = samples
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(id, v)| (id, *v))
        .collect();

    let values: Vec<f64> = finite.values().copied().collect();
    let Some(statistics) = GroupStatistics::from_values(&values) else {
        tracing::debug!(metric, "no samples, skipping classification");
        return None;
    };

    let cv = statistics.coefficient_of_variation;
    let lower = statistics.lower_band();
    let upper = statistics.upper_band();

    let hosts = finite
        .into_iter()
        .map(|(id, value)| {
            let status = if cv > tolerance.max {
                HostStatus::Unstable
            } else if cv <= tolerance.min {
                HostStatus::Consistent
            } else if value > upper {
                HostStatus::CuriousOver {
                    percent_above: percent_beyond(value - upper, upper),
                }
            } else if value < lower {
                HostStatus::CuriousUnder {
                    percent_below: percent_beyond(lower - value, lower),
                }
            } else {
                HostStatus::Consistent
            };
            (id.clone(), status)
        })
        .collect();

    Some(Classification {
        metric: metric.to_string(),
        statistics,
        tolerance,
        hosts,
    })
}
