// Deviation classification for benchmark results within a hardware group
//
// Hosts in one group run identical hardware, so their benchmark figures are
// expected to agree. For each metric series the classifier computes the group
// statistics and then judges every host:
//
// - cv > tolerance max: the whole series is unstable
// - cv <= tolerance min: every host is consistent
// - otherwise: hosts outside mean +/- 2 sigma are curious (over or under)
//
// Consistent CPU throughput is additionally graded against a table of known
// minimums per processor model.

mod classifier;
mod config;
mod reference;
mod rollup;

pub use classifier::{classify, Classification, GroupVerdict, HostStatus, StatusKind};
pub use config::{MetricFamily, Tolerance, ToleranceTable};
pub use reference::{ReferenceGrade, ReferenceKind, ReferenceTable};
pub use rollup::rollup;

#[cfg(test)]
mod tests;
