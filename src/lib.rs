//! Fleetaudit - hardware homogeneity grouping and benchmark deviation analysis
//!
//! This library groups the systems of a fleet by identical hardware
//! fingerprints, one policy pass per hardware category, refines the
//! per-category groupings into a single partition, and classifies the
//! benchmark results of every group to single out unstable or curious hosts.
//! Two groups can be explained by a tiered structural diff of their records.

pub mod analysis;
pub mod cli;
pub mod deviation;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod input;
pub mod partition;
pub mod policy;
pub mod record;
pub mod report;
pub mod samples;
pub mod stats;
