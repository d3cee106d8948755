//! Benchmark sample extraction
//!
//! Benchmark results travel in the same record stream as the inventory:
//!
//! - disk: `(disk, sdX, <standalone/simultaneous mode ending in KBps or IOps>, v)`,
//!   one series per mode and disk, values rounded half to even
//! - cpu: `(cpu, logical_N, loops_per_sec or bogomips, v)`, one series per mode
//!   and core; a lone `(cpu, logical, loops_per_sec, v)` stands in when no
//!   per-core run exists
//! - cpu efficiency: the global loops figure against the per-core sum scaled to
//!   the core count
//! - memory: `(cpu, logical_N, bandwidth_<size>, v)` per block size and core,
//!   plus `threaded_bandwidth_<size>` and `forked_bandwidth_<size>` efficiency;
//!   a host with only the all-core figures gets one `logical` series from them
//! - network: `(network, <iface>, bandwidth or requests_per_sec, v)` summed per host
//!
//! Non-numeric values are skipped.

use crate::deviation::MetricFamily;
use crate::record::{Category, SystemId, SystemRecords};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

pub const CPU_MODES: [&str; 2] = ["bogomips", "loops_per_sec"];
pub const MEMORY_BLOCK_SIZES: [&str; 8] = ["1K", "4K", "1M", "16M", "128M", "256M", "1G", "2G"];
pub const NETWORK_MODES: [&str; 2] = ["bandwidth", "requests_per_sec"];
pub const DISK_UNITS: [&str; 2] = ["KBps", "IOps"];

/// Component name of a series aggregated over the whole host
pub const GLOBAL_COMPONENT: &str = "logical";

/// One metric measured once per host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    /// Benchmark mode, e.g. `standalone_randread_4k_IOps` or `bandwidth_1M`
    pub mode: String,
    /// Measured component, e.g. `sda` or `logical_3`
    pub component: String,
    pub family: MetricFamily,
    pub values: BTreeMap<SystemId, f64>,
}

impl MetricSeries {
    /// `"<mode> <component>"`
    pub fn key(&self) -> String {
        format!("{} {}", self.mode, self.component)
    }

    pub fn unit(&self) -> &'static str {
        match self.family {
            MetricFamily::Disk | MetricFamily::DiskRandom => {
                if self.mode.contains("IOps") {
                    "IOps"
                } else {
                    "KBps"
                }
            }
            MetricFamily::Network => {
                if self.mode == "bandwidth" {
                    "MB/sec"
                } else {
                    "RRQ/sec"
                }
            }
            MetricFamily::Cpu => "",
            MetricFamily::Memory => "MB/s",
            MetricFamily::CpuEfficiency | MetricFamily::MemoryEfficiency => "%",
        }
    }
}

type SeriesMap = BTreeMap<(String, String), BTreeMap<SystemId, f64>>;

fn push(map: &mut SeriesMap, mode: &str, component: &str, id: &SystemId, value: f64) {
    map.entry((mode.to_string(), component.to_string()))
        .or_default()
        .insert(id.clone(), value);
}

fn into_series(map: SeriesMap, family: impl Fn(&str) -> MetricFamily) -> Vec<MetricSeries> {
    map.into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|((mode, component), values)| MetricSeries {
            family: family(&mode),
            mode,
            component,
            values,
        })
        .collect()
}

/// `sda`, `vdb`, `hdc1`: a lowercase letter, `d`, then a non-blank name
const LOGICAL_DISK: &str = r"^[a-z]d\S+";

pub fn disk_series(systems: &[&SystemRecords]) -> Vec<MetricSeries> {
    let logical_disk = match Regex::new(LOGICAL_DISK) {
        Ok(regex) => regex,
        Err(err) => {
            tracing::error!(%err, "invalid logical disk pattern");
            return Vec::new();
        }
    };
    let mut map = SeriesMap::new();

    for system in systems {
        for record in system.category(Category::Disk) {
            let is_bench = record.attribute.contains("standalone")
                || record.attribute.contains("simultaneous");
            let has_unit = DISK_UNITS.iter().any(|u| record.attribute.contains(u));
            if !is_bench || !has_unit || !logical_disk.is_match(&record.component) {
                continue;
            }
            if let Some(value) = record.numeric_value() {
                let rounded = value.round_ties_even();
                push(&mut map, &record.attribute, &record.component, &system.id, rounded);
            }
        }
    }

    into_series(map, |mode| {
        if mode.contains("rand") {
            MetricFamily::DiskRandom
        } else {
            MetricFamily::Disk
        }
    })
}

/// Per-core CPU series plus the CPU efficiency series
pub fn cpu_series(systems: &[&SystemRecords]) -> Vec<MetricSeries> {
    let mut map = SeriesMap::new();
    let mut efficiency = SeriesMap::new();

    for mode in CPU_MODES {
        for system in systems {
            let mut per_core = Vec::new();
            let mut global = None;

            for record in system.category(Category::Cpu) {
                if record.attribute != mode {
                    continue;
                }
                let Some(value) = record.numeric_value() else {
                    continue;
                };
                if record.component.contains('_') {
                    per_core.push((record.component.as_str(), value));
                } else if mode == "loops_per_sec" {
                    global = Some(value);
                }
            }

            for (component, value) in &per_core {
                push(&mut map, mode, component, &system.id, *value);
            }

            match (per_core.is_empty(), global) {
                (true, Some(value)) => push(&mut map, mode, GLOBAL_COMPONENT, &system.id, value),
                (false, Some(value)) => {
                    let measured = per_core.len() as f64;
                    let cores = system
                        .value(Category::Cpu, GLOBAL_COMPONENT, "number")
                        .and_then(|n| n.trim().parse::<f64>().ok())
                        .filter(|n| *n > 0.0)
                        .unwrap_or(measured);
                    let sum: f64 = per_core.iter().map(|(_, v)| v).sum();
                    let expected = sum * cores / measured;
                    if expected > 0.0 {
                        push(
                            &mut efficiency,
                            "cpu_efficiency",
                            GLOBAL_COMPONENT,
                            &system.id,
                            value / expected * 100.0,
                        );
                    }
                }
                _ => {}
            }
        }
    }

    let mut series = into_series(map, |_| MetricFamily::Cpu);
    series.extend(into_series(efficiency, |_| MetricFamily::CpuEfficiency));
    series
}

/// Per-core memory bandwidth series plus thread/fork efficiency series
pub fn memory_series(systems: &[&SystemRecords]) -> Vec<MetricSeries> {
    let mut map = SeriesMap::new();
    let mut efficiency = SeriesMap::new();

    for size in MEMORY_BLOCK_SIZES {
        let per_core_attr = format!("bandwidth_{}", size);
        let threaded_attr = format!("threaded_bandwidth_{}", size);
        let forked_attr = format!("forked_bandwidth_{}", size);

        for system in systems {
            let mut per_core_sum = 0.0;
            let mut has_per_core = false;
            let mut threaded = None;
            let mut forked = None;
            let mut all_cores = None;

            for record in system.category(Category::Cpu) {
                let Some(value) = record.numeric_value() else {
                    continue;
                };
                if record.attribute == per_core_attr && record.component.contains("logical_") {
                    push(&mut map, &per_core_attr, &record.component, &system.id, value);
                    per_core_sum += value;
                    has_per_core = true;
                } else if record.attribute == threaded_attr {
                    threaded = Some(value);
                    all_cores = Some(value);
                } else if record.attribute == forked_attr {
                    forked = Some(value);
                    all_cores = Some(value);
                }
            }

            if !has_per_core {
                // Last all-core figure seen stands in for the missing per-core runs
                if let Some(value) = all_cores.filter(|v| *v != 0.0) {
                    push(&mut map, &per_core_attr, GLOBAL_COMPONENT, &system.id, value);
                }
                continue;
            }
            if per_core_sum <= 0.0 {
                continue;
            }
            for (kind, total) in [("threaded", threaded), ("forked", forked)] {
                if let Some(total) = total.filter(|t| *t > 0.0) {
                    push(
                        &mut efficiency,
                        &format!("{}_efficiency_{}", kind, size),
                        GLOBAL_COMPONENT,
                        &system.id,
                        total / per_core_sum * 100.0,
                    );
                }
            }
        }
    }

    let mut series = into_series(map, |_| MetricFamily::Memory);
    series.extend(into_series(efficiency, |_| MetricFamily::MemoryEfficiency));
    series
}

/// Network figures summed over every interface of a host
pub fn network_series(systems: &[&SystemRecords]) -> Vec<MetricSeries> {
    let mut map = SeriesMap::new();

    for mode in NETWORK_MODES {
        for system in systems {
            let values: Vec<f64> = system
                .category(Category::Network)
                .filter(|r| r.attribute == mode)
                .filter_map(|r| r.numeric_value())
                .collect();
            if !values.is_empty() {
                push(&mut map, mode, "all", &system.id, values.iter().sum());
            }
        }
    }

    into_series(map, |_| MetricFamily::Network)
}

/// Every metric series carried by the given systems
pub fn extract_samples(systems: &[&SystemRecords]) -> Vec<MetricSeries> {
    let mut series = disk_series(systems);
    series.extend(cpu_series(systems));
    series.extend(memory_series(systems));
    series.extend(network_series(systems));
    series
}

/// Processor model string of the first system that reports one
pub fn cpu_model(systems: &[&SystemRecords]) -> Option<String> {
    systems.iter().find_map(|system| {
        system
            .category(Category::Cpu)
            .find(|r| r.attribute == "product")
            .map(|r| r.value.trim().to_string())
    })
}
