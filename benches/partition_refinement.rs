//! Fleet partitioning benchmark
//!
//! Compares the two ways of building the final partition over synthetic
//! fleets: sequential refinement pass by pass, and grouping by joint class
//! signature. Fingerprint construction for the default policy table is
//! measured separately.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench partition_refinement
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fleetaudit::fingerprint::build_all;
use fleetaudit::partition::Partition;
use fleetaudit::policy::PolicyTable;
use fleetaudit::record::{AttributeRecord, Category, SystemRecords};

/// A fleet with a few hardware variants per category
fn synthetic_fleet(size: usize) -> Vec<SystemRecords> {
    (0..size)
        .map(|i| {
            let records = vec![
                AttributeRecord::new(Category::System, "product", "serial", format!("S{:05}", i)),
                AttributeRecord::new(Category::System, "product", "name", "R630"),
                AttributeRecord::new(Category::Firmware, "bios", "version", format!("2.{}", i % 3)),
                AttributeRecord::new(Category::Disk, "sda", "size", if i % 7 == 0 { "1000" } else { "500" }),
                AttributeRecord::new(Category::Disk, "sda", "serial_number", format!("WD{}", i)),
                AttributeRecord::new(Category::Memory, "bank0", "size", "17179869184"),
                AttributeRecord::new(Category::Network, "eth0", "firmware-version", format!("{}", i % 2)),
                AttributeRecord::new(Category::Cpu, "physical_0", "product", "Intel(R) Xeon(R) CPU E5-2650 0 @ 2.00GHz"),
                AttributeRecord::new(Category::Ipmi, "CPU1 Temp", "value", format!("{}", 40 + i % 10)),
            ];
            SystemRecords::new(format!("S{:05}", i), records)
        })
        .collect()
}

fn bench_fingerprints(c: &mut Criterion) {
    let table = PolicyTable::default_policies().unwrap();
    let mut group = c.benchmark_group("build_all");

    for size in [100, 1_000] {
        let fleet = synthetic_fleet(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &fleet, |b, fleet| {
            b.iter(|| black_box(build_all(fleet, &table)))
        });
    }

    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let table = PolicyTable::default_policies().unwrap();
    let mut group = c.benchmark_group("partition");

    for size in [100, 1_000, 5_000] {
        let fleet = synthetic_fleet(size);
        let groupings = build_all(&fleet, &table);
        let ids: Vec<_> = fleet.iter().map(|s| s.id.clone()).collect();

        group.bench_with_input(BenchmarkId::new("refine_all", size), &groupings, |b, g| {
            b.iter(|| black_box(Partition::single(ids.iter().cloned()).refine_all(g)))
        });
        group.bench_with_input(BenchmarkId::new("joint", size), &groupings, |b, g| {
            b.iter(|| black_box(Partition::from_joint_fingerprints(ids.iter(), g)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprints, bench_partition);
criterion_main!(benches);
