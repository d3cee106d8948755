// Tests for deviation classification
//
// Fixed series below have hand-checked arithmetic:
// - [100 x9, 130]: mean 103, sd sqrt(90), upper band 121.9737
// - [100 x9, 70]:  mean 97,  sd sqrt(90), lower band 78.0263

use super::*;
use crate::record::SystemId;
use std::collections::BTreeMap;

fn samples(values: &[f64]) -> BTreeMap<SystemId, f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (SystemId::from(format!("host{:02}", i)), *v))
        .collect()
}

fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

const DISK: Tolerance = Tolerance::new(2.0, 15.0);

#[test]
fn test_constant_series_all_consistent() {
    let c = classify("read_KBps", &samples(&[10.0, 10.0, 10.0, 10.0]), DISK).unwrap();

    assert_eq!(c.statistics.coefficient_of_variation, 0.0);
    assert!(c.hosts.values().all(|s| *s == HostStatus::Consistent));
    assert_eq!(c.verdict(), GroupVerdict::Consistent);
}

#[test]
fn test_high_variance_all_unstable() {
    let c = classify("loops_per_sec", &samples(&[1.0, 1.0, 1.0, 100.0]), DISK).unwrap();

    assert!(c.statistics.coefficient_of_variation > 15.0);
    assert_eq!(c.hosts.len(), 4);
    assert!(c.hosts.values().all(|s| *s == HostStatus::Unstable));
    assert_eq!(c.verdict(), GroupVerdict::Unstable);
    assert_eq!(c.hosts_with(StatusKind::Unstable).len(), 4);
}

#[test]
fn test_two_sigma_arithmetic() {
    let data = samples(&[100.0, 105.0, 95.0, 1000.0]);
    let c = classify("bogomips", &data, Tolerance::new(2.0, 15.0)).unwrap();

    assert!(approx(c.statistics.mean, 325.0, 1e-9));
    assert!(approx(c.statistics.stddev, 450.0185, 1e-3));
    assert!(approx(c.statistics.upper_band(), 1225.037, 1e-2));
    assert!(approx(c.statistics.lower_band(), -575.037, 1e-2));
    assert_eq!(c.verdict(), GroupVerdict::Unstable);

    // With a loose maximum the outlier stays inside the band
    let loose = classify("bogomips", &data, Tolerance::new(2.0, 200.0)).unwrap();
    assert!(loose.hosts.values().all(|s| *s == HostStatus::Consistent));
}

#[test]
fn test_curious_over() {
    let mut values = vec![100.0; 9];
    values.push(130.0);
    let c = classify("standalone_read_1M_KBps", &samples(&values), DISK).unwrap();

    assert!(approx(c.statistics.coefficient_of_variation, 9.2105, 1e-3));
    assert!(approx(c.statistics.upper_band(), 121.9737, 1e-3));

    match c.hosts[&SystemId::from("host09")] {
        HostStatus::CuriousOver { percent_above } => {
            assert!(approx(percent_above, 6.5804, 1e-3));
        }
        other => panic!("expected CuriousOver, got {:?}", other),
    }
    assert_eq!(c.hosts_with(StatusKind::Curious).len(), 1);
    assert_eq!(c.hosts_with(StatusKind::Consistent).len(), 9);
    assert_eq!(c.verdict(), GroupVerdict::Suspicious);
}

#[test]
fn test_curious_under() {
    let mut values = vec![100.0; 9];
    values.push(70.0);
    let c = classify("standalone_read_1M_KBps", &samples(&values), DISK).unwrap();

    match c.hosts[&SystemId::from("host09")] {
        HostStatus::CuriousUnder { percent_below } => {
            assert!(approx(percent_below, 10.2867, 1e-3));
        }
        other => panic!("expected CuriousUnder, got {:?}", other),
    }
}

#[test]
fn test_below_tolerance_min_skips_band_check() {
    let mut values = vec![100.0; 9];
    values.push(130.0);
    let c = classify("x", &samples(&values), Tolerance::new(10.0, 15.0)).unwrap();

    assert!(c.hosts.values().all(|s| *s == HostStatus::Consistent));
}

#[test]
fn test_single_sample_consistent() {
    let c = classify("x", &samples(&[42.0]), Tolerance::new(0.0, 0.0)).unwrap();

    assert_eq!(c.statistics.coefficient_of_variation, 0.0);
    assert_eq!(c.hosts[&SystemId::from("host00")], HostStatus::Consistent);
}

#[test]
fn test_empty_series_skipped() {
    assert!(classify("x", &BTreeMap::new(), DISK).is_none());
    assert!(classify("x", &samples(&[f64::NAN]), DISK).is_none());
}

#[test]
fn test_non_finite_hosts_dropped() {
    let c = classify("x", &samples(&[10.0, f64::NAN, 10.0]), DISK).unwrap();
    assert_eq!(c.hosts.len(), 2);
    assert!(!c.hosts.contains_key(&SystemId::from("host01")));
}

#[test]
fn test_values_of() {
    let mut values = vec![100.0; 9];
    values.push(130.0);
    let data = samples(&values);
    let c = classify("x", &data, DISK).unwrap();

    assert_eq!(c.values_of(StatusKind::Curious, &data), vec![130.0]);
    assert_eq!(c.values_of(StatusKind::Consistent, &data).len(), 9);
}

#[test]
fn test_rollup_precedence() {
    let mut over = vec![100.0; 9];
    over.push(130.0);
    let curious = classify("a", &samples(&over), DISK).unwrap();
    let unstable = classify("b", &samples(&[1.0, 1.0, 1.0, 100.0]), DISK).unwrap();
    let consistent = classify("c", &samples(&[5.0, 5.0]), DISK).unwrap();

    let hosts = rollup([&curious, &unstable, &consistent]);

    assert_eq!(hosts[&SystemId::from("host09")], StatusKind::Curious);
    assert_eq!(hosts[&SystemId::from("host00")], StatusKind::Unstable);
    assert_eq!(hosts[&SystemId::from("host05")], StatusKind::Consistent);
}

#[test]
fn test_default_tolerances() {
    let table = ToleranceTable::default();

    assert_eq!(table.get(MetricFamily::Disk), Tolerance::new(2.0, 10.0));
    assert_eq!(table.get(MetricFamily::DiskRandom), Tolerance::new(5.0, 15.0));
    assert_eq!(table.get(MetricFamily::Network), Tolerance::new(2.0, 15.0));
    assert_eq!(table.get(MetricFamily::Cpu), Tolerance::new(2.0, 7.0));
    assert_eq!(table.get(MetricFamily::CpuEfficiency), Tolerance::new(1.0, 2.0));
    assert_eq!(table.get(MetricFamily::Memory), Tolerance::new(1.0, 7.0));
    assert_eq!(table.get(MetricFamily::MemoryEfficiency), Tolerance::new(2.0, 10.0));
}

#[test]
fn test_tolerance_table_from_toml() {
    let table = ToleranceTable::from_toml_str(
        r#"
[tolerance.disk]
min = 3.0
max = 12.0
"#,
    )
    .unwrap();

    assert_eq!(table.get(MetricFamily::Disk), Tolerance::new(3.0, 12.0));
    assert_eq!(table.get(MetricFamily::Cpu), Tolerance::new(2.0, 7.0));
}

#[test]
fn test_tolerance_table_rejects_bad_bounds() {
    let err = ToleranceTable::from_toml_str(
        r#"
[tolerance.cpu]
min = 8.0
max = 7.0
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        crate::error::AuditError::InvalidTolerance { ref family, .. } if family == "cpu"
    ));

    assert!(Tolerance::new(-1.0, 5.0).validate("disk").is_err());
    assert!(Tolerance::new(1.0, f64::NAN).validate("disk").is_err());
}

#[test]
fn test_tolerance_table_rejects_unknown_family() {
    let result = ToleranceTable::from_toml_str("[tolerance.gpu]\nmin = 1.0\nmax = 2.0\n");
    assert!(matches!(result, Err(crate::error::AuditError::Config(_))));
}

#[test]
fn test_reference_lookup_longest_match() {
    let table = ReferenceTable::builtin();

    assert_eq!(
        table.lookup(ReferenceKind::LoopsPerSec, "Intel(R) Xeon(R) CPU E5-2650 0 @ 2.00GHz"),
        Some(450.0)
    );
    assert_eq!(
        table.lookup(ReferenceKind::LoopsPerSec, "Intel(R) Xeon(R) CPU E5-2650 v2 @ 2.60GHz"),
        Some(420.0)
    );
    assert_eq!(
        table.lookup(ReferenceKind::Bogomips, "Intel(R) Xeon(R) CPU E5-2680 0 @ 2.70GHz"),
        Some(3500.0)
    );
    assert_eq!(
        table.lookup(ReferenceKind::Bogomips, "Intel(R) Xeon(R) CPU L5640 @ 2.27GHz"),
        Some(3000.0)
    );
    assert_eq!(table.lookup(ReferenceKind::LoopsPerSec, "AMD Opteron(tm) 6272"), None);
}

#[test]
fn test_reference_grade() {
    let table = ReferenceTable::builtin();
    let model = "Intel(R) Xeon(R) CPU X5675 @ 3.07GHz";

    assert_eq!(
        table.grade(ReferenceKind::LoopsPerSec, model, 700.0),
        ReferenceGrade::Pass { expected_min: 680.0 }
    );
    assert_eq!(
        table.grade(ReferenceKind::LoopsPerSec, model, 600.0),
        ReferenceGrade::Fail { expected_min: 680.0 }
    );
    assert!(matches!(
        table.grade(ReferenceKind::Bogomips, "AMD EPYC 7742", 5000.0),
        ReferenceGrade::NoEntry { .. }
    ));
}

#[test]
fn test_reference_kind_from_mode() {
    assert_eq!(ReferenceKind::from_mode("loops_per_sec"), Some(ReferenceKind::LoopsPerSec));
    assert_eq!(ReferenceKind::from_mode("bogomips"), Some(ReferenceKind::Bogomips));
    assert_eq!(ReferenceKind::from_mode("bandwidth_1M"), None);
}
