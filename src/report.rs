//! Text and JSON reports
//!
//! Text lines follow a fixed layout, `<mode:34> : <LEVEL:8> : <message>`, so
//! that runs can be grepped and diffed. Which levels appear is an explicit
//! [`ReportConfig`] passed by the caller.

use crate::analysis::{
    CategoryDiff, FleetAnalysis, GroupLink, GroupPerformance, MetricReport, ModeSummary,
};
use crate::deviation::{GroupVerdict, HostStatus, ReferenceGrade, StatusKind};
use crate::diff::TierSet;
use crate::error::{AuditError, Result};
use crate::partition::Group;
use crate::record::Category;
use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportLevel {
    /// Group statistics and consistent verdicts
    Info,
    /// Curious hosts and suspicious groups
    Warning,
    /// Unstable groups
    Error,
    /// Per-status host counts with reference grades
    Summary,
    /// Raw values of selected metrics
    Detail,
}

impl ReportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLevel::Info => "INFO",
            ReportLevel::Warning => "WARNING",
            ReportLevel::Error => "ERROR",
            ReportLevel::Summary => "SUMMARY",
            ReportLevel::Detail => "DETAIL",
        }
    }
}

/// Picks the metrics printed at DETAIL level
///
/// Each part matches when it is a substring of the candidate or when its
/// regex finds a match in it.
#[derive(Debug, Clone)]
pub struct DetailSelector {
    group: (String, Regex),
    metric: (String, Regex),
    item: (String, Regex),
}

fn selector_part(name: &str, pattern: &str) -> Result<(String, Regex)> {
    let regex = Regex::new(pattern).map_err(|source| AuditError::InvalidPattern {
        pass: format!("detail {}", name),
        source,
    })?;
    Ok((pattern.to_string(), regex))
}

fn part_matches((raw, regex): &(String, Regex), candidate: &str) -> bool {
    candidate.contains(raw.as_str()) || regex.is_match(candidate)
}

impl DetailSelector {
    pub fn new(group: &str, metric: &str, item: &str) -> Result<Self> {
        Ok(Self {
            group: selector_part("group", group)?,
            metric: selector_part("metric", metric)?,
            item: selector_part("item", item)?,
        })
    }

    pub fn matches(&self, group: usize, mode: &str, component: &str) -> bool {
        part_matches(&self.group, &group.to_string())
            && part_matches(&self.metric, mode)
            && part_matches(&self.item, component)
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    levels: BTreeSet<ReportLevel>,
    detail: Option<DetailSelector>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            levels: BTreeSet::from([ReportLevel::Summary]),
            detail: None,
        }
    }
}

impl ReportConfig {
    pub fn new(
        levels: impl IntoIterator<Item = ReportLevel>,
        detail: Option<DetailSelector>,
    ) -> Result<Self> {
        let config = Self {
            levels: levels.into_iter().collect(),
            detail,
        };
        config.validate()?;
        Ok(config)
    }

    /// Every level, no detail selector
    pub fn verbose() -> Self {
        Self {
            levels: BTreeSet::from([
                ReportLevel::Info,
                ReportLevel::Warning,
                ReportLevel::Error,
                ReportLevel::Summary,
            ]),
            detail: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(AuditError::Config("at least one report level is required".into()));
        }
        if self.levels.contains(&ReportLevel::Detail) && self.detail.is_none() {
            return Err(AuditError::Config(
                "DETAIL level requires group, metric and item selectors".into(),
            ));
        }
        Ok(())
    }

    pub fn enabled(&self, level: ReportLevel) -> bool {
        self.levels.contains(&level)
    }
}

/// Text report writer bound to one configuration
pub struct TextReport<'a, W: Write> {
    out: W,
    config: &'a ReportConfig,
}

impl<'a, W: Write> TextReport<'a, W> {
    pub fn new(out: W, config: &'a ReportConfig) -> Self {
        Self { out, config }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, mode: &str, level: ReportLevel, msg: &str) -> io::Result<()> {
        if !self.config.enabled(level) {
            return Ok(());
        }
        writeln!(self.out, "{:<34}: {:<8}: {}", mode, level.as_str(), msg)
    }

    /// Final partition, always printed
    pub fn write_groups(&mut self, analysis: &FleetAnalysis) -> io::Result<()> {
        let groups = analysis.groups();
        writeln!(
            self.out,
            "The {} systems can be grouped in {} groups of identical hardware",
            analysis.system_count(),
            groups.len()
        )?;
        for group in groups {
            write_group(&mut self.out, group)?;
        }
        Ok(())
    }

    /// Equivalence classes of every pass, at INFO level
    pub fn write_groupings(&mut self, analysis: &FleetAnalysis) -> io::Result<()> {
        if !self.config.enabled(ReportLevel::Info) {
            return Ok(());
        }
        for grouping in analysis.groupings() {
            writeln!(self.out, "##### {} #####", grouping.pass)?;
            for class in &grouping.classes {
                let members: Vec<&str> = class.members.iter().map(|m| m.as_str()).collect();
                writeln!(self.out, "{} identical systems :", members.len())?;
                writeln!(self.out, "-> {}", members.join(", "))?;
                for record in class.fingerprint.records() {
                    writeln!(
                        self.out,
                        "   ({}, {}, {})",
                        record.component, record.attribute, record.value
                    )?;
                }
            }
            writeln!(self.out, "{}", "#".repeat(12 + grouping.pass.len()))?;
        }
        Ok(())
    }

    /// Pairwise group links and shared passes, at INFO level
    pub fn write_links(&mut self, analysis: &FleetAnalysis) -> io::Result<()> {
        let shared = analysis.shared_categories().join(", ");
        self.line("Groups", ReportLevel::Info, &format!("Shared categories : {}", shared))?;
        for link in analysis.links() {
            self.line(
                "Groups",
                ReportLevel::Info,
                &format!(
                    "Group {} <-> Group {} : differs in {}",
                    link.a,
                    link.b,
                    link.differing.join(", ")
                ),
            )?;
        }
        Ok(())
    }

    pub fn write_performance(&mut self, performance: &GroupPerformance) -> io::Result<()> {
        if performance.metrics.is_empty() {
            return Ok(());
        }
        writeln!(self.out)?;
        writeln!(self.out, "Group {} : Checking performance", performance.group)?;

        for summary in &performance.modes {
            for metric in performance.metrics.iter().filter(|m| m.series.mode == summary.mode) {
                self.write_metric(performance.group, metric)?;
            }
            self.write_summary(summary)?;
        }
        Ok(())
    }

    fn write_metric(&mut self, group: usize, metric: &MetricReport) -> io::Result<()> {
        let series = &metric.series;
        let c = &metric.classification;
        let s = &c.statistics;
        let mode = series.mode.as_str();
        let title = series.component.as_str();
        let unit = series.unit();

        self.line(
            mode,
            ReportLevel::Info,
            &format!(
                "{:<12} : Group performance : min={:8.2}, mean={:8.2}, max={:8.2}, stddev={:8.2}",
                title, s.min, s.mean, s.max, s.stddev
            ),
        )?;

        match c.verdict() {
            GroupVerdict::Unstable => {
                self.line(
                    mode,
                    ReportLevel::Error,
                    &format!(
                        "{:<12} : Group's variance is too important : {:7.2}% of {:7.2} whereas limit is set to {:3.2}%",
                        title, s.coefficient_of_variation, s.mean, c.tolerance.max
                    ),
                )?;
                self.line(
                    mode,
                    ReportLevel::Error,
                    &format!("{:<12} : Group performance : UNSTABLE", title),
                )?;
            }
            verdict => {
                for (host, status) in &c.hosts {
                    let value = series.values.get(host).copied().unwrap_or(f64::NAN);
                    let (kind, percent, side) = match status {
                        HostStatus::CuriousOver { percent_above } => {
                            ("overperformance ", percent_above, "above max")
                        }
                        HostStatus::CuriousUnder { percent_below } => {
                            ("underperformance", percent_below, "below min")
                        }
                        _ => continue,
                    };
                    self.line(
                        mode,
                        ReportLevel::Warning,
                        &format!(
                            "{:<12} : {} : Curious {} {:7.2} : min_allow_group = {:.2}, mean_group = {:.2} max_allow_group = {:.2}, {:3.2}% {}",
                            title,
                            host,
                            kind,
                            value,
                            s.lower_band(),
                            s.mean,
                            s.upper_band(),
                            percent,
                            side
                        ),
                    )?;
                }
                let (level, word) = if verdict == GroupVerdict::Suspicious {
                    (ReportLevel::Warning, "SUSPICIOUS")
                } else {
                    (ReportLevel::Info, "CONSISTENT")
                };
                self.line(
                    mode,
                    level,
                    &format!("{:<12} : Group performance = {:7.2} {} : {}", title, s.mean, unit, word),
                )?;
            }
        }

        self.write_detail(group, metric)
    }

    /// Per-status host counts of one mode, hosts summed over components
    fn write_summary(&mut self, summary: &ModeSummary) -> io::Result<()> {
        for kind in [StatusKind::Consistent, StatusKind::Curious, StatusKind::Unstable] {
            let totals = summary.totals_of(kind);
            if totals.is_empty() {
                continue;
            }
            let n = totals.len() as f64;
            let mean = totals.iter().sum::<f64>() / n;
            let spread = (totals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

            let grade = match (&summary.reference, kind) {
                (Some(grade), StatusKind::Consistent) => grade_text(grade),
                _ => String::new(),
            };

            self.line(
                &summary.mode,
                ReportLevel::Summary,
                format!(
                    "{:3} {:<10} hosts with {:8.2} {:<4} as average value and {:8.2} standard deviation {}",
                    totals.len(),
                    kind.as_str(),
                    mean,
                    summary.unit,
                    spread,
                    grade
                )
                .trim_end(),
            )?;
        }
        Ok(())
    }

    fn write_detail(&mut self, group: usize, metric: &MetricReport) -> io::Result<()> {
        if !self.config.enabled(ReportLevel::Detail) {
            return Ok(());
        }
        let Some(selector) = &self.config.detail else {
            return Ok(());
        };
        let series = &metric.series;
        if !selector.matches(group, &series.mode, &series.component) {
            return Ok(());
        }

        self.line(&series.mode, ReportLevel::Detail, &series.component)?;
        for (host, value) in &series.values {
            writeln!(self.out, "    {:<24} {:>14.2}", host.as_str(), value)?;
        }
        Ok(())
    }

    /// Nested explanation of why two groups differ
    pub fn write_diff(&mut self, a: usize, b: usize, diffs: &[CategoryDiff]) -> io::Result<()> {
        writeln!(self.out, "##### Group {} vs Group {} #####", a, b)?;
        if diffs.is_empty() {
            writeln!(self.out, "No difference")?;
        }
        for category_diff in diffs {
            writeln!(self.out, "== {} ==", category_diff.pass)?;
            write_side(&mut self.out, &format!("Only in group {}", a), &category_diff.report.only_a)?;
            write_side(&mut self.out, &format!("Only in group {}", b), &category_diff.report.only_b)?;
        }
        Ok(())
    }
}

fn grade_text(grade: &ReferenceGrade) -> String {
    match grade {
        ReferenceGrade::Pass { .. } => ": PERF OK".to_string(),
        ReferenceGrade::Fail { expected_min } => {
            format!(": PERF FAIL as min perf should have been : {}", expected_min)
        }
        ReferenceGrade::NoEntry { model } if model.trim().is_empty() => {
            ": NO PERF ENTRY IN DB for unknown model".to_string()
        }
        ReferenceGrade::NoEntry { model } => format!(": NO PERF ENTRY IN DB for {}", model),
    }
}

fn write_group<W: Write>(out: &mut W, group: &Group) -> io::Result<()> {
    let members: Vec<&str> = group.members.iter().map(|m| m.as_str()).collect();
    writeln!(out, "Group {} ({} Systems)", group.id, members.len())?;
    writeln!(out, "-> {}", members.join(", "))?;
    writeln!(out)
}

fn write_side<W: Write>(out: &mut W, title: &str, tiers: &TierSet) -> io::Result<()> {
    if tiers.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}:", title)?;
    for component in tiers.nested() {
        if component.whole {
            writeln!(out, "  {} (whole component)", component.component)?;
            continue;
        }
        writeln!(out, "  {}", component.component)?;
        for attribute in &component.attributes {
            writeln!(out, "    {} (attribute)", attribute)?;
        }
        for (attribute, value) in &component.values {
            writeln!(out, "    {} = {}", attribute, value)?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct JsonClass<'a> {
    pub key: &'a str,
    pub members: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct JsonGrouping<'a> {
    pub pass: &'a str,
    pub category: Category,
    pub classes: Vec<JsonClass<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonDiff<'a> {
    pub a: usize,
    pub b: usize,
    pub categories: &'a [CategoryDiff],
}

/// Machine-readable view of a whole run
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub systems: usize,
    pub groups: &'a [Group],
    pub groupings: Vec<JsonGrouping<'a>>,
    pub shared_categories: Vec<&'a str>,
    pub links: Vec<GroupLink>,
    pub performance: &'a [GroupPerformance],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<JsonDiff<'a>>,
}

impl<'a> JsonReport<'a> {
    pub fn new(analysis: &'a FleetAnalysis, performance: &'a [GroupPerformance]) -> Self {
        Self {
            systems: analysis.system_count(),
            groups: analysis.groups(),
            groupings: analysis
                .groupings()
                .iter()
                .map(|g| JsonGrouping {
                    pass: &g.pass,
                    category: g.category,
                    classes: g
                        .classes
                        .iter()
                        .map(|c| JsonClass {
                            key: &c.key,
                            members: c.members.iter().map(|m| m.as_str()).collect(),
                        })
                        .collect(),
                })
                .collect(),
            shared_categories: analysis.shared_categories(),
            links: analysis.links(),
            performance,
            diff: None,
        }
    }

    pub fn with_diff(mut self, a: usize, b: usize, categories: &'a [CategoryDiff]) -> Self {
        self.diff = Some(JsonDiff { a, b, categories });
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisConfig;
    use crate::record::{AttributeRecord, SystemRecords};

    fn system(id: &str, size: &str, kbps: &str) -> SystemRecords {
        SystemRecords::new(
            id,
            vec![
                AttributeRecord::new(Category::Disk, "sda", "size", size),
                AttributeRecord::new(Category::Disk, "sda", "standalone_read_1M_KBps", kbps),
            ],
        )
    }

    fn analysis() -> (FleetAnalysis, AnalysisConfig) {
        let config = AnalysisConfig::with_defaults().unwrap();
        let mut systems: Vec<SystemRecords> = (0..9)
            .map(|i| system(&format!("h{}", i), "500", "100"))
            .collect();
        systems.push(system("h9", "500", "130"));
        systems.push(system("z1", "1000", "100"));
        (FleetAnalysis::run(systems, &config), config)
    }

    fn render(config: &ReportConfig, f: impl FnOnce(&mut TextReport<'_, Vec<u8>>)) -> String {
        let mut report = TextReport::new(Vec::new(), config);
        f(&mut report);
        String::from_utf8(report.into_inner()).unwrap()
    }

    #[test]
    fn test_report_config_validation() {
        assert!(ReportConfig::new(Vec::new(), None).is_err());
        assert!(ReportConfig::new([ReportLevel::Detail], None).is_err());

        let selector = DetailSelector::new("0", "KBps", "sda").unwrap();
        assert!(ReportConfig::new([ReportLevel::Detail], Some(selector)).is_ok());
        assert!(DetailSelector::new("(", "x", "y").is_err());
    }

    #[test]
    fn test_detail_selector_matching() {
        let selector = DetailSelector::new("1", "KBps", "sd.").unwrap();
        assert!(selector.matches(1, "standalone_read_1M_KBps", "sdb"));
        assert!(!selector.matches(2, "standalone_read_1M_KBps", "sdb"));
        assert!(!selector.matches(1, "standalone_read_1M_IOps", "sdb"));
    }

    #[test]
    fn test_write_groups() {
        let (analysis, _) = analysis();
        let out = render(&ReportConfig::default(), |r| r.write_groups(&analysis).unwrap());

        assert!(out.starts_with("The 11 systems can be grouped in 2 groups of identical hardware"));
        assert!(out.contains("Group 0 (10 Systems)"));
        assert!(out.contains("Group 1 (1 Systems)\n-> z1"));
    }

    #[test]
    fn test_write_performance_levels() {
        let (analysis, config) = analysis();
        let performance = analysis.classify_groups(&config);

        let verbose = ReportConfig::verbose();
        let out = render(&verbose, |r| r.write_performance(&performance[0]).unwrap());
        assert!(out.contains("Group 0 : Checking performance"));
        assert!(out.contains(&format!(
            "{:<34}: WARNING : {:<12} : h9 : Curious overperformance ",
            "standalone_read_1M_KBps", "sda"
        )));
        assert!(out.contains("6.58% above max"));
        assert!(out.contains("SUSPICIOUS"));
        assert!(out.contains("  9 consistent hosts with"));
        assert!(out.contains("  1 curious    hosts with"));

        let summary_only = ReportConfig::default();
        let out = render(&summary_only, |r| r.write_performance(&performance[0]).unwrap());
        assert!(!out.contains("WARNING"));
        assert!(out.contains("SUMMARY"));
    }

    fn cpu_fleet(core0: impl Fn(usize) -> &'static str, core1: impl Fn(usize) -> &'static str) -> Vec<SystemRecords> {
        (0..10)
            .map(|i| {
                SystemRecords::new(
                    format!("h{}", i),
                    vec![
                        AttributeRecord::new(Category::Cpu, "logical_0", "loops_per_sec", core0(i)),
                        AttributeRecord::new(Category::Cpu, "logical_1", "loops_per_sec", core1(i)),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn test_mode_summary_rolls_up_curious_before_unstable() {
        let systems = cpu_fleet(
            |i| if i == 9 { "440" } else { "400" },
            |i| if i < 5 { "300" } else { "500" },
        );
        let config = AnalysisConfig::with_defaults().unwrap();
        let analysis = FleetAnalysis::run(systems, &config);
        let performance = analysis.classify_groups(&config);

        let out = render(&ReportConfig::verbose(), |r| {
            r.write_performance(&performance[0]).unwrap()
        });
        assert!(out.contains(&format!("{:<12} : Group performance : UNSTABLE", "logical_1")));
        assert!(out.contains(&format!(
            "{:<34}: SUMMARY : {:3} {:<10} hosts with {:8.2}",
            "loops_per_sec", 1, "curious", 940.0
        )));
        assert!(out.contains(&format!(
            "{:<34}: SUMMARY : {:3} {:<10} hosts with",
            "loops_per_sec", 9, "unstable"
        )));
        assert!(!out.contains("consistent hosts with"));

        let json = JsonReport::new(&analysis, &performance).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let mode = &value["performance"][0]["modes"][0];
        assert_eq!(mode["mode"], "loops_per_sec");
        assert_eq!(mode["hosts"]["h9"], "curious");
        assert_eq!(mode["hosts"]["h0"], "unstable");
        assert_eq!(mode["totals"]["h9"], 940.0);
    }

    #[test]
    fn test_missing_cpu_model_has_placeholder() {
        let systems = cpu_fleet(|_| "400", |_| "400");
        let config = AnalysisConfig::with_defaults().unwrap();
        let analysis = FleetAnalysis::run(systems, &config);
        let performance = analysis.classify_groups(&config);

        let out = render(&ReportConfig::default(), |r| {
            r.write_performance(&performance[0]).unwrap()
        });
        assert!(out.contains(" 10 consistent hosts with   800.00"));
        assert!(out.ends_with(": NO PERF ENTRY IN DB for unknown model\n"));

        let named = ReferenceGrade::NoEntry {
            model: "AMD Opteron(tm) 6272".to_string(),
        };
        assert_eq!(grade_text(&named), ": NO PERF ENTRY IN DB for AMD Opteron(tm) 6272");
    }

    #[test]
    fn test_write_detail() {
        let (analysis, config) = analysis();
        let performance = analysis.classify_groups(&config);
        let selector = DetailSelector::new("0", "KBps", "sda").unwrap();
        let detail = ReportConfig::new([ReportLevel::Detail], Some(selector)).unwrap();

        let out = render(&detail, |r| r.write_performance(&performance[0]).unwrap());
        assert!(out.contains(": DETAIL  : sda"));
        assert!(out.contains("h9"));
        assert!(out.contains("130.00"));
    }

    #[test]
    fn test_write_diff() {
        let (analysis, _) = analysis();
        let diffs = analysis.explain(0, 1).unwrap();
        let out = render(&ReportConfig::default(), |r| r.write_diff(0, 1, &diffs).unwrap());

        assert!(out.contains("##### Group 0 vs Group 1 #####"));
        assert!(out.contains("== Logical Disks =="));
        assert!(out.contains("Only in group 0:\n  sda\n    size = 500"));
        assert!(out.contains("Only in group 1:\n  sda\n    size = 1000"));
    }

    #[test]
    fn test_json_report() {
        let (analysis, config) = analysis();
        let performance = analysis.classify_groups(&config);
        let diffs = analysis.explain(0, 1).unwrap();

        let json = JsonReport::new(&analysis, &performance)
            .with_diff(0, 1, &diffs)
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["systems"], 11);
        assert_eq!(value["groups"].as_array().unwrap().len(), 2);
        assert_eq!(value["groups"][1]["members"][0], "z1");
        assert_eq!(value["links"][0]["differing"][0], "Logical Disks");
        assert_eq!(value["diff"]["categories"][0]["pass"], "Logical Disks");
        assert_eq!(
            value["performance"][0]["metrics"][0]["classification"]["hosts"]["h9"]["status"],
            "curious_over"
        );
    }
}
