use anyhow::{Context, Result};
use clap::Parser;
use fleetaudit::analysis::{AnalysisConfig, FleetAnalysis};
use fleetaudit::cli::{Cli, OutputFormat};
use fleetaudit::deviation::ToleranceTable;
use fleetaudit::input::load_system;
use fleetaudit::policy::PolicyTable;
use fleetaudit::report::{DetailSelector, JsonReport, ReportConfig, TextReport};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn analysis_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::with_defaults()?;
    if let Some(path) = &args.policies {
        config.policies = PolicyTable::from_toml(path)
            .with_context(|| format!("failed to load policies from {}", path.display()))?;
    }
    if let Some(path) = &args.tolerances {
        config.tolerances = ToleranceTable::from_toml(path)
            .with_context(|| format!("failed to load tolerances from {}", path.display()))?;
    }
    Ok(config.ignoring(args.ignore.iter().copied()))
}

fn report_config(args: &Cli) -> Result<ReportConfig> {
    let detail = match (&args.group, &args.metric, &args.item) {
        (Some(group), Some(metric), Some(item)) => Some(DetailSelector::new(group, metric, item)?),
        (None, None, None) => None,
        _ => anyhow::bail!("--group, --metric and --item must be given together"),
    };
    Ok(ReportConfig::new(args.log_level.iter().copied(), detail)?)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if !args.diff.is_empty() && args.diff_pair().is_none() {
        anyhow::bail!(
            "Invalid value for --diff: expected two group ids, got {}",
            args.diff.len()
        );
    }

    init_tracing(args.debug);

    let config = analysis_config(&args)?;
    let report = report_config(&args)?;

    let mut systems = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let system = load_system(path, args.identity_key())
            .with_context(|| format!("failed to load {}", path.display()))?;
        systems.extend(system);
    }
    if systems.is_empty() {
        anyhow::bail!("no system could be identified in the given dumps");
    }

    let analysis = FleetAnalysis::run(systems, &config);
    let performance = analysis.classify_groups(&config);
    let explained = match args.diff_pair() {
        Some((a, b)) => Some((a, b, analysis.explain(a, b)?)),
        None => None,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.format {
        OutputFormat::Json => {
            let mut json = JsonReport::new(&analysis, &performance);
            if let Some((a, b, diffs)) = &explained {
                json = json.with_diff(*a, *b, diffs);
            }
            writeln!(out, "{}", json.to_json()?)?;
        }
        OutputFormat::Text => {
            let mut text = TextReport::new(&mut out, &report);
            text.write_groups(&analysis)?;
            text.write_groupings(&analysis)?;
            text.write_links(&analysis)?;
            for group in &performance {
                text.write_performance(group)?;
            }
            if let Some((a, b, diffs)) = &explained {
                text.write_diff(*a, *b, diffs)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
