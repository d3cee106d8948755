//! CLI argument parsing for fleetaudit

use crate::record::{Category, IdentityKey};
use crate::report::ReportLevel;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "fleetaudit")]
#[command(version)]
#[command(
    about = "Group servers by identical hardware and flag benchmark outliers within each group",
    long_about = None
)]
pub struct Cli {
    /// Fleet dump files, one JSON array of [category, component, attribute, value] per system
    #[arg(required = true, value_name = "DUMP")]
    pub inputs: Vec<PathBuf>,

    /// Identify systems by UUID instead of serial number
    #[arg(long)]
    pub uuid: bool,

    /// Hardware categories to leave out of grouping (e.g., -I disk,ipmi)
    #[arg(short = 'I', long = "ignore", value_name = "CATEGORY", value_delimiter = ',')]
    pub ignore: Vec<Category>,

    /// TOML file replacing the built-in category policies
    #[arg(long = "policies", value_name = "FILE")]
    pub policies: Option<PathBuf>,

    /// TOML file overriding per-family tolerances
    #[arg(long = "tolerances", value_name = "FILE")]
    pub tolerances: Option<PathBuf>,

    /// Report levels to print (e.g., -l info,warning,summary)
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        value_delimiter = ',',
        ignore_case = true,
        default_value = "summary"
    )]
    pub log_level: Vec<ReportLevel>,

    /// Group selector for DETAIL output (regex)
    #[arg(short = 'g', long = "group", value_name = "REGEX")]
    pub group: Option<String>,

    /// Metric selector for DETAIL output (regex)
    #[arg(short = 'm', long = "metric", value_name = "REGEX")]
    pub metric: Option<String>,

    /// Component selector for DETAIL output (regex)
    #[arg(short = 'i', long = "item", value_name = "REGEX")]
    pub item: Option<String>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Explain the difference between two groups (e.g., --diff 0,2)
    #[arg(long = "diff", value_name = "A,B", value_delimiter = ',')]
    pub diff: Vec<usize>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    pub fn identity_key(&self) -> IdentityKey {
        if self.uuid {
            IdentityKey::Uuid
        } else {
            IdentityKey::Serial
        }
    }

    /// The pair of groups to diff, when exactly two ids were given
    pub fn diff_pair(&self) -> Option<(usize, usize)> {
        match self.diff.as_slice() {
            [a, b] => Some((*a, *b)),
            _ => None,
        }
    }
}
