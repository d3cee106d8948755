// Tolerance configuration for deviation classification
//
// Each metric family carries a (min%, max%) pair on the coefficient of
// variation. Below min the whole group is considered consistent; above max
// the group is unstable and no host is judged individually.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Coefficient-of-variation bounds in percent
///
/// # Example
/// ```
/// use fleetaudit::deviation::Tolerance;
///
/// let disk = Tolerance::new(2.0, 10.0);
/// assert!(disk.validate("disk").is_ok());
/// assert!(Tolerance::new(12.0, 10.0).validate("disk").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub min: f64,
    pub max: f64,
}

impl Tolerance {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Require `0 <= min <= max`, both finite
    pub fn validate(&self, family: &str) -> Result<()> {
        let ok = self.min.is_finite()
            && self.max.is_finite()
            && self.min >= 0.0
            && self.min <= self.max;
        if ok {
            Ok(())
        } else {
            Err(AuditError::InvalidTolerance {
                family: family.to_string(),
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Kind of benchmark a metric series comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Disk,
    /// Random-access disk modes, noisier by nature
    DiskRandom,
    Network,
    Cpu,
    CpuEfficiency,
    Memory,
    MemoryEfficiency,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 7] = [
        MetricFamily::Disk,
        MetricFamily::DiskRandom,
        MetricFamily::Network,
        MetricFamily::Cpu,
        MetricFamily::CpuEfficiency,
        MetricFamily::Memory,
        MetricFamily::MemoryEfficiency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFamily::Disk => "disk",
            MetricFamily::DiskRandom => "disk_random",
            MetricFamily::Network => "network",
            MetricFamily::Cpu => "cpu",
            MetricFamily::CpuEfficiency => "cpu_efficiency",
            MetricFamily::Memory => "memory",
            MetricFamily::MemoryEfficiency => "memory_efficiency",
        }
    }

    pub fn default_tolerance(&self) -> Tolerance {
        match self {
            MetricFamily::Disk => Tolerance::new(2.0, 10.0),
            MetricFamily::DiskRandom => Tolerance::new(5.0, 15.0),
            MetricFamily::Network => Tolerance::new(2.0, 15.0),
            MetricFamily::Cpu => Tolerance::new(2.0, 7.0),
            MetricFamily::CpuEfficiency => Tolerance::new(1.0, 2.0),
            MetricFamily::Memory => Tolerance::new(1.0, 7.0),
            MetricFamily::MemoryEfficiency => Tolerance::new(2.0, 10.0),
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricFamily {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        MetricFamily::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| AuditError::Config(format!("Unknown metric family '{}'", s.trim())))
    }
}

/// Tolerance per metric family
///
/// # Example TOML
/// ```toml
/// [tolerance.disk]
/// min = 2.0
/// max = 12.0
///
/// [tolerance.cpu_efficiency]
/// min = 1.0
/// max = 3.0
/// ```
///
/// Families not named in the file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceTable {
    tolerances: BTreeMap<MetricFamily, Tolerance>,
}

impl Default for ToleranceTable {
    fn default() -> Self {
        Self {
            tolerances: MetricFamily::ALL
                .iter()
                .map(|f| (*f, f.default_tolerance()))
                .collect(),
        }
    }
}

impl ToleranceTable {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ToleranceFile {
            #[serde(default)]
            tolerance: BTreeMap<String, Tolerance>,
        }

        let file: ToleranceFile = toml::from_str(content)?;
        let mut table = Self::default();
        for (name, tolerance) in file.tolerance {
            let family: MetricFamily = name.parse()?;
            table.set(family, tolerance)?;
        }
        Ok(table)
    }

    /// Override one family, rejecting invalid bounds
    pub fn set(&mut self, family: MetricFamily, tolerance: Tolerance) -> Result<()> {
        tolerance.validate(family.as_str())?;
        self.tolerances.insert(family, tolerance);
        Ok(())
    }

    pub fn get(&self, family: MetricFamily) -> Tolerance {
        self.tolerances
            .get(&family)
            .copied()
            .unwrap_or_else(|| family.default_tolerance())
    }
}
