//! Attribute record model
//!
//! Every piece of inspected hardware or benchmark output reaches the engine as
//! a 4-field record `(category, component, attribute, value)`, for example
//! `(disk, "1I:1:2", "current_temperature_(c)", "18")`. Values stay textual
//! even when they look numeric; only the sample extraction stage parses them.

use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hardware subsystem a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Disk,
    /// Physical disks behind a MegaRAID controller
    Pdisk,
    Cpu,
    Network,
    Memory,
    Hpa,
    Megaraid,
    Ahci,
    Ipmi,
    System,
    Firmware,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Disk,
        Category::Pdisk,
        Category::Cpu,
        Category::Network,
        Category::Memory,
        Category::Hpa,
        Category::Megaraid,
        Category::Ahci,
        Category::Ipmi,
        Category::System,
        Category::Firmware,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Disk => "disk",
            Category::Pdisk => "pdisk",
            Category::Cpu => "cpu",
            Category::Network => "network",
            Category::Memory => "memory",
            Category::Hpa => "hpa",
            Category::Megaraid => "megaraid",
            Category::Ahci => "ahci",
            Category::Ipmi => "ipmi",
            Category::System => "system",
            Category::Firmware => "firmware",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| AuditError::UnknownCategory(name.to_string()))
    }
}

/// Stable identifier of one machine (serial number or UUID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(String);

impl SystemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SystemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SystemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One inspected fact about one component of one system
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub category: Category,
    pub component: String,
    pub attribute: String,
    pub value: String,
}

impl AttributeRecord {
    pub fn new(
        category: Category,
        component: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            category,
            component: component.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Build a record from loosely typed fields
    ///
    /// Returns `None` when the field count is not four or the category is not
    /// one the engine knows about. Callers skip such records.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        let [category, component, attribute, value] = fields else {
            return None;
        };
        let category = category.parse().ok()?;
        Some(Self::new(category, *component, *attribute, *value))
    }

    /// The value parsed as a float, if it is numeric
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl fmt::Display for AttributeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.category, self.component, self.attribute, self.value
        )
    }
}

/// Which `system/product/*` record names a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityKey {
    #[default]
    Serial,
    Uuid,
}

impl IdentityKey {
    pub fn attribute(&self) -> &'static str {
        match self {
            IdentityKey::Serial => "serial",
            IdentityKey::Uuid => "uuid",
        }
    }
}

/// All records collected for one system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRecords {
    pub id: SystemId,
    pub records: Vec<AttributeRecord>,
}

impl SystemRecords {
    pub fn new(id: impl Into<SystemId>, records: Vec<AttributeRecord>) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }

    /// Identify a system from its own `(system, product, serial|uuid)` record
    pub fn identify(records: Vec<AttributeRecord>, key: IdentityKey) -> Option<Self> {
        let id = records
            .iter()
            .find(|r| {
                r.category == Category::System
                    && r.component == "product"
                    && r.attribute == key.attribute()
            })
            .map(|r| r.value.trim().to_string())
            .filter(|v| !v.is_empty())?;
        Some(Self::new(id, records))
    }

    /// Records of one category, in collection order
    pub fn category(&self, category: Category) -> impl Iterator<Item = &AttributeRecord> {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// First value recorded for an exact `(category, component, attribute)`
    pub fn value(&self, category: Category, component: &str, attribute: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.category == category && r.component == component && r.attribute == attribute)
            .map(|r| r.value.as_str())
    }
}
