use crate::error::{AuditError, Result};
use crate::record::Category;
use regex::Regex;
use serde::{Deserialize, Serialize};

fn default_pattern() -> String {
    ".*".to_string()
}

/// One grouping pass over a hardware category, loaded from TOML
///
/// # Example TOML
/// ```toml
/// [[category]]
/// name = "Logical Disks"
/// category = "disk"
/// pattern = '[a-z]d(\S+)'
/// exclude = ["simultaneous", "standalone", "id", "serial_number", "SMART/"]
/// override = ["when_failed", "vendor", "product", "health"]
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CategoryPolicy {
    /// Display title of the pass (e.g., "HPA Disks")
    pub name: String,

    /// Hardware category name (e.g., "disk", "pdisk", "ipmi")
    pub category: String,

    /// Regex matched at the start of the component id
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Components whose id matches this regex anywhere are skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_pattern: Option<String>,

    /// Attribute substrings that exclude a record
    #[serde(default)]
    pub exclude: Vec<String>,

    /// When non-empty, only attributes containing one of these are kept
    #[serde(default)]
    pub include: Vec<String>,

    /// Attribute substrings that force a record in
    #[serde(default, rename = "override")]
    pub overrides: Vec<String>,
}

impl CategoryPolicy {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category: category.as_str().to_string(),
            pattern: default_pattern(),
            reject_pattern: None,
            exclude: Vec::new(),
            include: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_reject_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.reject_pattern = Some(pattern.into());
        self
    }

    pub fn with_exclude(mut self, attrs: &[&str]) -> Self {
        self.exclude = attrs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_include(mut self, attrs: &[&str]) -> Self {
        self.include = attrs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_overrides(mut self, attrs: &[&str]) -> Self {
        self.overrides = attrs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Decide whether a record with this attribute name is kept
    ///
    /// An include list makes everything excluded by default; the exclude
    /// list is applied after it; the override list wins over both.
    pub fn admits_attribute(&self, attribute: &str) -> bool {
        let mut excluded = !self.include.is_empty();

        if self.include.iter().any(|inc| attribute.contains(inc.as_str())) {
            excluded = false;
        }
        if self.exclude.iter().any(|exc| attribute.contains(exc.as_str())) {
            excluded = true;
        }
        let forced = self.overrides.iter().any(|ovr| attribute.contains(ovr.as_str()));

        !excluded || forced
    }

    /// Validate the category name and compile the patterns
    pub fn compile(&self) -> Result<CompiledPolicy> {
        let category: Category = self.category.parse()?;
        let pattern = Regex::new(&format!("^(?:{})", self.pattern)).map_err(|source| {
            AuditError::InvalidPattern {
                pass: self.name.clone(),
                source,
            }
        })?;
        let reject = match &self.reject_pattern {
            Some(p) => Some(Regex::new(p).map_err(|source| AuditError::InvalidPattern {
                pass: self.name.clone(),
                source,
            })?),
            None => None,
        };

        Ok(CompiledPolicy {
            policy: self.clone(),
            category,
            pattern,
            reject,
        })
    }
}

/// A validated policy ready to filter records
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    policy: CategoryPolicy,
    category: Category,
    pattern: Regex,
    reject: Option<Regex>,
}

impl CompiledPolicy {
    pub fn name(&self) -> &str {
        &self.policy.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn definition(&self) -> &CategoryPolicy {
        &self.policy
    }

    pub fn matches_component(&self, component: &str) -> bool {
        if !self.pattern.is_match(component) {
            return false;
        }
        !self.reject.as_ref().is_some_and(|r| r.is_match(component))
    }

    pub fn admits_attribute(&self, attribute: &str) -> bool {
        self.policy.admits_attribute(attribute)
    }
}
