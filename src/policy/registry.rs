use crate::error::{AuditError, Result};
use crate::policy::{CategoryPolicy, CompiledPolicy};
use crate::record::Category;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct PolicyFile {
    category: Vec<CategoryPolicy>,
}

/// Ordered table of grouping passes
///
/// Every pass is iterated the same way by the fingerprint builder; adding a
/// hardware category means adding a `[[category]]` entry, not code.
///
/// # Example Usage
/// ```no_run
/// use fleetaudit::policy::PolicyTable;
///
/// let table = PolicyTable::from_toml("policies.toml")?;
/// for pass in table.passes() {
///     println!("{} -> {}", pass.name(), pass.category());
/// }
/// # Ok::<(), fleetaudit::error::AuditError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PolicyTable {
    passes: Vec<CompiledPolicy>,
}

impl PolicyTable {
    /// Load grouping passes from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, has invalid TOML syntax,
    /// names an unknown category, carries an invalid regex, or repeats a
    /// pass name.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PolicyFile = toml::from_str(content)?;
        Self::from_policies(file.category)
    }

    /// Built-in passes covering every hardware category
    ///
    /// Uses the embedded policies-default.toml compiled into the binary.
    pub fn default_policies() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../../policies-default.toml");
        Self::from_toml_str(DEFAULT_TOML)
    }

    pub fn from_policies(policies: Vec<CategoryPolicy>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut passes = Vec::with_capacity(policies.len());

        for policy in policies {
            if !seen.insert(policy.name.clone()) {
                return Err(AuditError::DuplicatePass(policy.name));
            }
            passes.push(policy.compile()?);
        }

        Ok(Self { passes })
    }

    pub fn passes(&self) -> &[CompiledPolicy] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Get a pass by its display name
    pub fn get(&self, name: &str) -> Option<&CompiledPolicy> {
        self.passes.iter().find(|p| p.name() == name)
    }

    /// Drop every pass over one of the ignored categories
    pub fn without(&self, ignored: &[Category]) -> Self {
        Self {
            passes: self
                .passes
                .iter()
                .filter(|p| !ignored.contains(&p.category()))
                .cloned()
                .collect(),
        }
    }
}
