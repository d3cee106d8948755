//! Fleet dump loading
//!
//! A dump file holds the records of one system as a JSON array of 4-element
//! arrays:
//!
//! ```json
//! [
//!   ["system", "product", "serial", "CZ3222KDMF"],
//!   ["disk", "sda", "size", "500"],
//!   ["cpu", "logical_0", "loops_per_sec", 421]
//! ]
//! ```
//!
//! Malformed entries are skipped with a debug event; only an unreadable file
//! or a document that is not a JSON array is an error.

use crate::error::Result;
use crate::record::{AttributeRecord, IdentityKey, SystemRecords};
use serde_json::Value;
use std::path::Path;

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_entry(entry: &Value) -> Option<AttributeRecord> {
    let fields = entry.as_array()?;
    if fields.len() != 4 {
        return None;
    }
    // Only the value may be numeric
    let mut texts = Vec::with_capacity(4);
    for (i, field) in fields.iter().enumerate() {
        let text = if i == 3 {
            field_text(field)?
        } else {
            field.as_str()?.to_string()
        };
        texts.push(text);
    }
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    AttributeRecord::from_fields(&refs)
}

/// Parse one dump document into records
pub fn parse_records(content: &str) -> Result<Vec<AttributeRecord>> {
    let entries: Vec<Value> = serde_json::from_str(content)?;
    let mut records = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match parse_entry(entry) {
            Some(record) => records.push(record),
            None => tracing::debug!(index, entry = %entry, "skipping malformed record"),
        }
    }

    Ok(records)
}

/// Load one system; `None` when it carries no identifier record
pub fn load_system<P: AsRef<Path>>(path: P, key: IdentityKey) -> Result<Option<SystemRecords>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let records = parse_records(&content)?;
    let system = SystemRecords::identify(records, key);

    if system.is_none() {
        tracing::warn!(
            file = %path.display(),
            key = key.attribute(),
            "no system identifier, skipping"
        );
    }

    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Category;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_records() {
        let records = parse_records(
            r#"[
                ["system", "product", "serial", "S1"],
                ["cpu", "logical_0", "loops_per_sec", 421],
                ["disk", "sda", "size", 1.5]
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].category, Category::Cpu);
        assert_eq!(records[1].value, "421");
        assert_eq!(records[2].value, "1.5");
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let records = parse_records(
            r#"[
                ["disk", "sda", "size"],
                ["disk", "sda", "size", "1", "extra"],
                ["gpu", "0", "model", "x"],
                ["disk", 1, "size", "1"],
                ["disk", "sda", "size", null],
                "not an array",
                ["disk", "sda", "size", "500"]
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].component, "sda");
    }

    #[test]
    fn test_not_an_array_is_error() {
        assert!(parse_records(r#"{"disk": 1}"#).is_err());
        assert!(parse_records("not json").is_err());
    }

    #[test]
    fn test_load_system() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[["system", "product", "serial", "S1"], ["system", "product", "uuid", "U1"]]"#
        )
        .unwrap();
        file.flush().unwrap();

        let by_serial = load_system(file.path(), IdentityKey::Serial).unwrap().unwrap();
        assert_eq!(by_serial.id.as_str(), "S1");
        let by_uuid = load_system(file.path(), IdentityKey::Uuid).unwrap().unwrap();
        assert_eq!(by_uuid.id.as_str(), "U1");
    }

    #[test]
    fn test_load_system_without_id() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[["disk", "sda", "size", "500"]]"#).unwrap();
        file.flush().unwrap();

        assert!(load_system(file.path(), IdentityKey::Serial).unwrap().is_none());
    }
}
