//! Desired-state file loading
//!
//! Tables are declared in TOML (`[[table]]` entries) or JSON (an array, or an
//! object with a `table` array). Each entry is converted to an untyped value
//! and run through `tablespec::parse_at`, so errors name the entry they came
//! from (`table[1].write_capacity`).
//!
//! An entry may carry `replaces = "<old name>"` to declare that it renames a
//! previously applied table, which makes `apply` replace instead of
//! destroying one table and creating another.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tablespec::{SpecError, TableSpec};
use thiserror::Error;

/// Key holding the table list in both formats
const TABLE_KEY: &str = "table";

/// Key naming the table an entry replaces
const REPLACES_KEY: &str = "replaces";

/// A validated table declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredTable {
    pub spec: TableSpec,
    /// Previous name of this table, if it is being renamed
    pub replaces: Option<String>,
}

impl DesiredTable {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Problems with a desired-state file, reported per entry
#[derive(Debug, Error)]
pub enum DesiredError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("table[{index}]: name '{name}' is already declared by table[{first}]")]
    DuplicateName {
        name: String,
        index: usize,
        first: usize,
    },

    #[error("table[{index}].replaces: expected a non-empty string")]
    InvalidReplaces { index: usize },
}

/// Read the raw entries of a desired-state file, choosing the format by extension.
pub fn read_entries(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read desired-state file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let root: Value = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON: {}", path.display()))?
    } else {
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML: {}", path.display()))?;
        serde_json::to_value(table)
            .with_context(|| format!("Failed to convert TOML: {}", path.display()))?
    };

    let entries = entries_of(root)
        .with_context(|| format!("Unexpected layout in {}", path.display()))?;
    log::debug!("Read {} table entries from {}", entries.len(), path.display());
    Ok(entries)
}

fn entries_of(root: Value) -> Result<Vec<Value>> {
    match root {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => match map.remove(TABLE_KEY) {
            Some(Value::Array(entries)) => Ok(entries),
            Some(_) => bail!("'{TABLE_KEY}' must be an array of tables"),
            None if map.is_empty() => Ok(Vec::new()),
            None => bail!("expected a '{TABLE_KEY}' array"),
        },
        _ => bail!("expected an array of tables or an object with a '{TABLE_KEY}' array"),
    }
}

/// Validate every entry, collecting all errors rather than stopping at the first.
pub fn parse_entries(entries: &[Value]) -> std::result::Result<Vec<DesiredTable>, Vec<DesiredError>> {
    let mut tables = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, raw) in entries.iter().enumerate() {
        let spec = match tablespec::parse_at(raw, &format!("{TABLE_KEY}[{index}]")) {
            Ok(spec) => spec,
            Err(e) => {
                errors.push(DesiredError::Spec(e));
                continue;
            }
        };

        let replaces = match raw.get(REPLACES_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(_) => {
                errors.push(DesiredError::InvalidReplaces { index });
                continue;
            }
        };

        if let Some(&first) = seen.get(&spec.name) {
            errors.push(DesiredError::DuplicateName {
                name: spec.name.clone(),
                index,
                first,
            });
            continue;
        }
        seen.insert(spec.name.clone(), index);
        tables.push(DesiredTable { spec, replaces });
    }

    if errors.is_empty() {
        Ok(tables)
    } else {
        Err(errors)
    }
}

/// Read and validate a desired-state file, failing on the first batch of errors.
pub fn load(path: &Path) -> Result<Vec<DesiredTable>> {
    let entries = read_entries(path)?;
    parse_entries(&entries).map_err(|errors| {
        for error in &errors {
            log::error!("{error}");
        }
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::anyhow!(
            "{} invalid table declaration(s) in {}:\n  {}",
            errors.len(),
            path.display(),
            details.join("\n  ")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tablespec::{BillingMode, InvariantError};
    use tempfile::TempDir;

    const TOML_TABLES: &str = r#"
[[table]]
name = "users"
billing_mode = "PAY_PER_REQUEST"
attributes = [{ name = "username", type = "S" }]

[[table]]
name = "orders"
billing_mode = "PROVISIONED"
read_capacity = 5
write_capacity = 2
attributes = [{ name = "order_id", type = "N" }]
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_toml_tables() {
        let dir = TempDir::new().unwrap();
        let tables = load(&write(&dir, "tables.toml", TOML_TABLES)).unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name(), "users");
        assert_eq!(tables[1].spec.billing_mode, BillingMode::Provisioned);
        assert_eq!(tables[1].spec.read_capacity, 5);
    }

    #[test]
    fn test_load_json_array_and_object() {
        let dir = TempDir::new().unwrap();
        let entry = json!({
            "name": "users",
            "billing_mode": "PAY_PER_REQUEST",
            "attributes": [{ "name": "username", "type": "S" }],
        });

        let array = write(&dir, "a.json", &json!([entry.clone()]).to_string());
        let object = write(&dir, "b.json", &json!({ "table": [entry] }).to_string());
        assert_eq!(load(&array).unwrap(), load(&object).unwrap());
    }

    #[test]
    fn test_empty_toml_declares_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(load(&write(&dir, "empty.toml", "")).unwrap().is_empty());
    }

    #[test]
    fn test_errors_name_the_entry() {
        let entries = vec![
            json!({
                "name": "users",
                "billing_mode": "PAY_PER_REQUEST",
                "attributes": [{ "name": "username", "type": "S" }],
            }),
            json!({
                "name": "orders",
                "billing_mode": "PAY_PER_REQUEST",
                "write_capacity": 5,
                "attributes": [{ "name": "order_id", "type": "N" }],
            }),
        ];

        let errors = parse_entries(&entries).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            DesiredError::Spec(SpecError::Invariant(
                e @ InvariantError::CapacityNotAllowedForOnDemandBilling { .. },
            )) => assert_eq!(e.path(), "table[1].write_capacity"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let entry = json!({
            "name": "users",
            "billing_mode": "PAY_PER_REQUEST",
            "attributes": [{ "name": "username", "type": "S" }],
        });
        let errors = parse_entries(&[entry.clone(), entry]).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "table[1]: name 'users' is already declared by table[0]"
        );
    }

    #[test]
    fn test_replaces_is_read() {
        let entry = json!({
            "name": "members",
            "replaces": "users",
            "billing_mode": "PAY_PER_REQUEST",
            "attributes": [{ "name": "username", "type": "S" }],
        });
        let tables = parse_entries(&[entry]).unwrap();
        assert_eq!(tables[0].replaces.as_deref(), Some("users"));

        let bad = json!({
            "name": "members",
            "replaces": 7,
            "billing_mode": "PAY_PER_REQUEST",
            "attributes": [{ "name": "username", "type": "S" }],
        });
        assert!(matches!(
            parse_entries(&[bad]).unwrap_err()[0],
            DesiredError::InvalidReplaces { index: 0 }
        ));
    }

    #[test]
    fn test_wrong_layout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", r#"{"tables": []}"#);
        assert!(read_entries(&path).is_err());
    }
}
