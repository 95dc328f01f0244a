//! Schema validation: raw description → typed [`TableSpec`].
//!
//! The validator only checks structure: required fields, value types and
//! enum membership. Cross-field rules live in [`crate::invariants`].

use crate::error::ValidationError;
use crate::types::{AttributeDefinition, AttributeType, BillingMode, TableSpec};
use serde_json::{Map, Value};
use std::collections::HashSet;

const KNOWN_FIELDS: &[&str] = &[
    "name",
    "billing_mode",
    "read_capacity",
    "write_capacity",
    "attributes",
    "sort_key",
];

/// Validate a raw table description.
///
/// ```
/// let raw = serde_json::json!({
///     "name": "users",
///     "billing_mode": "PAY_PER_REQUEST",
///     "attributes": [{ "name": "username", "type": "S" }],
/// });
/// let spec = tablespec::validate(&raw).unwrap();
/// assert_eq!(spec.read_capacity, 0);
/// ```
pub fn validate(raw: &Value) -> Result<TableSpec, ValidationError> {
    validate_at(raw, "")
}

/// Validate a raw table description whose field paths are reported under `prefix`.
///
/// Used when the description is one entry of a larger document, e.g.
/// `table[2]`.
pub fn validate_at(raw: &Value, prefix: &str) -> Result<TableSpec, ValidationError> {
    let obj = raw.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: display_root(prefix),
    })?;

    for key in obj.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            log::debug!("Ignoring unknown field {}", join(prefix, key));
        }
    }

    let name = parse_name(obj, prefix)?;
    let billing_mode = parse_billing_mode(obj, prefix)?;
    let read_capacity = parse_capacity(obj, prefix, "read_capacity")?;
    let write_capacity = parse_capacity(obj, prefix, "write_capacity")?;
    let attributes = parse_attributes(obj, prefix)?;
    let sort_key = parse_sort_key(obj, prefix)?;

    Ok(TableSpec {
        name,
        billing_mode,
        read_capacity,
        write_capacity,
        attributes,
        sort_key,
    })
}

fn parse_name(obj: &Map<String, Value>, prefix: &str) -> Result<String, ValidationError> {
    let path = join(prefix, "name");
    let name = required_str(obj, "name", &path)?;
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { path });
    }
    Ok(name.to_string())
}

fn parse_billing_mode(
    obj: &Map<String, Value>,
    prefix: &str,
) -> Result<BillingMode, ValidationError> {
    let path = join(prefix, "billing_mode");
    let value = required_str(obj, "billing_mode", &path)?;
    BillingMode::from_wire(value).ok_or_else(|| ValidationError::UnknownBillingMode {
        path,
        value: value.to_string(),
    })
}

/// Absent and `null` capacities are read as 0.
fn parse_capacity(
    obj: &Map<String, Value>,
    prefix: &str,
    field: &str,
) -> Result<u64, ValidationError> {
    let path = join(prefix, field);
    let invalid = |value: &Value| ValidationError::InvalidCapacity {
        path: path.clone(),
        value: value.to_string(),
    };

    match obj.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(v @ Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(v)),
        Some(v @ Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid(v)),
        Some(v) => Err(invalid(v)),
    }
}

/// Optional; whether it names a declared attribute is an invariant.
fn parse_sort_key(
    obj: &Map<String, Value>,
    prefix: &str,
) -> Result<Option<String>, ValidationError> {
    let path = join(prefix, "sort_key");
    match obj.get("sort_key") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::EmptyAttributeName { path })
        }
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::WrongType {
            path,
            expected: "an attribute name",
        }),
    }
}

fn parse_attributes(
    obj: &Map<String, Value>,
    prefix: &str,
) -> Result<Vec<AttributeDefinition>, ValidationError> {
    let path = join(prefix, "attributes");
    let items = match obj.get("attributes") {
        None | Some(Value::Null) => return Err(ValidationError::MissingField { path }),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::WrongType {
                path,
                expected: "a list of attributes",
            });
        }
    };

    let mut seen = HashSet::new();
    let mut attributes = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let attr = parse_attribute(item, &item_path)?;

        if !seen.insert(attr.name.clone()) {
            return Err(ValidationError::DuplicateAttribute {
                path: format!("{item_path}.name"),
                name: attr.name,
            });
        }
        attributes.push(attr);
    }

    Ok(attributes)
}

fn parse_attribute(item: &Value, path: &str) -> Result<AttributeDefinition, ValidationError> {
    let obj = item.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: path.to_string(),
    })?;

    let name_path = format!("{path}.name");
    let name = required_str(obj, "name", &name_path)?;
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyAttributeName { path: name_path });
    }

    let type_path = format!("{path}.type");
    let attribute_type = match obj.get("type") {
        None | Some(Value::Null) => {
            return Err(ValidationError::MissingField { path: type_path });
        }
        Some(Value::String(s)) => AttributeType::from_wire(s).ok_or_else(|| {
            ValidationError::InvalidAttributeType {
                path: type_path.clone(),
                value: s.clone(),
            }
        })?,
        Some(other) => {
            return Err(ValidationError::InvalidAttributeType {
                path: type_path,
                value: other.to_string(),
            });
        }
    };

    Ok(AttributeDefinition::new(name, attribute_type))
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<&'a str, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField {
            path: path.to_string(),
        }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::WrongType {
            path: path.to_string(),
            expected: "a string",
        }),
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn display_root(prefix: &str) -> String {
    if prefix.is_empty() {
        "<root>".to_string()
    } else {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Value {
        json!({
            "name": "users",
            "billing_mode": "PAY_PER_REQUEST",
            "read_capacity": 0,
            "write_capacity": 0,
            "attributes": [{ "name": "username", "type": "S" }],
        })
    }

    #[test]
    fn test_validate_users_table() {
        let spec = validate(&users()).unwrap();
        assert_eq!(spec.name, "users");
        assert_eq!(spec.billing_mode, BillingMode::PayPerRequest);
        assert_eq!(spec.read_capacity, 0);
        assert_eq!(spec.write_capacity, 0);
        assert_eq!(
            spec.attributes,
            vec![AttributeDefinition::new("username", AttributeType::S)]
        );
    }

    #[test]
    fn test_absent_capacity_reads_as_zero() {
        let mut raw = users();
        raw.as_object_mut().unwrap().remove("read_capacity");
        raw["write_capacity"] = Value::Null;

        let spec = validate(&raw).unwrap();
        assert_eq!(spec.read_capacity, 0);
        assert_eq!(spec.write_capacity, 0);
    }

    #[test]
    fn test_capacity_accepts_integer_strings() {
        let mut raw = users();
        raw["billing_mode"] = json!("PROVISIONED");
        raw["read_capacity"] = json!("5");
        raw["write_capacity"] = json!(10);

        let spec = validate(&raw).unwrap();
        assert_eq!(spec.read_capacity, 5);
        assert_eq!(spec.write_capacity, 10);
    }

    #[test]
    fn test_invalid_capacity() {
        for bad in [json!(-1), json!(2.5), json!("lots"), json!(true), json!([1])] {
            let mut raw = users();
            raw["write_capacity"] = bad;
            let err = validate(&raw).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidCapacity { ref path, .. } if path == "write_capacity"),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_billing_mode() {
        let mut raw = users();
        raw["billing_mode"] = json!("ON_DEMAND");
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownBillingMode {
                path: "billing_mode".to_string(),
                value: "ON_DEMAND".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["name", "billing_mode", "attributes"] {
            let mut raw = users();
            raw.as_object_mut().unwrap().remove(field);
            let err = validate(&raw).unwrap_err();
            assert_eq!(
                err,
                ValidationError::MissingField {
                    path: field.to_string()
                }
            );
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut raw = users();
        raw["name"] = json!("   ");
        assert!(matches!(
            validate(&raw).unwrap_err(),
            ValidationError::EmptyName { .. }
        ));
    }

    #[test]
    fn test_invalid_attribute_type() {
        let mut raw = users();
        raw["attributes"] = json!([
            { "name": "id", "type": "S" },
            { "name": "score", "type": "FLOAT" },
        ]);
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidAttributeType {
                path: "attributes[1].type".to_string(),
                value: "FLOAT".to_string(),
            }
        );
    }

    #[test]
    fn test_non_string_attribute_type() {
        let mut raw = users();
        raw["attributes"] = json!([{ "name": "id", "type": 1 }]);
        assert!(matches!(
            validate(&raw).unwrap_err(),
            ValidationError::InvalidAttributeType { .. }
        ));
    }

    #[test]
    fn test_empty_attribute_name() {
        let mut raw = users();
        raw["attributes"] = json!([{ "name": "", "type": "S" }]);
        assert_eq!(
            validate(&raw).unwrap_err(),
            ValidationError::EmptyAttributeName {
                path: "attributes[0].name".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_attribute() {
        let mut raw = users();
        raw["attributes"] = json!([
            { "name": "id", "type": "S" },
            { "name": "id", "type": "N" },
        ]);
        assert_eq!(
            validate(&raw).unwrap_err(),
            ValidationError::DuplicateAttribute {
                path: "attributes[1].name".to_string(),
                name: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_attribute_list_passes_validation() {
        // Rejected later by the invariant checker
        let mut raw = users();
        raw["attributes"] = json!([]);
        assert!(validate(&raw).unwrap().attributes.is_empty());
    }

    #[test]
    fn test_attributes_must_be_a_list() {
        let mut raw = users();
        raw["attributes"] = json!({ "name": "id", "type": "S" });
        assert!(matches!(
            validate(&raw).unwrap_err(),
            ValidationError::WrongType { .. }
        ));
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(
            validate(&json!(["users"])).unwrap_err(),
            ValidationError::NotAnObject {
                path: "<root>".to_string()
            }
        );
    }

    #[test]
    fn test_sort_key_is_read() {
        let mut raw = users();
        raw["attributes"] = json!([
            { "name": "PK", "type": "S" },
            { "name": "SK", "type": "S" },
        ]);
        raw["sort_key"] = json!("SK");

        let spec = validate(&raw).unwrap();
        assert_eq!(spec.sort_key.as_deref(), Some("SK"));
        assert_eq!(spec.partition_key().map(|a| a.name.as_str()), Some("PK"));
    }

    #[test]
    fn test_sort_key_must_be_a_name() {
        let mut raw = users();
        raw["sort_key"] = json!(["SK"]);
        assert!(matches!(
            validate(&raw).unwrap_err(),
            ValidationError::WrongType { ref path, .. } if path == "sort_key"
        ));

        raw["sort_key"] = json!("");
        assert_eq!(
            validate(&raw).unwrap_err(),
            ValidationError::EmptyAttributeName {
                path: "sort_key".to_string()
            }
        );
    }

    #[test]
    fn test_paths_use_prefix() {
        let mut raw = users();
        raw["billing_mode"] = json!(42);
        let err = validate_at(&raw, "table[3]").unwrap_err();
        assert_eq!(err.path(), "table[3].billing_mode");
    }
}
