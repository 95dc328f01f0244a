//! Invariant checks on a validated [`TableSpec`].
//!
//! Each rule is its own function so it can be exercised without going
//! through parsing.

use crate::error::InvariantError;
use crate::types::{BillingMode, TableSpec};
use std::collections::HashSet;

/// Check every cross-field rule, returning the first violation.
pub fn check(spec: &TableSpec) -> Result<(), InvariantError> {
    check_billing(spec)?;
    check_key_schema(spec)?;
    check_attributes(spec)?;
    Ok(())
}

/// Billing mode and capacity must agree.
pub fn check_billing(spec: &TableSpec) -> Result<(), InvariantError> {
    let (read, write) = (spec.read_capacity, spec.write_capacity);

    match spec.billing_mode {
        BillingMode::PayPerRequest if read != 0 || write != 0 => {
            Err(InvariantError::CapacityNotAllowedForOnDemandBilling {
                path: capacity_path(read != 0),
                read_capacity: read,
                write_capacity: write,
            })
        }
        BillingMode::Provisioned if read == 0 || write == 0 => {
            Err(InvariantError::CapacityRequiredForProvisionedBilling {
                path: capacity_path(read == 0),
                read_capacity: read,
                write_capacity: write,
            })
        }
        _ => Ok(()),
    }
}

/// There must be a partition key; a sort key must name another declared attribute.
pub fn check_key_schema(spec: &TableSpec) -> Result<(), InvariantError> {
    let Some(partition) = spec.partition_key() else {
        return Err(InvariantError::MissingKeySchema {
            path: "attributes".to_string(),
        });
    };

    if let Some(sort_key) = &spec.sort_key {
        let path = "sort_key".to_string();
        if *sort_key == partition.name {
            return Err(InvariantError::InvalidSortKey {
                path,
                reason: format!("'{sort_key}' is already the partition key"),
            });
        }
        if spec.attribute(sort_key).is_none() {
            return Err(InvariantError::InvalidSortKey {
                path,
                reason: format!("'{sort_key}' is not a declared attribute"),
            });
        }
    }
    Ok(())
}

/// Attribute names are non-empty and unique, and every attribute is a key.
///
/// The validator already guarantees the naming rules for parsed input; a
/// `TableSpec` built by hand has not been through it.
pub fn check_attributes(spec: &TableSpec) -> Result<(), InvariantError> {
    let key_names: Vec<&str> = spec
        .partition_key()
        .map(|a| a.name.as_str())
        .into_iter()
        .chain(spec.sort_key.as_deref())
        .collect();

    let mut seen = HashSet::new();
    for (i, attr) in spec.attributes.iter().enumerate() {
        let path = format!("attributes[{i}].name");
        if attr.name.trim().is_empty() {
            return Err(InvariantError::MalformedAttribute {
                path,
                reason: "attribute name must not be empty".to_string(),
            });
        }
        if !seen.insert(attr.name.as_str()) {
            return Err(InvariantError::MalformedAttribute {
                path,
                reason: format!("duplicate attribute '{}'", attr.name),
            });
        }
        if !key_names.contains(&attr.name.as_str()) {
            return Err(InvariantError::UnusedAttribute {
                path,
                name: attr.name.clone(),
            });
        }
    }
    Ok(())
}

fn capacity_path(read_offends: bool) -> String {
    if read_offends {
        "read_capacity".to_string()
    } else {
        "write_capacity".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeDefinition, AttributeType};

    fn key() -> AttributeDefinition {
        AttributeDefinition::new("username", AttributeType::S)
    }

    #[test]
    fn test_on_demand_with_zero_capacity_passes() {
        assert!(check(&TableSpec::on_demand("users", key())).is_ok());
    }

    #[test]
    fn test_on_demand_rejects_any_capacity() {
        let mut spec = TableSpec::on_demand("users", key());
        spec.write_capacity = 5;
        assert_eq!(
            check(&spec).unwrap_err(),
            InvariantError::CapacityNotAllowedForOnDemandBilling {
                path: "write_capacity".to_string(),
                read_capacity: 0,
                write_capacity: 5,
            }
        );

        spec.write_capacity = 0;
        spec.read_capacity = 1;
        assert_eq!(check(&spec).unwrap_err().path(), "read_capacity");
    }

    #[test]
    fn test_provisioned_requires_both_capacities() {
        assert!(check(&TableSpec::provisioned("orders", key(), 5, 5)).is_ok());

        for (read, write) in [(0, 5), (5, 0), (0, 0)] {
            let spec = TableSpec::provisioned("orders", key(), read, write);
            assert!(matches!(
                check_billing(&spec).unwrap_err(),
                InvariantError::CapacityRequiredForProvisionedBilling { .. }
            ));
        }
    }

    #[test]
    fn test_empty_attributes_missing_key_schema() {
        let mut spec = TableSpec::on_demand("users", key());
        spec.attributes.clear();
        assert_eq!(
            check(&spec).unwrap_err(),
            InvariantError::MissingKeySchema {
                path: "attributes".to_string()
            }
        );
    }

    #[test]
    fn test_hand_built_duplicate_attribute_rejected() {
        let mut spec = TableSpec::on_demand("users", key());
        spec.attributes.push(key());
        assert!(matches!(
            check_attributes(&spec).unwrap_err(),
            InvariantError::MalformedAttribute { ref path, .. } if path == "attributes[1].name"
        ));
    }

    #[test]
    fn test_hand_built_blank_attribute_rejected() {
        let spec = TableSpec::on_demand("users", AttributeDefinition::new(" ", AttributeType::N));
        assert!(check_attributes(&spec).is_err());
    }

    #[test]
    fn test_composite_key_passes() {
        let spec = TableSpec::on_demand("events", AttributeDefinition::new("PK", AttributeType::S))
            .with_sort_key(AttributeDefinition::new("SK", AttributeType::S));
        assert!(check(&spec).is_ok());
    }

    #[test]
    fn test_sort_key_must_be_declared() {
        let mut spec = TableSpec::on_demand("events", key());
        spec.sort_key = Some("created_at".to_string());
        assert!(matches!(
            check(&spec).unwrap_err(),
            InvariantError::InvalidSortKey { ref path, ref reason }
                if path == "sort_key" && reason.contains("not a declared attribute")
        ));
    }

    #[test]
    fn test_sort_key_cannot_be_partition_key() {
        let mut spec = TableSpec::on_demand("users", key());
        spec.sort_key = Some("username".to_string());
        assert!(matches!(
            check_key_schema(&spec).unwrap_err(),
            InvariantError::InvalidSortKey { .. }
        ));
    }

    #[test]
    fn test_attribute_outside_key_schema_rejected() {
        let mut spec = TableSpec::on_demand("users", key());
        spec.attributes
            .push(AttributeDefinition::new("email", AttributeType::S));
        assert_eq!(
            check(&spec).unwrap_err(),
            InvariantError::UnusedAttribute {
                path: "attributes[1].name".to_string(),
                name: "email".to_string(),
            }
        );
    }

    #[test]
    fn test_billing_checked_before_key_schema() {
        let mut spec = TableSpec::provisioned("orders", key(), 0, 0);
        spec.attributes.clear();
        assert!(matches!(
            check(&spec).unwrap_err(),
            InvariantError::CapacityRequiredForProvisionedBilling { .. }
        ));
    }
}
