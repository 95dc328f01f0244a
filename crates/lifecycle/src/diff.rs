//! Field-by-field diff between two table configurations

use serde::{Deserialize, Serialize};
use std::fmt;
use tablespec::{AttributeDefinition, TableSpec};

/// Whether a field can change without recreating the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    /// Changed in place with an update
    Mutable,
    /// Change forces destroy + create
    Immutable,
}

/// A compared field of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Table name
    Name,
    /// Billing mode
    BillingMode,
    /// Read capacity units
    ReadCapacity,
    /// Write capacity units
    WriteCapacity,
    /// Attribute definitions
    Attributes,
    /// Sort key designation
    SortKey,
}

impl Field {
    /// Classification used by the planner. Only the name is immutable.
    pub fn mutability(&self) -> Mutability {
        match self {
            Field::Name => Mutability::Immutable,
            _ => Mutability::Mutable,
        }
    }

    /// Field name as written in descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::BillingMode => "billing_mode",
            Field::ReadCapacity => "read_capacity",
            Field::WriteCapacity => "write_capacity",
            Field::Attributes => "attributes",
            Field::SortKey => "sort_key",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One differing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Which field
    pub field: Field,
    /// Value on the observed side
    pub from: String,
    /// Value on the desired side
    pub to: String,
}

impl FieldChange {
    /// Whether this change forces replacement
    pub fn is_immutable(&self) -> bool {
        self.field.mutability() == Mutability::Immutable
    }
}

/// All differences between two configurations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff {
    /// Differing fields, in declaration order
    pub changes: Vec<FieldChange>,
}

impl TableDiff {
    /// No differences
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Any immutable field differs
    pub fn requires_replacement(&self) -> bool {
        self.changes.iter().any(FieldChange::is_immutable)
    }

    /// Fields that differ
    pub fn fields(&self) -> Vec<Field> {
        self.changes.iter().map(|c| c.field).collect()
    }

    /// Find the change for a field
    pub fn get(&self, field: Field) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }
}

/// Compare `desired` against `observed`
pub fn compute_diff(desired: &TableSpec, observed: &TableSpec) -> TableDiff {
    let mut changes = Vec::new();

    let push = |changes: &mut Vec<FieldChange>, field: Field, from: String, to: String| {
        if from != to {
            changes.push(FieldChange { field, from, to });
        }
    };

    push(&mut changes, Field::Name, observed.name.clone(), desired.name.clone());
    push(
        &mut changes,
        Field::BillingMode,
        observed.billing_mode.to_string(),
        desired.billing_mode.to_string(),
    );
    push(
        &mut changes,
        Field::ReadCapacity,
        observed.read_capacity.to_string(),
        desired.read_capacity.to_string(),
    );
    push(
        &mut changes,
        Field::WriteCapacity,
        observed.write_capacity.to_string(),
        desired.write_capacity.to_string(),
    );

    if observed.attributes != desired.attributes {
        changes.push(FieldChange {
            field: Field::Attributes,
            from: format_attributes(&observed.attributes),
            to: format_attributes(&desired.attributes),
        });
    }

    push(
        &mut changes,
        Field::SortKey,
        format_sort_key(observed.sort_key.as_deref()),
        format_sort_key(desired.sort_key.as_deref()),
    );

    TableDiff { changes }
}

fn format_sort_key(sort_key: Option<&str>) -> String {
    sort_key.unwrap_or("none").to_string()
}

/// Render an attribute list as `a (S), b (N)`
pub fn format_attributes(attributes: &[AttributeDefinition]) -> String {
    attributes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablespec::AttributeType;

    fn users() -> TableSpec {
        TableSpec::on_demand("users", AttributeDefinition::new("username", AttributeType::S))
    }

    #[test]
    fn test_identical_specs_have_no_diff() {
        let diff = compute_diff(&users(), &users());
        assert!(diff.is_empty());
        assert!(!diff.requires_replacement());
    }

    #[test]
    fn test_name_change_requires_replacement() {
        let mut desired = users();
        desired.name = "members".into();

        let diff = compute_diff(&desired, &users());
        assert_eq!(diff.fields(), vec![Field::Name]);
        assert!(diff.requires_replacement());
        let change = diff.get(Field::Name).unwrap();
        assert_eq!(change.from, "users");
        assert_eq!(change.to, "members");
    }

    #[test]
    fn test_capacity_change_is_mutable() {
        let key = AttributeDefinition::new("id", AttributeType::N);
        let observed = TableSpec::provisioned("orders", key.clone(), 5, 5);
        let desired = TableSpec::provisioned("orders", key, 10, 5);

        let diff = compute_diff(&desired, &observed);
        assert_eq!(diff.fields(), vec![Field::ReadCapacity]);
        assert!(!diff.requires_replacement());
    }

    #[test]
    fn test_billing_switch_reports_all_fields() {
        let key = AttributeDefinition::new("username", AttributeType::S);
        let observed = TableSpec::provisioned("users", key, 5, 5);

        let diff = compute_diff(&users(), &observed);
        assert_eq!(
            diff.fields(),
            vec![Field::BillingMode, Field::ReadCapacity, Field::WriteCapacity]
        );
    }

    #[test]
    fn test_attribute_change_detected() {
        let mut desired = users();
        desired
            .attributes
            .push(AttributeDefinition::new("email", AttributeType::S));

        let diff = compute_diff(&desired, &users());
        let change = diff.get(Field::Attributes).unwrap();
        assert_eq!(change.from, "username (S)");
        assert_eq!(change.to, "username (S), email (S)");
        assert!(!diff.requires_replacement());
    }

    #[test]
    fn test_adding_sort_key_is_an_update() {
        let desired =
            users().with_sort_key(AttributeDefinition::new("created_at", AttributeType::N));

        let diff = compute_diff(&desired, &users());
        assert_eq!(diff.fields(), vec![Field::Attributes, Field::SortKey]);
        let change = diff.get(Field::SortKey).unwrap();
        assert_eq!(change.from, "none");
        assert_eq!(change.to, "created_at");
        assert!(!diff.requires_replacement());
    }

    #[test]
    fn test_mutability_classification() {
        assert_eq!(Field::Name.mutability(), Mutability::Immutable);
        for field in [
            Field::BillingMode,
            Field::ReadCapacity,
            Field::WriteCapacity,
            Field::Attributes,
            Field::SortKey,
        ] {
            assert_eq!(field.mutability(), Mutability::Mutable);
        }
    }
}
