//! Core types for table desired state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capacity-provisioning strategy for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    /// On-demand throughput, no capacity units
    PayPerRequest,
    /// Fixed read/write capacity units
    Provisioned,
}

impl BillingMode {
    /// Wire name used in desired-state descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::PayPerRequest => "PAY_PER_REQUEST",
            BillingMode::Provisioned => "PROVISIONED",
        }
    }

    /// Parse a billing mode from its wire name.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "PAY_PER_REQUEST" => Some(BillingMode::PayPerRequest),
            "PROVISIONED" => Some(BillingMode::Provisioned),
            _ => None,
        }
    }
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    /// String
    S,
    /// Number
    N,
    /// Binary
    B,
}

impl AttributeType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::S => "S",
            AttributeType::N => "N",
            AttributeType::B => "B",
        }
    }

    /// Parse a type from its wire name.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "S" => Some(AttributeType::S),
            "N" => Some(AttributeType::N),
            "B" => Some(AttributeType::B),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed attribute participating in the key schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name, unique within its table
    pub name: String,
    /// Scalar type
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

impl AttributeDefinition {
    /// Create a new attribute definition.
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

impl fmt::Display for AttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.attribute_type)
    }
}

/// Desired state of a single managed table.
///
/// Produced by [`crate::validate`]; a value is never mutated once built; an
/// edited configuration yields a new `TableSpec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name, unique within the target scope
    pub name: String,
    /// Billing mode
    pub billing_mode: BillingMode,
    /// Read capacity units (0 for on-demand)
    #[serde(default)]
    pub read_capacity: u64,
    /// Write capacity units (0 for on-demand)
    #[serde(default)]
    pub write_capacity: u64,
    /// Attribute definitions, first one is the partition key
    pub attributes: Vec<AttributeDefinition>,
    /// Attribute acting as the sort (range) key, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

impl TableSpec {
    /// On-demand table keyed by a single attribute.
    pub fn on_demand(name: impl Into<String>, key: AttributeDefinition) -> Self {
        Self {
            name: name.into(),
            billing_mode: BillingMode::PayPerRequest,
            read_capacity: 0,
            write_capacity: 0,
            attributes: vec![key],
            sort_key: None,
        }
    }

    /// Provisioned table keyed by a single attribute.
    pub fn provisioned(
        name: impl Into<String>,
        key: AttributeDefinition,
        read_capacity: u64,
        write_capacity: u64,
    ) -> Self {
        Self {
            name: name.into(),
            billing_mode: BillingMode::Provisioned,
            read_capacity,
            write_capacity,
            attributes: vec![key],
            sort_key: None,
        }
    }

    /// The attribute acting as the primary key component.
    pub fn partition_key(&self) -> Option<&AttributeDefinition> {
        self.attributes.first()
    }

    /// Add `key` as an attribute and designate it the sort key.
    pub fn with_sort_key(mut self, key: AttributeDefinition) -> Self {
        self.sort_key = Some(key.name.clone());
        self.attributes.push(key);
        self
    }

    /// The attribute acting as the sort key, if one is designated and declared.
    pub fn sort_key(&self) -> Option<&AttributeDefinition> {
        self.sort_key.as_deref().and_then(|name| self.attribute(name))
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_mode_wire_names() {
        assert_eq!(
            BillingMode::from_wire("PAY_PER_REQUEST"),
            Some(BillingMode::PayPerRequest)
        );
        assert_eq!(
            BillingMode::from_wire("PROVISIONED"),
            Some(BillingMode::Provisioned)
        );
        assert_eq!(BillingMode::from_wire("pay_per_request"), None);
        assert_eq!(BillingMode::Provisioned.to_string(), "PROVISIONED");
    }

    #[test]
    fn test_billing_mode_serde_matches_wire() {
        let json = serde_json::to_string(&BillingMode::PayPerRequest).unwrap();
        assert_eq!(json, "\"PAY_PER_REQUEST\"");
    }

    #[test]
    fn test_attribute_type_wire_names() {
        assert_eq!(AttributeType::from_wire("N"), Some(AttributeType::N));
        assert_eq!(AttributeType::from_wire("X"), None);
        assert_eq!(AttributeType::B.as_str(), "B");
    }

    #[test]
    fn test_partition_key_is_first_attribute() {
        let mut spec = TableSpec::on_demand("users", AttributeDefinition::new("id", AttributeType::S));
        spec.attributes
            .push(AttributeDefinition::new("email", AttributeType::S));

        assert_eq!(spec.partition_key().map(|a| a.name.as_str()), Some("id"));
        assert!(spec.attribute("email").is_some());
        assert!(spec.attribute("missing").is_none());
    }

    #[test]
    fn test_composite_key() {
        let spec = TableSpec::on_demand("events", AttributeDefinition::new("PK", AttributeType::S))
            .with_sort_key(AttributeDefinition::new("SK", AttributeType::S));

        assert_eq!(spec.attributes.len(), 2);
        assert_eq!(spec.sort_key.as_deref(), Some("SK"));
        assert_eq!(spec.sort_key().map(ToString::to_string), Some("SK (S)".to_string()));
    }

    #[test]
    fn test_sort_key_omitted_when_absent() {
        let spec = TableSpec::on_demand("users", AttributeDefinition::new("id", AttributeType::S));
        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("sort_key").is_none());

        let back: TableSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_attribute_serializes_type_field() {
        let attr = AttributeDefinition::new("username", AttributeType::S);
        let value = serde_json::to_value(&attr).unwrap();
        assert_eq!(value["type"], "S");
        assert_eq!(value["name"], "username");
    }
}
