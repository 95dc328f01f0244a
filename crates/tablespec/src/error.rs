//! Error types for table specifications.
//!
//! Validation errors describe malformed input; invariant errors describe
//! input that parsed fine but breaks a cross-field rule. Both carry the
//! path of the offending field so the operator can find it.

use thiserror::Error;

/// Structural errors found while parsing a raw description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The description is not a key/value object
    #[error("{path}: expected an object")]
    NotAnObject {
        /// Path of the value that is not an object
        path: String,
    },

    /// A required field is absent
    #[error("{path}: missing required field")]
    MissingField {
        /// Path of the absent field
        path: String,
    },

    /// A field holds a value of the wrong JSON type
    #[error("{path}: expected {expected}")]
    WrongType {
        /// Path of the field
        path: String,
        /// Human description of the expected type
        expected: &'static str,
    },

    /// The table name is empty
    #[error("{path}: table name must not be empty")]
    EmptyName {
        /// Path of the name field
        path: String,
    },

    /// Billing mode is not one of the recognized values
    #[error("{path}: unknown billing mode '{value}' (expected PAY_PER_REQUEST or PROVISIONED)")]
    UnknownBillingMode {
        /// Path of the billing mode field
        path: String,
        /// The rejected value
        value: String,
    },

    /// Capacity is not a non-negative integer
    #[error("{path}: capacity must be a non-negative integer, got {value}")]
    InvalidCapacity {
        /// Path of the capacity field
        path: String,
        /// The rejected value, rendered as JSON
        value: String,
    },

    /// An attribute has an empty name
    #[error("{path}: attribute name must not be empty")]
    EmptyAttributeName {
        /// Path of the attribute name
        path: String,
    },

    /// Attribute type is not S, N or B
    #[error("{path}: invalid attribute type '{value}' (expected S, N or B)")]
    InvalidAttributeType {
        /// Path of the type field
        path: String,
        /// The rejected value
        value: String,
    },

    /// Two attributes share a name
    #[error("{path}: duplicate attribute '{name}'")]
    DuplicateAttribute {
        /// Path of the second occurrence
        path: String,
        /// The repeated name
        name: String,
    },
}

impl ValidationError {
    /// Path of the offending field.
    pub fn path(&self) -> &str {
        match self {
            Self::NotAnObject { path }
            | Self::MissingField { path }
            | Self::WrongType { path, .. }
            | Self::EmptyName { path }
            | Self::UnknownBillingMode { path, .. }
            | Self::InvalidCapacity { path, .. }
            | Self::EmptyAttributeName { path }
            | Self::InvalidAttributeType { path, .. }
            | Self::DuplicateAttribute { path, .. } => path,
        }
    }
}

/// Cross-field rule violations found by the invariant checker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    /// On-demand billing with non-zero capacity
    #[error(
        "{path}: PAY_PER_REQUEST billing does not allow capacity (read={read_capacity}, write={write_capacity})"
    )]
    CapacityNotAllowedForOnDemandBilling {
        /// Path of the first offending capacity field
        path: String,
        /// Declared read capacity
        read_capacity: u64,
        /// Declared write capacity
        write_capacity: u64,
    },

    /// Provisioned billing without capacity
    #[error(
        "{path}: PROVISIONED billing requires read and write capacity > 0 (read={read_capacity}, write={write_capacity})"
    )]
    CapacityRequiredForProvisionedBilling {
        /// Path of the first offending capacity field
        path: String,
        /// Declared read capacity
        read_capacity: u64,
        /// Declared write capacity
        write_capacity: u64,
    },

    /// No attribute is available to form the key schema
    #[error("{path}: at least one attribute is required for the key schema")]
    MissingKeySchema {
        /// Path of the attributes field
        path: String,
    },

    /// Sort key does not designate a usable attribute
    #[error("{path}: {reason}")]
    InvalidSortKey {
        /// Path of the sort key field
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Attribute is neither the partition key nor the sort key
    #[error("{path}: attribute '{name}' is not part of the key schema")]
    UnusedAttribute {
        /// Path of the attribute name
        path: String,
        /// The unused attribute
        name: String,
    },

    /// Attribute set is not well formed (empty or repeated names)
    #[error("{path}: {reason}")]
    MalformedAttribute {
        /// Path of the attribute
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

impl InvariantError {
    /// Path of the offending field.
    pub fn path(&self) -> &str {
        match self {
            Self::CapacityNotAllowedForOnDemandBilling { path, .. }
            | Self::CapacityRequiredForProvisionedBilling { path, .. }
            | Self::MissingKeySchema { path }
            | Self::InvalidSortKey { path, .. }
            | Self::UnusedAttribute { path, .. }
            | Self::MalformedAttribute { path, .. } => path,
        }
    }
}

/// Either kind of specification error, as returned by [`crate::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// Input failed schema validation
    #[error("invalid table description: {0}")]
    Validation(#[from] ValidationError),

    /// Input failed an invariant
    #[error("inconsistent table description: {0}")]
    Invariant(#[from] InvariantError),
}

impl SpecError {
    /// Path of the offending field.
    pub fn path(&self) -> &str {
        match self {
            SpecError::Validation(e) => e.path(),
            SpecError::Invariant(e) => e.path(),
        }
    }
}

/// Result type for specification parsing.
pub type Result<T> = std::result::Result<T, SpecError>;
