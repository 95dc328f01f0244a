//! # tablespec
//!
//! Desired-state model for a managed key-value table, with the two checks
//! every description passes before it may reach a provider:
//!
//! - [`validate`]: structural parsing of an untyped description into a
//!   [`TableSpec`]
//! - [`check`]: cross-field invariants (billing/capacity coupling, key schema)
//!
//! [`parse`] runs both in order.
//!
//! ## Example
//!
//! ```
//! use tablespec::{parse, BillingMode, SpecError, InvariantError};
//!
//! let raw = serde_json::json!({
//!     "name": "users",
//!     "billing_mode": "PAY_PER_REQUEST",
//!     "attributes": [{ "name": "username", "type": "S" }],
//! });
//! let spec = parse(&raw).unwrap();
//! assert_eq!(spec.billing_mode, BillingMode::PayPerRequest);
//!
//! let bad = serde_json::json!({
//!     "name": "users",
//!     "billing_mode": "PAY_PER_REQUEST",
//!     "write_capacity": 5,
//!     "attributes": [{ "name": "username", "type": "S" }],
//! });
//! assert!(matches!(
//!     parse(&bad),
//!     Err(SpecError::Invariant(InvariantError::CapacityNotAllowedForOnDemandBilling { .. }))
//! ));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod invariants;
pub mod types;
pub mod validate;

pub use error::{InvariantError, Result, SpecError, ValidationError};
pub use invariants::check;
pub use types::{AttributeDefinition, AttributeType, BillingMode, TableSpec};
pub use validate::{validate, validate_at};

use serde_json::Value;

/// Validate then check a raw description.
pub fn parse(raw: &Value) -> Result<TableSpec> {
    parse_at(raw, "")
}

/// [`parse`] with field paths reported under `prefix`.
pub fn parse_at(raw: &Value, prefix: &str) -> Result<TableSpec> {
    let spec = validate_at(raw, prefix)?;
    invariants::check(&spec).map_err(|e| prefix_invariant(e, prefix))?;
    Ok(spec)
}

fn prefix_invariant(err: InvariantError, prefix: &str) -> InvariantError {
    if prefix.is_empty() {
        return err;
    }
    let with_prefix = |path: String| format!("{prefix}.{path}");
    match err {
        InvariantError::CapacityNotAllowedForOnDemandBilling {
            path,
            read_capacity,
            write_capacity,
        } => InvariantError::CapacityNotAllowedForOnDemandBilling {
            path: with_prefix(path),
            read_capacity,
            write_capacity,
        },
        InvariantError::CapacityRequiredForProvisionedBilling {
            path,
            read_capacity,
            write_capacity,
        } => InvariantError::CapacityRequiredForProvisionedBilling {
            path: with_prefix(path),
            read_capacity,
            write_capacity,
        },
        InvariantError::MissingKeySchema { path } => InvariantError::MissingKeySchema {
            path: with_prefix(path),
        },
        InvariantError::InvalidSortKey { path, reason } => InvariantError::InvalidSortKey {
            path: with_prefix(path),
            reason,
        },
        InvariantError::UnusedAttribute { path, name } => InvariantError::UnusedAttribute {
            path: with_prefix(path),
            name,
        },
        InvariantError::MalformedAttribute { path, reason } => {
            InvariantError::MalformedAttribute {
                path: with_prefix(path),
                reason,
            }
        }
    }
}
