//! Provider abstraction for the cloud control plane.
//!
//! The [`Provider`] trait is the only way the reconciler touches real
//! infrastructure. Retry policy belongs to the reconciler; a provider reports
//! each failure once and lets [`ProviderError::category`] decide.

pub mod memory;

pub use memory::{MemoryProvider, ProviderCall, Snapshot};

use crate::error::ProviderError;
use crate::types::TableState;
use serde::{Deserialize, Serialize};
use tablespec::{AttributeDefinition, BillingMode, TableSpec};

/// Control-plane operations on tables.
pub trait Provider: Send + Sync {
    /// Create a table. The returned state may still be `CREATING`.
    fn create_table(&self, spec: &TableSpec) -> Result<TableState, ProviderError>;

    /// Apply a change set to an existing table. The returned state may still be `UPDATING`.
    fn update_table(&self, name: &str, changes: &TableChanges)
    -> Result<TableState, ProviderError>;

    /// Delete a table.
    fn delete_table(&self, name: &str) -> Result<(), ProviderError>;

    /// Describe a table, failing with [`ProviderError::NotFound`] when it does not exist.
    fn describe_table(&self, name: &str) -> Result<TableState, ProviderError>;

    /// Names of all tables visible to the provider.
    fn list_tables(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

impl<P: Provider + ?Sized> Provider for &P {
    fn create_table(&self, spec: &TableSpec) -> Result<TableState, ProviderError> {
        (**self).create_table(spec)
    }

    fn update_table(
        &self,
        name: &str,
        changes: &TableChanges,
    ) -> Result<TableState, ProviderError> {
        (**self).update_table(name, changes)
    }

    fn delete_table(&self, name: &str) -> Result<(), ProviderError> {
        (**self).delete_table(name)
    }

    fn describe_table(&self, name: &str) -> Result<TableState, ProviderError> {
        (**self).describe_table(name)
    }

    fn list_tables(&self) -> Result<Vec<String>, ProviderError> {
        (**self).list_tables()
    }
}

/// Mutable fields to change on an existing table.
///
/// Only fields that differ are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChanges {
    /// New billing mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,
    /// New read capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_capacity: Option<u64>,
    /// New write capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_capacity: Option<u64>,
    /// New attribute definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeDefinition>>,
    /// Sort key that goes with `attributes`; ignored when `attributes` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

impl TableChanges {
    /// Change set turning `observed` into `desired`. Names are not compared.
    pub fn between(desired: &TableSpec, observed: &TableSpec) -> Self {
        fn changed<T: PartialEq + Clone>(desired: &T, observed: &T) -> Option<T> {
            (desired != observed).then(|| desired.clone())
        }

        let key_schema_changed =
            desired.attributes != observed.attributes || desired.sort_key != observed.sort_key;

        Self {
            billing_mode: changed(&desired.billing_mode, &observed.billing_mode),
            read_capacity: changed(&desired.read_capacity, &observed.read_capacity),
            write_capacity: changed(&desired.write_capacity, &observed.write_capacity),
            attributes: key_schema_changed.then(|| desired.attributes.clone()),
            sort_key: desired.sort_key.clone().filter(|_| key_schema_changed),
        }
    }

    /// Nothing to change
    pub fn is_empty(&self) -> bool {
        self.billing_mode.is_none()
            && self.read_capacity.is_none()
            && self.write_capacity.is_none()
            && self.attributes.is_none()
    }

    /// Apply the change set to a spec in place
    pub fn apply_to(&self, spec: &mut TableSpec) {
        if let Some(mode) = self.billing_mode {
            spec.billing_mode = mode;
        }
        if let Some(read) = self.read_capacity {
            spec.read_capacity = read;
        }
        if let Some(write) = self.write_capacity {
            spec.write_capacity = write;
        }
        if let Some(attributes) = &self.attributes {
            spec.attributes = attributes.clone();
            spec.sort_key = self.sort_key.clone();
        }
    }
}
