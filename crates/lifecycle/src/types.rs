//! Core types for table lifecycle management

use crate::diff::TableDiff;
use serde::{Deserialize, Serialize};
use std::fmt;
use tablespec::TableSpec;

/// Lifecycle state of a named table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// No table exists
    Absent,
    /// Create request accepted, table not yet usable
    Creating,
    /// Table exists and matches the last applied spec
    Active,
    /// Update request accepted, table not yet settled
    Updating,
    /// Table changed outside this system
    Drifted,
    /// Delete request issued
    Destroying,
}

impl LifecycleState {
    /// Whether the provider is still working on a request
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Destroying)
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "ABSENT",
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Updating => "UPDATING",
            Self::Drifted => "DRIFTED",
            Self::Destroying => "DESTROYING",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actual state of a table as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    /// Configuration the provider reports
    #[serde(flatten)]
    pub spec: TableSpec,
    /// Provider-reported lifecycle status
    pub status: LifecycleState,
    /// Opaque handle returned on creation
    pub provider_identifier: String,
}

impl TableState {
    /// Build a state from a spec
    pub fn from_spec(
        spec: &TableSpec,
        status: LifecycleState,
        provider_identifier: impl Into<String>,
    ) -> Self {
        Self {
            spec: spec.clone(),
            status,
            provider_identifier: provider_identifier.into(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether the configuration matches `desired` field for field
    pub fn matches(&self, desired: &TableSpec) -> bool {
        &self.spec == desired
    }

    /// Copy with a different status
    pub fn with_status(mut self, status: LifecycleState) -> Self {
        self.status = status;
        self
    }
}

/// What a reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// Nothing to do
    NoChange,
    /// Table was created
    Created,
    /// Mutable fields were updated in place
    Updated,
    /// Table was destroyed and recreated
    Replaced,
    /// Table was destroyed
    Destroyed,
    /// Out-of-band change found and reported, nothing applied
    DriftDetected,
}

impl ReconcileAction {
    /// Whether the provider was asked to change something
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Destroyed
        )
    }
}

/// How recorded state diverged from the live table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// Table exists but fields changed (recorded → live)
    Changed(TableDiff),
    /// Table no longer exists
    Vanished,
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Table name (the desired name when both sides exist)
    pub name: String,
    /// What happened
    pub action: ReconcileAction,
    /// Every lifecycle state visited, in order
    pub transitions: Vec<LifecycleState>,
    /// Provider-confirmed state after the cycle, `None` when absent
    pub state: Option<TableState>,
    /// Drift found during refresh
    pub drift: Option<Drift>,
}

impl ReconcileOutcome {
    /// Last lifecycle state reached
    pub fn final_state(&self) -> LifecycleState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(LifecycleState::Absent)
    }
}
