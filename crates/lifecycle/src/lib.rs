//! # lifecycle
//!
//! Declarative lifecycle reconciliation for managed tables.
//!
//! This crate provides:
//! - **Planning**: field-by-field diff of desired against observed state,
//!   classified into no-change, update, replace, create or destroy
//! - **Execution**: provider calls with bounded exponential backoff on
//!   transient failures, waiting for tables to settle
//! - **Drift detection**: a refresh step that reports out-of-band changes
//!   instead of silently correcting them
//! - **Concurrency**: per-name locks and cooperative cancellation
//!
//! ## Example
//!
//! ```
//! use lifecycle::{MemoryProvider, ReconcileAction, ReconcileContext, Reconciler};
//! use tablespec::{AttributeDefinition, AttributeType, TableSpec};
//!
//! let provider = MemoryProvider::new();
//! let reconciler = Reconciler::new(&provider);
//! let spec = TableSpec::on_demand("users", AttributeDefinition::new("username", AttributeType::S));
//!
//! let outcome = reconciler
//!     .reconcile(Some(&spec), None, &ReconcileContext::default())
//!     .unwrap();
//! assert_eq!(outcome.action, ReconcileAction::Created);
//!
//! let again = reconciler
//!     .reconcile(Some(&spec), outcome.state.as_ref(), &ReconcileContext::default())
//!     .unwrap();
//! assert_eq!(again.action, ReconcileAction::NoChange);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod provider;
pub mod retry;
pub mod types;

pub use context::{
    CancellationToken, NameGuard, NoProgress, ProgressCallback, ReconcileContext, ReconcileLocks,
};
pub use diff::{Field, FieldChange, Mutability, TableDiff, compute_diff};
pub use error::{ErrorCategory, Operation, ProviderError, ReconcileError, Result};
pub use executor::{Reconciler, WaitConfig, detect_drift};
pub use planner::{ChangePlan, format_plan, plan};
pub use provider::{MemoryProvider, Provider, ProviderCall, Snapshot, TableChanges};
pub use retry::RetryConfig;
pub use types::{Drift, LifecycleState, ReconcileAction, ReconcileOutcome, TableState};
