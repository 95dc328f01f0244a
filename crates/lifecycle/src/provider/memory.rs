//! In-process control plane.
//!
//! Keeps tables in a map, records every call, and can be scripted to fail or
//! to report `CREATING`/`UPDATING` for a number of describes before settling.
//! Out-of-band hooks ([`MemoryProvider::modify`], [`MemoryProvider::remove`])
//! simulate changes made outside the reconciler.

use super::{Provider, TableChanges};
use crate::error::{Operation, ProviderError};
use crate::types::{LifecycleState, TableState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tablespec::TableSpec;

/// A recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    /// CreateTable
    Create(String),
    /// UpdateTable with its change set
    Update(String, TableChanges),
    /// DeleteTable
    Delete(String),
    /// DescribeTable
    Describe(String),
    /// ListTables
    List,
}

impl ProviderCall {
    /// Operation this call performed
    pub fn operation(&self) -> Operation {
        match self {
            ProviderCall::Create(_) => Operation::Create,
            ProviderCall::Update(..) => Operation::Update,
            ProviderCall::Delete(_) => Operation::Delete,
            ProviderCall::Describe(_) => Operation::Describe,
            ProviderCall::List => Operation::List,
        }
    }

    /// Whether the call could change infrastructure
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ProviderCall::Create(_) | ProviderCall::Update(..) | ProviderCall::Delete(_)
        )
    }
}

/// Persistable contents of a [`MemoryProvider`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tables by name
    #[serde(default)]
    pub tables: BTreeMap<String, TableState>,
    /// Counter for provider identifiers
    #[serde(default)]
    pub next_id: u64,
}

#[derive(Default)]
struct Inner {
    snapshot: Snapshot,
    calls: Vec<ProviderCall>,
    faults: HashMap<Operation, VecDeque<ProviderError>>,
    settle_polls: u32,
    settling: HashMap<String, u32>,
}

impl Inner {
    fn take_fault(&mut self, operation: Operation) -> Option<ProviderError> {
        self.faults.get_mut(&operation)?.pop_front()
    }

    fn begin_settling(&mut self, name: &str, transitional: LifecycleState) -> LifecycleState {
        if self.settle_polls == 0 {
            self.settling.remove(name);
            return LifecycleState::Active;
        }
        self.settling.insert(name.to_string(), self.settle_polls);
        transitional
    }
}

/// Table store living in process memory
#[derive(Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    /// Empty provider; tables become `ACTIVE` immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider seeded with existing tables
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot,
                ..Inner::default()
            }),
        }
    }

    /// Report a transitional status for `polls` describes after each create or update
    pub fn with_settle_polls(self, polls: u32) -> Self {
        self.lock().settle_polls = polls;
        self
    }

    /// Fail the next call of `operation` with `error`. Queued faults fire in order.
    pub fn fail_next(&self, operation: Operation, error: ProviderError) {
        self.lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Current contents
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    /// Every call made so far, faulted ones included
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// Calls that could have changed infrastructure
    pub fn mutating_calls(&self) -> Vec<ProviderCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    /// Number of recorded calls for `operation`
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Look at a table without recording a call
    pub fn table(&self, name: &str) -> Option<TableState> {
        self.lock().snapshot.tables.get(name).cloned()
    }

    /// Put a table in place out of band
    pub fn insert(&self, state: TableState) {
        self.lock()
            .snapshot
            .tables
            .insert(state.name().to_string(), state);
    }

    /// Edit a table's configuration out of band. Returns false if it does not exist.
    pub fn modify(&self, name: &str, edit: impl FnOnce(&mut TableSpec)) -> bool {
        match self.lock().snapshot.tables.get_mut(name) {
            Some(state) => {
                edit(&mut state.spec);
                true
            }
            None => false,
        }
    }

    /// Delete a table out of band
    pub fn remove(&self, name: &str) -> Option<TableState> {
        self.lock().snapshot.tables.remove(name)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Provider for MemoryProvider {
    fn create_table(&self, spec: &TableSpec) -> Result<TableState, ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Create(spec.name.clone()));
        if let Some(fault) = inner.take_fault(Operation::Create) {
            return Err(fault);
        }
        if inner.snapshot.tables.contains_key(&spec.name) {
            return Err(ProviderError::NameConflict {
                name: spec.name.clone(),
            });
        }

        inner.snapshot.next_id += 1;
        let identifier = format!("table/{}/{:06}", spec.name, inner.snapshot.next_id);
        let status = inner.begin_settling(&spec.name, LifecycleState::Creating);
        let state = TableState::from_spec(spec, status, identifier);
        inner
            .snapshot
            .tables
            .insert(spec.name.clone(), state.clone());
        Ok(state)
    }

    fn update_table(
        &self,
        name: &str,
        changes: &TableChanges,
    ) -> Result<TableState, ProviderError> {
        let mut inner = self.lock();
        inner
            .calls
            .push(ProviderCall::Update(name.to_string(), changes.clone()));
        if let Some(fault) = inner.take_fault(Operation::Update) {
            return Err(fault);
        }
        if !inner.snapshot.tables.contains_key(name) {
            return Err(ProviderError::NotFound {
                name: name.to_string(),
            });
        }

        let status = inner.begin_settling(name, LifecycleState::Updating);
        let state = inner
            .snapshot
            .tables
            .get_mut(name)
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })?;
        changes.apply_to(&mut state.spec);
        state.status = status;
        Ok(state.clone())
    }

    fn delete_table(&self, name: &str) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Delete(name.to_string()));
        if let Some(fault) = inner.take_fault(Operation::Delete) {
            return Err(fault);
        }
        inner.settling.remove(name);
        inner
            .snapshot
            .tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })
    }

    fn describe_table(&self, name: &str) -> Result<TableState, ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Describe(name.to_string()));
        if let Some(fault) = inner.take_fault(Operation::Describe) {
            return Err(fault);
        }

        let remaining = inner.settling.get(name).copied().unwrap_or(0);
        if remaining > 1 {
            inner.settling.insert(name.to_string(), remaining - 1);
        } else if remaining == 1 {
            inner.settling.remove(name);
        }

        let state = inner
            .snapshot
            .tables
            .get_mut(name)
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })?;
        if remaining == 0 && state.status.is_transitional() {
            state.status = LifecycleState::Active;
        }
        Ok(state.clone())
    }

    fn list_tables(&self) -> Result<Vec<String>, ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::List);
        if let Some(fault) = inner.take_fault(Operation::List) {
            return Err(fault);
        }
        Ok(inner.snapshot.tables.keys().cloned().collect())
    }
}
