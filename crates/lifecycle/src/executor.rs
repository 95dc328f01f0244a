//! Reconciliation executor
//!
//! Turns a [`ChangePlan`] into provider calls, retrying transient failures,
//! waiting for tables to settle and recording every lifecycle transition.

use crate::context::{NameGuard, ReconcileContext, ReconcileLocks};
use crate::diff::compute_diff;
use crate::error::{Operation, ProviderError, ReconcileError, Result};
use crate::planner::{ChangePlan, plan};
use crate::provider::Provider;
use crate::retry::RetryConfig;
use crate::types::{Drift, LifecycleState, ReconcileAction, ReconcileOutcome, TableState};
use std::time::Duration;
use tablespec::TableSpec;

/// Polling policy while a table settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between describes
    pub poll_interval: Duration,
    /// Describes before giving up
    pub max_polls: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        }
    }
}

impl WaitConfig {
    /// Poll without sleeping
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            ..Default::default()
        }
    }
}

/// Compare a recorded state against what the provider reports now.
///
/// Returns `None` when every configuration field still matches. Status is
/// not compared.
pub fn detect_drift(recorded: &TableState, live: Option<&TableState>) -> Option<Drift> {
    let Some(live) = live else {
        return Some(Drift::Vanished);
    };
    let diff = compute_diff(&live.spec, &recorded.spec);
    (!diff.is_empty()).then_some(Drift::Changed(diff))
}

fn check_desired(desired: Option<&TableSpec>) -> Result<()> {
    let Some(spec) = desired else {
        return Ok(());
    };
    tablespec::check(spec).map_err(|source| ReconcileError::InvalidSpec {
        name: spec.name.clone(),
        source,
    })
}

/// Drives tables toward their desired state through a [`Provider`].
pub struct Reconciler<P> {
    provider: P,
    retry: RetryConfig,
    wait: WaitConfig,
    locks: ReconcileLocks,
}

impl<P: Provider> Reconciler<P> {
    /// Reconciler with default retry and wait policies
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            retry: RetryConfig::default(),
            wait: WaitConfig::default(),
            locks: ReconcileLocks::new(),
        }
    }

    /// Use a different retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Use a different wait policy
    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Share a lock set with other reconcilers
    pub fn with_locks(mut self, locks: ReconcileLocks) -> Self {
        self.locks = locks;
        self
    }

    /// The underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The lock set guarding table names
    pub fn locks(&self) -> &ReconcileLocks {
        &self.locks
    }

    /// Describe `name`, returning `None` if it does not exist.
    pub fn refresh(&self, name: &str, ctx: &ReconcileContext<'_>) -> Result<Option<TableState>> {
        let _guard = self.locks.try_lock(&[name])?;
        self.describe(name, ctx)
    }

    /// Move `observed` toward `desired`.
    ///
    /// `observed` is taken as the current truth; no refresh happens first
    /// unless it is still settling.
    pub fn reconcile(
        &self,
        desired: Option<&TableSpec>,
        observed: Option<&TableState>,
        ctx: &ReconcileContext<'_>,
    ) -> Result<ReconcileOutcome> {
        check_desired(desired)?;
        let _guard = self.lock_names(desired, observed)?;
        self.reconcile_locked(desired, observed, ctx)
    }

    /// One full cycle: refresh live state, report drift against `recorded`,
    /// otherwise reconcile toward `desired`.
    ///
    /// When drift is found no mutating call is made. The outcome carries the
    /// live state marked `DRIFTED`; persisting it makes the next cycle
    /// correct the drift.
    pub fn run_cycle(
        &self,
        desired: Option<&TableSpec>,
        recorded: Option<&TableState>,
        ctx: &ReconcileContext<'_>,
    ) -> Result<ReconcileOutcome> {
        check_desired(desired)?;
        let _guard = self.lock_names(desired, recorded)?;

        let name = match (recorded, desired) {
            (Some(state), _) => state.name(),
            (None, Some(spec)) => spec.name.as_str(),
            (None, None) => return self.reconcile_locked(None, None, ctx),
        };

        let live = self.describe(name, ctx)?;
        if let Some(recorded) = recorded
            && let Some(drift) = detect_drift(recorded, live.as_ref())
        {
            log::warn!("Drift detected on table '{name}': {drift:?}");
            ctx.progress
                .on_transition(name, recorded.status, LifecycleState::Drifted);
            return Ok(ReconcileOutcome {
                name: name.to_string(),
                action: ReconcileAction::DriftDetected,
                transitions: vec![LifecycleState::Drifted],
                state: live.map(|s| s.with_status(LifecycleState::Drifted)),
                drift: Some(drift),
            });
        }

        if recorded.is_none() && live.is_some() {
            log::info!("Adopting existing table '{name}'");
        }
        self.reconcile_locked(desired, live.as_ref(), ctx)
    }

    fn lock_names(
        &self,
        desired: Option<&TableSpec>,
        observed: Option<&TableState>,
    ) -> Result<NameGuard> {
        let names: Vec<&str> = desired
            .map(|d| d.name.as_str())
            .into_iter()
            .chain(observed.map(TableState::name))
            .collect();
        self.locks.try_lock(&names)
    }

    fn reconcile_locked(
        &self,
        desired: Option<&TableSpec>,
        observed: Option<&TableState>,
        ctx: &ReconcileContext<'_>,
    ) -> Result<ReconcileOutcome> {
        let observed = match observed {
            Some(state) if state.status.is_transitional() => {
                log::debug!(
                    "Table '{}' is {}, waiting before planning",
                    state.name(),
                    state.status
                );
                self.settle(state.name(), ctx)?
            }
            other => other.cloned(),
        };

        let change = plan(desired, observed.as_ref());
        log::debug!("Plan for '{}': {change:?}", change.name());

        match change {
            ChangePlan::AlreadyAbsent => Ok(ReconcileOutcome {
                name: String::new(),
                action: ReconcileAction::NoChange,
                transitions: vec![LifecycleState::Absent],
                state: None,
                drift: None,
            }),
            ChangePlan::NoChange { name } => Ok(ReconcileOutcome {
                name,
                action: ReconcileAction::NoChange,
                transitions: vec![LifecycleState::Active],
                state: observed.map(|s| s.with_status(LifecycleState::Active)),
                drift: None,
            }),
            ChangePlan::Create { spec } => {
                let mut track = Transitions::start(&spec.name, LifecycleState::Absent, ctx);
                track.enter(LifecycleState::Creating);
                let state = self.create(&spec, ctx)?;
                track.enter(LifecycleState::Active);
                log::info!("Created table '{}'", spec.name);
                Ok(track.finish(ReconcileAction::Created, Some(state)))
            }
            ChangePlan::Update { name, changes, .. } => {
                let mut track = Transitions::start(&name, LifecycleState::Active, ctx);
                track.enter(LifecycleState::Updating);
                let returned = self.call(Operation::Update, &name, ctx, |p| {
                    p.update_table(&name, &changes)
                })?;
                let state = self.settled(returned, ctx)?;
                track.enter(LifecycleState::Active);
                log::info!("Updated table '{name}'");
                Ok(track.finish(ReconcileAction::Updated, Some(state)))
            }
            ChangePlan::Replace { old_name, spec, .. } => {
                let mut track = Transitions::start(&spec.name, LifecycleState::Active, ctx);
                track.enter(LifecycleState::Destroying);
                self.delete(&old_name, ctx)?;
                track.enter(LifecycleState::Absent);
                track.enter(LifecycleState::Creating);
                let state = self.create(&spec, ctx).map_err(|source| {
                    ReconcileError::PartialReplace {
                        deleted: old_name.clone(),
                        source: Box::new(source),
                    }
                })?;
                track.enter(LifecycleState::Active);
                log::info!("Replaced table '{old_name}' with '{}'", spec.name);
                Ok(track.finish(ReconcileAction::Replaced, Some(state)))
            }
            ChangePlan::Destroy { name } => {
                let mut track = Transitions::start(&name, LifecycleState::Active, ctx);
                track.enter(LifecycleState::Destroying);
                self.delete(&name, ctx)?;
                track.enter(LifecycleState::Absent);
                log::info!("Destroyed table '{name}'");
                Ok(track.finish(ReconcileAction::Destroyed, None))
            }
        }
    }

    fn create(&self, spec: &TableSpec, ctx: &ReconcileContext<'_>) -> Result<TableState> {
        let returned = self.call(Operation::Create, &spec.name, ctx, |p| p.create_table(spec))?;
        self.settled(returned, ctx)
    }

    fn delete(&self, name: &str, ctx: &ReconcileContext<'_>) -> Result<()> {
        self.call(Operation::Delete, name, ctx, |p| match p.delete_table(name) {
            Err(e) if e.is_not_found() => {
                log::debug!("Table '{name}' already gone");
                Ok(())
            }
            other => other,
        })
    }

    fn describe(&self, name: &str, ctx: &ReconcileContext<'_>) -> Result<Option<TableState>> {
        self.call(Operation::Describe, name, ctx, |p| match p.describe_table(name) {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        })
    }

    /// Return `state` if already active, otherwise poll until it is.
    fn settled(&self, state: TableState, ctx: &ReconcileContext<'_>) -> Result<TableState> {
        if !state.status.is_transitional() {
            return Ok(state);
        }
        let name = state.name().to_string();
        self.settle(&name, ctx)?
            .ok_or_else(|| ReconcileError::Permanent {
                operation: Operation::Describe,
                name: name.clone(),
                attempts: 1,
                response: ProviderError::NotFound { name },
            })
    }

    /// Poll until `name` leaves a transitional status or disappears.
    fn settle(&self, name: &str, ctx: &ReconcileContext<'_>) -> Result<Option<TableState>> {
        let max_polls = self.wait.max_polls;
        for poll in 1..=max_polls {
            match self.describe(name, ctx)? {
                Some(state) if state.status.is_transitional() => {
                    log::debug!(
                        "Table '{name}' is {} (poll {poll}/{max_polls})",
                        state.status
                    );
                    if !ctx.cancel.sleep(self.wait.poll_interval) {
                        return Err(ReconcileError::Cancelled {
                            operation: Operation::Describe,
                            request_sent: true,
                        });
                    }
                }
                settled => return Ok(settled),
            }
        }
        Err(ReconcileError::ActivationTimeout {
            name: name.to_string(),
            polls: max_polls,
        })
    }

    /// Run one provider operation under the retry policy.
    fn call<T>(
        &self,
        operation: Operation,
        name: &str,
        ctx: &ReconcileContext<'_>,
        mut op: impl FnMut(&P) -> std::result::Result<T, ProviderError>,
    ) -> Result<T> {
        let max_attempts = self.retry.attempts();
        let mut attempt = 0;

        loop {
            if ctx.cancel.is_cancelled() {
                return Err(ReconcileError::Cancelled {
                    operation,
                    request_sent: attempt > 0,
                });
            }

            attempt += 1;
            log::trace!("{operation} '{name}' attempt {attempt}/{max_attempts}");

            match op(&self.provider) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt - 1);
                    log::warn!(
                        "{operation} '{name}' attempt {attempt}/{max_attempts} failed: {e}. Retrying in {delay:?}"
                    );
                    ctx.progress
                        .on_retry(name, attempt, max_attempts, &e, delay);
                    if !ctx.cancel.sleep(delay) {
                        return Err(ReconcileError::Cancelled {
                            operation,
                            request_sent: true,
                        });
                    }
                }
                Err(e) => {
                    log::error!("{operation} '{name}' failed after {attempt} attempt(s): {e}");
                    return Err(ReconcileError::Permanent {
                        operation,
                        name: name.to_string(),
                        attempts: attempt,
                        response: e,
                    });
                }
            }
        }
    }
}

/// Records visited states and forwards each move to the progress callback.
struct Transitions<'c, 'a> {
    name: String,
    visited: Vec<LifecycleState>,
    ctx: &'c ReconcileContext<'a>,
}

impl<'c, 'a> Transitions<'c, 'a> {
    fn start(name: &str, initial: LifecycleState, ctx: &'c ReconcileContext<'a>) -> Self {
        Self {
            name: name.to_string(),
            visited: vec![initial],
            ctx,
        }
    }

    fn enter(&mut self, next: LifecycleState) {
        let from = self
            .visited
            .last()
            .copied()
            .unwrap_or(LifecycleState::Absent);
        log::debug!("Table '{}': {from} -> {next}", self.name);
        self.ctx.progress.on_transition(&self.name, from, next);
        self.visited.push(next);
    }

    fn finish(self, action: ReconcileAction, state: Option<TableState>) -> ReconcileOutcome {
        ReconcileOutcome {
            name: self.name,
            action,
            transitions: self.visited,
            state,
            drift: None,
        }
    }
}
