//! Reconcile context: cancellation, progress reporting and per-name locks
//!
//! These keep the reconciler independent of any particular terminal UI or
//! thread layout.

use crate::error::{ProviderError, ReconcileError, Result};
use crate::types::LifecycleState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Cooperative cancellation flag shared between threads
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `false` if the token was cancelled before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Progress callback for reconciliation
///
/// Implement this trait to receive updates while tables converge.
pub trait ProgressCallback: Send + Sync {
    /// Called when a table moves between lifecycle states
    fn on_transition(&self, name: &str, from: LifecycleState, to: LifecycleState);

    /// Called before a transient failure is retried
    ///
    /// # Arguments
    /// * `attempt` - Attempt that failed (1-indexed)
    /// * `max_attempts` - Attempt budget
    /// * `error` - The transient error
    /// * `delay` - Wait before the next attempt
    fn on_retry(
        &self,
        name: &str,
        attempt: u32,
        max_attempts: u32,
        error: &ProviderError,
        delay: Duration,
    );
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_transition(&self, _name: &str, _from: LifecycleState, _to: LifecycleState) {}

    fn on_retry(&self, _: &str, _: u32, _: u32, _: &ProviderError, _: Duration) {}
}

/// Context passed to every reconcile call
#[derive(Clone)]
pub struct ReconcileContext<'a> {
    /// Checked before each provider attempt and during waits
    pub cancel: CancellationToken,
    /// Receives transitions and retries
    pub progress: &'a dyn ProgressCallback,
}

impl Default for ReconcileContext<'static> {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            progress: &NoProgress,
        }
    }
}

impl<'a> ReconcileContext<'a> {
    /// Context reporting to `progress`
    pub fn new(progress: &'a dyn ProgressCallback) -> Self {
        Self {
            cancel: CancellationToken::new(),
            progress,
        }
    }

    /// Use `cancel` as the cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Set of table names with a reconciliation in flight
#[derive(Debug, Clone, Default)]
pub struct ReconcileLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl ReconcileLocks {
    /// Empty lock set
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every name in `names`, or none of them.
    ///
    /// Fails with [`ReconcileError::ConcurrentReconcileInProgress`] naming the
    /// first name already held.
    pub fn try_lock<S: AsRef<str>>(&self, names: &[S]) -> Result<NameGuard> {
        let mut held = self.held();
        let mut wanted: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if held.contains(name) {
                return Err(ReconcileError::ConcurrentReconcileInProgress {
                    name: name.to_string(),
                });
            }
            if !wanted.iter().any(|w| w == name) {
                wanted.push(name.to_string());
            }
        }
        for name in &wanted {
            held.insert(name.clone());
        }
        log::trace!("Locked {wanted:?}");

        Ok(NameGuard {
            locks: self.clone(),
            names: wanted,
        })
    }

    /// Whether `name` is currently locked
    pub fn is_locked(&self, name: &str) -> bool {
        self.held().contains(name)
    }

    fn held(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its names when dropped
#[derive(Debug)]
pub struct NameGuard {
    locks: ReconcileLocks,
    names: Vec<String>,
}

impl NameGuard {
    /// Names held by this guard
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        let mut held = self.locks.held();
        for name in &self.names {
            held.remove(name);
        }
    }
}
