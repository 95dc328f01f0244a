use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lifecycle::{ReconcileOutcome, TableState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.toml";

// ============================================================================
// State Structures
// ============================================================================

/// Last-known state of every managed table
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordedState {
    /// Last time the state was saved
    pub last_updated: DateTime<Utc>,

    /// Recorded table states by name
    #[serde(default)]
    pub tables: BTreeMap<String, TableState>,
}

impl Default for RecordedState {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
            tables: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateStore
// ============================================================================

/// Recorded state bound to its file. Read once per run, written once at the end.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: RecordedState,
}

impl StateStore {
    /// Load `state.toml` from `state_dir`, or start empty if it doesn't exist
    pub fn open(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(STATE_FILE);

        if !path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(Self {
                path,
                state: RecordedState::default(),
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: RecordedState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded {} recorded table(s) from {}",
            state.tables.len(),
            path.display()
        );
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tables(&self) -> &BTreeMap<String, TableState> {
        &self.state.tables
    }

    pub fn get(&self, name: &str) -> Option<&TableState> {
        self.state.tables.get(name)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.state.last_updated
    }

    /// Record the result of a cycle that started from `previous`.
    ///
    /// The entry for `previous` is dropped and the outcome's state, if any,
    /// stored under its own name.
    pub fn record(&mut self, previous: Option<&str>, outcome: &ReconcileOutcome) {
        if let Some(name) = previous {
            self.state.tables.remove(name);
        }
        if let Some(state) = &outcome.state {
            self.state
                .tables
                .insert(state.name().to_string(), state.clone());
        }
    }

    /// Drop the entry for `name`, returning whether there was one
    pub fn forget(&mut self, name: &str) -> bool {
        self.state.tables.remove(name).is_some()
    }

    /// Stamp and write the state file
    pub fn save(&mut self) -> Result<()> {
        self.state.last_updated = Utc::now();

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create state directory: {}", dir.display())
            })?;
        }
        let content =
            toml::to_string_pretty(&self.state).context("Failed to serialize state to TOML")?;
        fs::write(&self.path, &content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
