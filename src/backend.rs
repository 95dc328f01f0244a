//! File-backed control plane.
//!
//! Keeps the simulated account in `account.json` so successive runs see the
//! same tables. Editing that file by hand is an out-of-band change, which the
//! next `plan` or `apply` reports as drift.

use anyhow::{Context, Result};
use lifecycle::{MemoryProvider, Provider, ProviderError, Snapshot, TableChanges, TableState};
use std::fs;
use std::path::{Path, PathBuf};
use tablespec::TableSpec;

/// Account file name inside the state directory
pub const ACCOUNT_FILE: &str = "account.json";

/// A [`MemoryProvider`] loaded from and saved to a JSON file
pub struct FileProvider {
    path: PathBuf,
    inner: MemoryProvider,
}

impl FileProvider {
    /// Open the account in `state_dir`, starting empty if it doesn't exist
    pub fn open(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(ACCOUNT_FILE);

        let snapshot = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read account file: {}", path.display()))?;
            serde_json::from_str::<Snapshot>(&content)
                .with_context(|| format!("Failed to parse account file: {}", path.display()))?
        } else {
            log::debug!("Account file does not exist, starting empty");
            Snapshot::default()
        };

        log::debug!(
            "Opened account with {} table(s) from {}",
            snapshot.tables.len(),
            path.display()
        );
        Ok(Self {
            path,
            inner: MemoryProvider::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the account back to disk
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(&self.inner.snapshot())
            .context("Failed to serialize account")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write account file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace account file: {}", self.path.display()))?;

        log::debug!("Saved account to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
impl FileProvider {
    /// Queue a failure for the next `operation`
    pub fn fail_next(&self, operation: lifecycle::Operation, error: ProviderError) {
        self.inner.fail_next(operation, error);
    }
}

impl Provider for FileProvider {
    fn create_table(&self, spec: &TableSpec) -> Result<TableState, ProviderError> {
        self.inner.create_table(spec)
    }

    fn update_table(
        &self,
        name: &str,
        changes: &TableChanges,
    ) -> Result<TableState, ProviderError> {
        self.inner.update_table(name, changes)
    }

    fn delete_table(&self, name: &str) -> Result<(), ProviderError> {
        self.inner.delete_table(name)
    }

    fn describe_table(&self, name: &str) -> Result<TableState, ProviderError> {
        self.inner.describe_table(name)
    }

    fn list_tables(&self) -> Result<Vec<String>, ProviderError> {
        self.inner.list_tables()
    }
}
