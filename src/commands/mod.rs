//! Command implementations and the pieces they share.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod status;
pub mod validate;

use crate::backend::FileProvider;
use crate::config::Settings;
use crate::desired::DesiredTable;
use crate::paths;
use crate::state::StateStore;
use anyhow::{Result, bail};
use lifecycle::{Reconciler, TableState};
use std::collections::BTreeSet;
use std::path::Path;

/// Everything a command needs: settings, recorded state and the provider.
pub struct Session {
    pub settings: Settings,
    pub state: StateStore,
    pub provider: FileProvider,
}

impl Session {
    /// Open using the resolved config and state directories
    pub fn open() -> Result<Self> {
        Self::open_in(&paths::config_dir()?, &paths::state_dir()?)
    }

    pub fn open_in(config_dir: &Path, state_dir: &Path) -> Result<Self> {
        Ok(Self {
            settings: Settings::load(config_dir)?,
            state: StateStore::open(state_dir)?,
            provider: FileProvider::open(state_dir)?,
        })
    }

    /// Reconciler over this session's provider, configured from settings
    pub fn reconciler(&self) -> Reconciler<&FileProvider> {
        Reconciler::new(&self.provider)
            .with_retry(self.settings.retry_config())
            .with_wait(self.settings.wait_config())
    }

    /// Persist the account and the recorded state
    pub fn save(&mut self) -> Result<()> {
        self.provider.save()?;
        self.state.save()
    }
}

/// A desired declaration matched with what was recorded for it
#[derive(Debug, Clone)]
pub struct Pairing<'a> {
    pub desired: Option<&'a DesiredTable>,
    pub recorded: Option<TableState>,
}

impl Pairing<'_> {
    /// Name this pairing is reported under
    pub fn name(&self) -> &str {
        match (self.desired, &self.recorded) {
            (Some(d), _) => d.name(),
            (None, Some(r)) => r.name(),
            (None, None) => "",
        }
    }

    /// Recorded entry's name, if any
    pub fn recorded_name(&self) -> Option<&str> {
        self.recorded.as_ref().map(TableState::name)
    }

    fn matches(&self, filter: &BTreeSet<&str>) -> bool {
        filter.is_empty()
            || filter.contains(self.name())
            || self.recorded_name().is_some_and(|n| filter.contains(n))
    }
}

/// Match desired tables with recorded state.
///
/// A declaration pairs with the entry named by its `replaces` key when that
/// entry exists, otherwise with the entry of its own name. Recorded entries
/// no declaration claims are paired with nothing, so they get destroyed.
/// No table name may appear in two pairings, since each cycle locks every
/// name it touches.
pub fn pair<'a>(desired: &'a [DesiredTable], state: &StateStore) -> Result<Vec<Pairing<'a>>> {
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut pairings = Vec::new();

    for table in desired {
        let key = table
            .replaces
            .as_deref()
            .filter(|old| state.get(old).is_some())
            .unwrap_or(table.name());
        if !claimed.insert(key.to_string()) {
            bail!("Recorded table '{key}' is claimed by more than one declaration");
        }
        pairings.push(Pairing {
            desired: Some(table),
            recorded: state.get(key).cloned(),
        });
    }

    for (name, recorded) in state.tables() {
        if !claimed.contains(name) {
            pairings.push(Pairing {
                desired: None,
                recorded: Some(recorded.clone()),
            });
        }
    }

    check_disjoint(&pairings)?;
    Ok(pairings)
}

fn check_disjoint(pairings: &[Pairing<'_>]) -> Result<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for pairing in pairings {
        let names: BTreeSet<&str> = pairing
            .desired
            .map(DesiredTable::name)
            .into_iter()
            .chain(pairing.recorded_name())
            .collect();
        for name in names {
            if !seen.insert(name) {
                bail!(
                    "Table '{name}' is recorded and also the target of a rename; destroy it or drop the `replaces` key first"
                );
            }
        }
    }
    Ok(())
}

/// Keep only pairings named in `tables` (all when empty); unknown names are an error.
pub fn select<'a>(pairings: Vec<Pairing<'a>>, tables: &[String]) -> Result<Vec<Pairing<'a>>> {
    let filter: BTreeSet<&str> = tables.iter().map(String::as_str).collect();
    let selected: Vec<Pairing<'a>> = pairings.into_iter().filter(|p| p.matches(&filter)).collect();

    for name in &filter {
        let known = selected
            .iter()
            .any(|p| p.name() == *name || p.recorded_name() == Some(*name));
        if !known {
            bail!("Unknown table '{name}': not declared and not recorded");
        }
    }
    Ok(selected)
}
