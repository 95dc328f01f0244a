//! `keytable status`: recorded versus live state for every known table.

use super::Session;
use crate::Context;
use crate::desired;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use lifecycle::{LifecycleState, Provider, ReconcileContext, TableState, detect_drift};
use std::collections::BTreeSet;

/// One line of the status table
#[derive(Debug)]
pub struct StatusRow {
    pub name: String,
    pub declared: bool,
    pub recorded: Option<LifecycleState>,
    pub live: Option<TableState>,
    pub drifted: bool,
}

impl StatusRow {
    /// Live table that is neither declared nor recorded
    pub fn is_untracked(&self) -> bool {
        !self.declared && self.recorded.is_none() && self.live.is_some()
    }
}

pub fn compute(session: &Session, ctx: &Context) -> Result<Vec<StatusRow>> {
    let declared: BTreeSet<String> = if ctx.file.exists() {
        desired::load(&ctx.file)?
            .into_iter()
            .map(|t| t.spec.name)
            .collect()
    } else {
        log::debug!("No desired-state file at {}", ctx.file.display());
        BTreeSet::new()
    };

    let live_names: BTreeSet<String> = session.provider.list_tables()?.into_iter().collect();
    let names: BTreeSet<&String> = declared
        .iter()
        .chain(session.state.tables().keys())
        .chain(live_names.iter())
        .collect();

    let reconciler = session.reconciler();
    let rctx = ReconcileContext::default();
    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let recorded = session.state.get(name);
        let live = if live_names.contains(name) || recorded.is_some() {
            reconciler.refresh(name, &rctx)?
        } else {
            None
        };
        let drifted = recorded.is_some_and(|r| {
            r.status == LifecycleState::Drifted || detect_drift(r, live.as_ref()).is_some()
        });

        rows.push(StatusRow {
            name: name.clone(),
            declared: declared.contains(name),
            recorded: recorded.map(|r| r.status),
            live,
            drifted,
        });
    }
    Ok(rows)
}

pub fn run(ctx: &Context) -> Result<()> {
    let session = Session::open()?;
    let rows = compute(&session, ctx)?;

    ui::header("Tables");
    if rows.is_empty() {
        ui::info("No tables declared, recorded or deployed");
        return Ok(());
    }

    for row in &rows {
        let live = row
            .live
            .as_ref()
            .map_or(LifecycleState::Absent, |s| s.status);
        let mut notes = Vec::new();
        if row.drifted {
            notes.push("drifted".yellow().to_string());
        }
        if row.is_untracked() {
            notes.push("untracked".dimmed().to_string());
        }
        if row.declared && row.recorded.is_none() {
            notes.push("not applied".cyan().to_string());
        }
        if !row.declared && row.recorded.is_some() {
            notes.push("will be destroyed".red().to_string());
        }

        println!(
            "  {:<24} {:<12} {}",
            row.name.bold(),
            ui::state_label(live),
            notes.join(", ")
        );
        if ctx.verbose > 0
            && let Some(state) = &row.live
        {
            ui::kv("billing", state.spec.billing_mode.as_str());
            ui::kv("identifier", &state.provider_identifier);
        }
    }

    println!();
    ui::dim(&format!(
        "State: {} (updated {})",
        session.state.path().display(),
        session.state.last_updated().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    Ok(())
}
