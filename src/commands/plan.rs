//! `keytable plan`: refresh live state and preview changes without applying them.

use super::{Session, pair, select};
use crate::Context;
use crate::cli::TargetArgs;
use crate::desired;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use lifecycle::{ChangePlan, Drift, ReconcileContext, detect_drift, format_plan, plan};

/// Planned change for one table
#[derive(Debug)]
pub struct PlanEntry {
    pub name: String,
    /// Drift between recorded and live state; apply reports it before changing anything
    pub drift: Option<Drift>,
    pub plan: ChangePlan,
}

pub fn compute(session: &Session, ctx: &Context, args: &TargetArgs) -> Result<Vec<PlanEntry>> {
    let tables = desired::load(&ctx.file)?;
    let pairings = select(pair(&tables, &session.state)?, &args.tables)?;
    let reconciler = session.reconciler();
    let rctx = ReconcileContext::default();

    let mut entries = Vec::with_capacity(pairings.len());
    for pairing in &pairings {
        let lookup = pairing.recorded_name().unwrap_or(pairing.name());
        let live = reconciler.refresh(lookup, &rctx)?;
        let drift = pairing
            .recorded
            .as_ref()
            .and_then(|recorded| detect_drift(recorded, live.as_ref()));
        let desired = pairing.desired.map(|d| &d.spec);

        entries.push(PlanEntry {
            name: pairing.name().to_string(),
            drift,
            plan: plan(desired, live.as_ref()),
        });
    }
    Ok(entries)
}

pub fn run(ctx: &Context, args: &TargetArgs) -> Result<()> {
    let session = Session::open()?;
    let entries = compute(&session, ctx, args)?;

    ui::header("Plan");
    if entries.is_empty() {
        ui::info("No tables declared or recorded");
        return Ok(());
    }

    for entry in &entries {
        if let Some(drift) = &entry.drift {
            print_drift(&entry.name, drift);
        }
        for line in format_plan(&entry.plan) {
            ui::plan_line(&line);
        }
    }

    let changes = entries.iter().filter(|e| e.plan.is_change()).count();
    let drifted = entries.iter().filter(|e| e.drift.is_some()).count();
    println!();
    if drifted > 0 {
        ui::warn(&format!(
            "{drifted} table(s) drifted; the next apply records live state, the one after corrects it"
        ));
    }
    if changes == 0 {
        ui::success("Everything is up to date");
    } else {
        ui::info(&format!(
            "{} to change, {} unchanged",
            changes.to_string().bold(),
            entries.len() - changes
        ));
    }
    Ok(())
}

pub fn print_drift(name: &str, drift: &Drift) {
    match drift {
        Drift::Vanished => ui::warn(&format!(
            "Table '{name}' was deleted outside keytable"
        )),
        Drift::Changed(diff) => {
            ui::warn(&format!("Table '{name}' changed outside keytable"));
            for change in &diff.changes {
                ui::dim(&format!(
                    "{}: recorded {} / live {}",
                    change.field, change.from, change.to
                ));
            }
        }
    }
}
