//! `keytable destroy`: delete recorded tables regardless of the desired-state file.

use super::Session;
use super::apply::{TableResult, confirm_proceed};
use crate::Context;
use crate::cli::DestroyArgs;
use crate::ui;
use anyhow::{Result, bail};
use colored::Colorize;
use lifecycle::{ReconcileContext, ReconcileOutcome};

/// Names to destroy: the requested ones, or everything recorded
fn targets(session: &Session, args: &DestroyArgs) -> Result<Vec<String>> {
    if args.target.tables.is_empty() {
        return Ok(session.state.tables().keys().cloned().collect());
    }
    for name in &args.target.tables {
        if session.state.get(name).is_none() {
            bail!("Table '{name}' is not recorded; nothing to destroy");
        }
    }
    Ok(args.target.tables.clone())
}

/// Destroy each target, then record and save.
pub fn execute(session: &mut Session, args: &DestroyArgs) -> Result<Vec<TableResult>> {
    let names = targets(session, args)?;

    let results: Vec<TableResult> = {
        let reconciler = session.reconciler();
        let rctx = ReconcileContext::default();
        names
            .into_iter()
            .map(|name| {
                let result = reconciler
                    .refresh(&name, &rctx)
                    .and_then(|live| reconciler.reconcile(None, live.as_ref(), &rctx))
                    .map(|outcome| ReconcileOutcome {
                        name: name.clone(),
                        ..outcome
                    });
                TableResult {
                    previous: Some(name.clone()),
                    name,
                    result,
                }
            })
            .collect()
    };

    for result in &results {
        if let Ok(outcome) = &result.result {
            session.state.record(result.previous.as_deref(), outcome);
        }
    }
    session.save()?;
    Ok(results)
}

pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let mut session = Session::open()?;
    let names = targets(&session, args)?;

    ui::header("Destroy");
    if names.is_empty() {
        ui::info("No recorded tables");
        return Ok(());
    }

    for name in &names {
        ui::plan_line(&format!("- Delete table: {name} (ALL DATA WILL BE LOST)"));
    }
    println!();
    if !args.yes && !confirm_proceed()? {
        ui::info("Cancelled");
        return Ok(());
    }

    let results = execute(&mut session, args)?;
    let mut failed = 0;
    for result in &results {
        match &result.result {
            Ok(_) => {
                if !ctx.quiet {
                    ui::success(&format!("{} destroyed", result.name));
                }
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("{} {}", result.name.bold(), e));
            }
        }
    }

    if failed > 0 {
        bail!("{failed} table(s) failed");
    }
    Ok(())
}
