//! `keytable apply`: converge every selected table, in parallel across names.

use super::plan::{self as planning, print_drift};
use super::{Session, pair, select};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::desired;
use crate::progress::{self, SpinnerProgress};
use crate::ui;
use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use lifecycle::{
    NoProgress, ProgressCallback, ReconcileAction, ReconcileContext, ReconcileError,
    ReconcileOutcome, format_plan,
};
use rayon::prelude::*;

/// Result for one table
#[derive(Debug)]
pub struct TableResult {
    pub name: String,
    /// Recorded entry the cycle started from
    pub previous: Option<String>,
    pub result: std::result::Result<ReconcileOutcome, ReconcileError>,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub results: Vec<TableResult>,
}

impl ApplyReport {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_err()).count()
    }

    pub fn count(&self, action: ReconcileAction) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(&r.result, Ok(o) if o.action == action))
            .count()
    }

    pub fn outcome(&self, name: &str) -> Option<&ReconcileOutcome> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.result.as_ref().ok())
    }
}

/// Reconcile without progress output
pub fn execute(session: &mut Session, ctx: &Context, args: &ApplyArgs) -> Result<ApplyReport> {
    execute_with(session, ctx, args, &NoProgress)
}

/// Run one cycle per selected table, then record outcomes and save.
///
/// Failed tables keep their recorded state.
pub fn execute_with(
    session: &mut Session,
    ctx: &Context,
    args: &ApplyArgs,
    progress: &dyn ProgressCallback,
) -> Result<ApplyReport> {
    let tables = desired::load(&ctx.file)?;
    let pairings = select(pair(&tables, &session.state)?, &args.target.tables)?;
    let jobs = args.jobs.unwrap_or(session.settings.jobs).max(1);
    log::info!("Reconciling {} table(s) with {jobs} job(s)", pairings.len());

    let results: Vec<TableResult> = {
        let reconciler = session.reconciler();
        let rctx = ReconcileContext::new(progress);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("Failed to create apply thread pool")?;

        pool.install(|| {
            pairings
                .par_iter()
                .map(|pairing| TableResult {
                    name: pairing.name().to_string(),
                    previous: pairing.recorded_name().map(str::to_string),
                    result: reconciler.run_cycle(
                        pairing.desired.map(|d| &d.spec),
                        pairing.recorded.as_ref(),
                        &rctx,
                    ),
                })
                .collect()
        })
    };

    for result in &results {
        match &result.result {
            Ok(outcome) => session.state.record(result.previous.as_deref(), outcome),
            Err(e) => match e.deleted_table() {
                Some(deleted) => {
                    log::warn!("Table '{deleted}' was deleted before '{}' failed: {e}", result.name);
                    session.state.forget(deleted);
                }
                None => {
                    log::warn!("Leaving recorded state of '{}' unchanged: {e}", result.name);
                }
            },
        }
    }
    session.save()?;

    Ok(ApplyReport { results })
}

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let mut session = Session::open()?;

    let preview = planning::compute(&session, ctx, &args.target)?;
    let pending = preview
        .iter()
        .filter(|e| e.plan.is_change() || e.drift.is_some())
        .count();

    ui::header("Apply");
    if preview.is_empty() {
        ui::info("No tables declared or recorded");
        return Ok(());
    }

    if pending > 0 {
        for entry in &preview {
            if let Some(drift) = &entry.drift {
                print_drift(&entry.name, drift);
            }
            for line in format_plan(&entry.plan) {
                ui::plan_line(&line);
            }
        }
        println!();
        if !args.yes && !confirm_proceed()? {
            ui::info("Cancelled");
            return Ok(());
        }
    }

    let spinner = progress::spinner("Reconciling tables...", ctx.quiet);
    let reporter = SpinnerProgress::new(spinner);
    let report = execute_with(&mut session, ctx, args, &reporter);
    reporter.bar().finish_and_clear();
    let report = report?;

    print_report(&report);

    let failed = report.failed();
    if failed > 0 {
        bail!("{failed} table(s) failed");
    }
    Ok(())
}

fn print_report(report: &ApplyReport) {
    println!();
    for result in &report.results {
        match &result.result {
            Ok(outcome) => {
                println!(
                    "  {} {} {}",
                    ui::action_symbol(outcome.action),
                    result.name.bold(),
                    ui::action_verb(outcome.action).dimmed()
                );
                if let Some(drift) = &outcome.drift {
                    print_drift(&result.name, drift);
                }
            }
            Err(e) => println!("  {} {} {}", "✗".red(), result.name.bold(), e),
        }
    }

    println!();
    let changed = [
        ReconcileAction::Created,
        ReconcileAction::Updated,
        ReconcileAction::Replaced,
        ReconcileAction::Destroyed,
    ]
    .iter()
    .map(|a| report.count(*a))
    .sum::<usize>();
    let drifted = report.count(ReconcileAction::DriftDetected);

    if report.failed() == 0 {
        ui::success(&format!("{changed} table(s) changed"));
    } else {
        ui::warn(&format!(
            "{changed} table(s) changed, {} failed",
            report.failed()
        ));
    }
    if drifted > 0 {
        ui::warn(&format!(
            "{drifted} table(s) drifted; live state recorded, run apply again to correct"
        ));
    }
}

/// Confirm with user
pub(crate) fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{Fixture, USERS, USERS_AND_ORDERS};
    use crate::cli::TargetArgs;
    use lifecycle::{LifecycleState, Provider};

    fn ctx(fixture: &Fixture, content: &str) -> Context {
        Context {
            verbose: 0,
            quiet: true,
            file: fixture.desired(content),
        }
    }

    #[test]
    fn test_apply_creates_and_records() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        let report = execute(
            &mut session,
            &ctx(&fixture, USERS_AND_ORDERS),
            &ApplyArgs::default(),
        )
        .unwrap();

        assert_eq!(report.count(ReconcileAction::Created), 2);
        assert_eq!(report.failed(), 0);
        let users = report.outcome("users").unwrap();
        assert_eq!(
            users.transitions,
            vec![
                LifecycleState::Absent,
                LifecycleState::Creating,
                LifecycleState::Active
            ]
        );

        let reopened = fixture.session();
        assert!(reopened.state.get("users").is_some());
        assert!(reopened.provider.describe_table("orders").is_ok());
    }

    #[test]
    fn test_second_apply_changes_nothing() {
        let fixture = Fixture::new();
        let ctx = ctx(&fixture, USERS_AND_ORDERS);
        execute(&mut fixture.session(), &ctx, &ApplyArgs::default()).unwrap();

        let report = execute(&mut fixture.session(), &ctx, &ApplyArgs::default()).unwrap();
        assert_eq!(report.count(ReconcileAction::NoChange), 2);
    }

    #[test]
    fn test_removed_declaration_is_destroyed() {
        let fixture = Fixture::new();
        execute(
            &mut fixture.session(),
            &ctx(&fixture, USERS_AND_ORDERS),
            &ApplyArgs::default(),
        )
        .unwrap();

        let mut session = fixture.session();
        let report = execute(&mut session, &ctx(&fixture, USERS), &ApplyArgs::default()).unwrap();
        assert_eq!(report.count(ReconcileAction::Destroyed), 1);
        assert!(session.state.get("orders").is_none());
        assert!(session.provider.describe_table("orders").is_err());
    }

    #[test]
    fn test_replaces_renames_table() {
        let fixture = Fixture::new();
        execute(
            &mut fixture.session(),
            &ctx(&fixture, USERS),
            &ApplyArgs::default(),
        )
        .unwrap();

        let renamed = r#"
[[table]]
name = "members"
replaces = "users"
billing_mode = "PAY_PER_REQUEST"
attributes = [{ name = "username", type = "S" }]
"#;
        let mut session = fixture.session();
        let report = execute(&mut session, &ctx(&fixture, renamed), &ApplyArgs::default()).unwrap();

        let outcome = report.outcome("members").unwrap();
        assert_eq!(outcome.action, ReconcileAction::Replaced);
        assert!(session.state.get("users").is_none());
        assert!(session.state.get("members").is_some());
        assert_eq!(session.provider.list_tables().unwrap(), vec!["members"]);
    }

    #[test]
    fn test_failed_rename_forgets_deleted_table() {
        let fixture = Fixture::new();
        execute(
            &mut fixture.session(),
            &ctx(&fixture, USERS),
            &ApplyArgs::default(),
        )
        .unwrap();

        let renamed = ctx(
            &fixture,
            r#"
[[table]]
name = "members"
replaces = "users"
billing_mode = "PAY_PER_REQUEST"
attributes = [{ name = "username", type = "S" }]
"#,
        );
        let mut session = fixture.session();
        session.provider.fail_next(
            lifecycle::Operation::Create,
            lifecycle::ProviderError::QuotaExceeded {
                message: "table limit reached".into(),
            },
        );
        let report = execute(&mut session, &renamed, &ApplyArgs::default()).unwrap();
        assert_eq!(report.failed(), 1);
        assert!(session.state.get("users").is_none());
        assert!(session.provider.list_tables().unwrap().is_empty());

        let mut session = fixture.session();
        let report = execute(&mut session, &renamed, &ApplyArgs::default()).unwrap();
        assert_eq!(report.count(ReconcileAction::DriftDetected), 0);
        assert_eq!(
            report.outcome("members").unwrap().action,
            ReconcileAction::Created
        );
        assert!(session.state.get("members").is_some());
    }

    #[test]
    fn test_drift_recorded_then_corrected() {
        let fixture = Fixture::new();
        let ctx = ctx(&fixture, USERS_AND_ORDERS);
        execute(&mut fixture.session(), &ctx, &ApplyArgs::default()).unwrap();

        let session = fixture.session();
        session
            .provider
            .update_table(
                "orders",
                &lifecycle::TableChanges {
                    read_capacity: Some(40),
                    ..Default::default()
                },
            )
            .unwrap();
        session.provider.save().unwrap();

        let mut session = fixture.session();
        let report = execute(&mut session, &ctx, &ApplyArgs::default()).unwrap();
        assert_eq!(report.count(ReconcileAction::DriftDetected), 1);
        assert_eq!(
            session.state.get("orders").unwrap().status,
            LifecycleState::Drifted
        );
        assert_eq!(session.provider.describe_table("orders").unwrap().spec.read_capacity, 40);

        let mut session = fixture.session();
        let report = execute(&mut session, &ctx, &ApplyArgs::default()).unwrap();
        assert_eq!(report.outcome("orders").unwrap().action, ReconcileAction::Updated);
        assert_eq!(session.provider.describe_table("orders").unwrap().spec.read_capacity, 5);
        assert_eq!(
            session.state.get("orders").unwrap().status,
            LifecycleState::Active
        );
    }

    #[test]
    fn test_invalid_file_makes_no_calls() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        let bad = ctx(
            &fixture,
            r#"
[[table]]
name = "users"
billing_mode = "PAY_PER_REQUEST"
write_capacity = 5
attributes = [{ name = "username", type = "S" }]
"#,
        );

        assert!(execute(&mut session, &bad, &ApplyArgs::default()).is_err());
        assert!(session.provider.list_tables().unwrap().is_empty());
        assert!(session.state.tables().is_empty());
    }

    #[test]
    fn test_target_limits_apply() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        let args = ApplyArgs {
            target: TargetArgs {
                tables: vec!["orders".into()],
            },
            ..Default::default()
        };
        let report = execute(&mut session, &ctx(&fixture, USERS_AND_ORDERS), &args).unwrap();

        assert_eq!(report.results.len(), 1);
        assert!(session.state.get("users").is_none());
        assert!(session.state.get("orders").is_some());
    }

    #[test]
    fn test_adopts_preexisting_table() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let spec = tablespec::TableSpec::on_demand(
            "users",
            tablespec::AttributeDefinition::new("username", tablespec::AttributeType::S),
        );
        session.provider.create_table(&spec).unwrap();
        session.provider.save().unwrap();

        let mut session = fixture.session();
        let report = execute(&mut session, &ctx(&fixture, USERS), &ApplyArgs::default()).unwrap();
        assert_eq!(report.outcome("users").unwrap().action, ReconcileAction::NoChange);
        assert!(session.state.get("users").is_some());
    }

    #[test]
    fn test_single_job_still_applies_all() {
        let fixture = Fixture::new();
        let mut session = fixture.session();
        let args = ApplyArgs {
            jobs: Some(1),
            ..Default::default()
        };
        let report = execute(&mut session, &ctx(&fixture, USERS_AND_ORDERS), &args).unwrap();
        assert_eq!(report.count(ReconcileAction::Created), 2);
    }
}
