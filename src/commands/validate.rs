//! `keytable validate`: schema and invariant checks only, no provider calls.

use crate::Context;
use crate::desired::{self, DesiredError};
use crate::ui;
use anyhow::{Result, bail};
use std::path::Path;

/// Result of validating a file
#[derive(Debug)]
pub struct Report {
    pub valid: Vec<String>,
    pub errors: Vec<DesiredError>,
}

pub fn check(file: &Path) -> Result<Report> {
    let entries = desired::read_entries(file)?;
    Ok(match desired::parse_entries(&entries) {
        Ok(tables) => Report {
            valid: tables.iter().map(|t| t.name().to_string()).collect(),
            errors: Vec::new(),
        },
        Err(errors) => Report {
            valid: Vec::new(),
            errors,
        },
    })
}

pub fn run(ctx: &Context) -> Result<()> {
    let report = check(&ctx.file)?;

    if !ctx.quiet {
        ui::header(&format!("Validate {}", ctx.file.display()));
    }

    if report.errors.is_empty() {
        for name in &report.valid {
            if !ctx.quiet {
                ui::success(name);
            }
        }
        if !ctx.quiet {
            println!();
            ui::info(&format!("{} table(s) valid", report.valid.len()));
        }
        return Ok(());
    }

    for error in &report.errors {
        ui::error(&error.to_string());
    }
    bail!("{} error(s) in {}", report.errors.len(), ctx.file.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{Fixture, USERS_AND_ORDERS};

    #[test]
    fn test_valid_file() {
        let fixture = Fixture::new();
        let report = check(&fixture.desired(USERS_AND_ORDERS)).unwrap();
        assert_eq!(report.valid, vec!["users", "orders"]);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_every_error_is_reported() {
        let fixture = Fixture::new();
        let file = fixture.desired(
            r#"
[[table]]
name = "users"
billing_mode = "PAY_PER_REQUEST"
write_capacity = 5
attributes = [{ name = "username", type = "S" }]

[[table]]
name = "orders"
billing_mode = "PROVISIONED"
read_capacity = 5
write_capacity = 5
attributes = []
"#,
        );

        let report = check(&file).unwrap();
        let messages: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("table[0].write_capacity"));
        assert!(messages[1].contains("table[1].attributes"));
    }

    #[test]
    fn test_composite_key_file() {
        let fixture = Fixture::new();
        let file = fixture.desired(
            r#"
[[table]]
name = "pantry_system"
billing_mode = "PAY_PER_REQUEST"
sort_key = "SK"
attributes = [{ name = "PK", type = "S" }, { name = "SK", type = "S" }]

[[table]]
name = "pantries"
billing_mode = "PAY_PER_REQUEST"
attributes = [{ name = "pantry_id", type = "S" }, { name = "owner", type = "S" }]
"#,
        );

        let report = check(&file).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(
            report.errors[0]
                .to_string()
                .contains("table[1].attributes[1].name")
        );
    }

    #[test]
    fn test_run_fails_on_invalid_file() {
        let fixture = Fixture::new();
        let file = fixture.desired(
            "[[table]]\nname = \"users\"\nbilling_mode = \"FREE\"\nattributes = []\n",
        );
        let ctx = Context {
            verbose: 0,
            quiet: true,
            file,
        };
        assert!(run(&ctx).is_err());
    }
}
