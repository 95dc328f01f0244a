//! Change planning
//!
//! Pure functions that decide what a reconciliation must do. Nothing here
//! talks to a provider, so every decision is testable in isolation.

use crate::diff::{TableDiff, compute_diff};
use crate::provider::TableChanges;
use crate::types::TableState;
use tablespec::TableSpec;

/// What a reconciliation will do for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePlan {
    /// Observed already matches desired
    NoChange {
        /// Table name
        name: String,
    },
    /// Neither side has a table
    AlreadyAbsent,
    /// Nothing observed, create from scratch
    Create {
        /// Configuration to create
        spec: TableSpec,
    },
    /// Only mutable fields differ
    Update {
        /// Table name
        name: String,
        /// Fields to send
        changes: TableChanges,
        /// Full field diff (observed → desired)
        diff: TableDiff,
    },
    /// An immutable field differs, destroy then create
    Replace {
        /// Table to destroy
        old_name: String,
        /// Configuration to create
        spec: TableSpec,
        /// Full field diff (observed → desired)
        diff: TableDiff,
    },
    /// Desired removed, destroy what is observed
    Destroy {
        /// Table name
        name: String,
    },
}

impl ChangePlan {
    /// Name the plan acts on; the new name for a replacement
    pub fn name(&self) -> &str {
        match self {
            ChangePlan::NoChange { name }
            | ChangePlan::Update { name, .. }
            | ChangePlan::Destroy { name } => name,
            ChangePlan::Create { spec } | ChangePlan::Replace { spec, .. } => &spec.name,
            ChangePlan::AlreadyAbsent => "",
        }
    }

    /// Whether the plan issues any mutating call
    pub fn is_change(&self) -> bool {
        !matches!(self, ChangePlan::NoChange { .. } | ChangePlan::AlreadyAbsent)
    }
}

/// Decide what to do to move `observed` toward `desired`.
///
/// `desired = None` means the resource was removed from the desired state.
pub fn plan(desired: Option<&TableSpec>, observed: Option<&TableState>) -> ChangePlan {
    match (desired, observed) {
        (None, None) => ChangePlan::AlreadyAbsent,
        (Some(spec), None) => ChangePlan::Create { spec: spec.clone() },
        (None, Some(state)) => ChangePlan::Destroy {
            name: state.name().to_string(),
        },
        (Some(spec), Some(state)) => {
            let diff = compute_diff(spec, &state.spec);
            if diff.is_empty() {
                ChangePlan::NoChange {
                    name: spec.name.clone(),
                }
            } else if diff.requires_replacement() {
                ChangePlan::Replace {
                    old_name: state.name().to_string(),
                    spec: spec.clone(),
                    diff,
                }
            } else {
                ChangePlan::Update {
                    name: spec.name.clone(),
                    changes: TableChanges::between(spec, &state.spec),
                    diff,
                }
            }
        }
    }
}

/// Render a plan as display lines
pub fn format_plan(plan: &ChangePlan) -> Vec<String> {
    match plan {
        ChangePlan::NoChange { name } => vec![format!("= Table '{name}' is up to date")],
        ChangePlan::AlreadyAbsent => vec!["= Nothing declared and nothing deployed".to_string()],
        ChangePlan::Create { spec } => {
            let mut lines = vec![format!("+ Create table: {}", spec.name)];
            if let Some(key) = spec.partition_key() {
                lines.push(format!("  Partition key: {key}"));
            }
            if let Some(key) = spec.sort_key() {
                lines.push(format!("  Sort key: {key}"));
            }
            lines.push(format!("  Billing: {}", spec.billing_mode));
            if spec.read_capacity > 0 || spec.write_capacity > 0 {
                lines.push(format!(
                    "  Capacity: {} read / {} write",
                    spec.read_capacity, spec.write_capacity
                ));
            }
            lines
        }
        ChangePlan::Update { name, diff, .. } => {
            let mut lines = vec![format!("~ Update table: {name}")];
            lines.extend(diff_lines(diff));
            lines
        }
        ChangePlan::Replace {
            old_name,
            spec,
            diff,
        } => {
            let mut lines = vec![
                format!("- Delete table: {old_name} (ALL DATA WILL BE LOST)"),
                format!("+ Create table: {} (replacement)", spec.name),
            ];
            lines.extend(diff_lines(diff));
            lines
        }
        ChangePlan::Destroy { name } => {
            vec![format!("- Delete table: {name} (ALL DATA WILL BE LOST)")]
        }
    }
}

fn diff_lines(diff: &TableDiff) -> impl Iterator<Item = String> + '_ {
    diff.changes.iter().map(|change| {
        let marker = if change.is_immutable() {
            " (forces replacement)"
        } else {
            ""
        };
        format!(
            "  ~ {}: {} -> {}{}",
            change.field, change.from, change.to, marker
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Field;
    use crate::types::LifecycleState;
    use tablespec::{AttributeDefinition, AttributeType};

    fn users() -> TableSpec {
        TableSpec::on_demand("users", AttributeDefinition::new("username", AttributeType::S))
    }

    fn active(spec: &TableSpec) -> TableState {
        TableState::from_spec(spec, LifecycleState::Active, "t-1")
    }

    #[test]
    fn test_plan_create_when_absent() {
        let plan = plan(Some(&users()), None);
        assert_eq!(plan, ChangePlan::Create { spec: users() });
        assert!(plan.is_change());
    }

    #[test]
    fn test_plan_no_change_when_identical() {
        let plan = plan(Some(&users()), Some(&active(&users())));
        assert_eq!(
            plan,
            ChangePlan::NoChange {
                name: "users".into()
            }
        );
        assert!(!plan.is_change());
    }

    #[test]
    fn test_plan_replace_on_name_change() {
        let mut desired = users();
        desired.name = "members".into();

        match plan(Some(&desired), Some(&active(&users()))) {
            ChangePlan::Replace {
                old_name, spec, diff,
            } => {
                assert_eq!(old_name, "users");
                assert_eq!(spec.name, "members");
                assert_eq!(diff.fields(), vec![Field::Name]);
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_update_carries_only_changed_fields() {
        let key = AttributeDefinition::new("id", AttributeType::N);
        let observed = active(&TableSpec::provisioned("orders", key.clone(), 5, 5));
        let desired = TableSpec::provisioned("orders", key, 5, 10);

        match plan(Some(&desired), Some(&observed)) {
            ChangePlan::Update { name, changes, .. } => {
                assert_eq!(name, "orders");
                assert_eq!(changes.write_capacity, Some(10));
                assert_eq!(changes.read_capacity, None);
                assert_eq!(changes.billing_mode, None);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_destroy_and_absent() {
        assert_eq!(
            plan(None, Some(&active(&users()))),
            ChangePlan::Destroy {
                name: "users".into()
            }
        );
        assert_eq!(plan(None, None), ChangePlan::AlreadyAbsent);
        assert_eq!(ChangePlan::AlreadyAbsent.name(), "");
    }

    #[test]
    fn test_format_create_plan() {
        let lines = format_plan(&ChangePlan::Create { spec: users() });
        assert_eq!(lines[0], "+ Create table: users");
        assert_eq!(lines[1], "  Partition key: username (S)");
        assert_eq!(lines[2], "  Billing: PAY_PER_REQUEST");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_format_create_plan_with_sort_key() {
        let spec = users().with_sort_key(AttributeDefinition::new("joined_at", AttributeType::N));
        let lines = format_plan(&ChangePlan::Create { spec });
        assert_eq!(lines[1], "  Partition key: username (S)");
        assert_eq!(lines[2], "  Sort key: joined_at (N)");
    }

    #[test]
    fn test_format_replace_marks_immutable_field() {
        let mut desired = users();
        desired.name = "members".into();
        let plan = plan(Some(&desired), Some(&active(&users())));

        let lines = format_plan(&plan);
        assert!(lines[0].starts_with("- Delete table: users"));
        assert_eq!(lines[1], "+ Create table: members (replacement)");
        assert_eq!(lines[2], "  ~ name: users -> members (forces replacement)");
    }

    #[test]
    fn test_format_no_change() {
        let lines = format_plan(&ChangePlan::NoChange {
            name: "users".into(),
        });
        assert_eq!(lines, vec!["= Table 'users' is up to date"]);
    }
}
