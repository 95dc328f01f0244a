use colored::{ColoredString, Colorize};
use lifecycle::{LifecycleState, ReconcileAction};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a plan line, colored by its leading marker
pub fn plan_line(line: &str) {
    println!("  {}", color_plan_line(line));
}

fn color_plan_line(line: &str) -> ColoredString {
    match line.trim_start().chars().next() {
        Some('+') => line.green(),
        Some('-') => line.red(),
        Some('~') => line.yellow(),
        Some('=') => line.dimmed(),
        _ => line.normal(),
    }
}

/// Colored lifecycle state label
pub fn state_label(state: LifecycleState) -> ColoredString {
    let label = state.as_str();
    match state {
        LifecycleState::Active => label.green(),
        LifecycleState::Drifted => label.yellow().bold(),
        LifecycleState::Absent => label.dimmed(),
        LifecycleState::Creating | LifecycleState::Updating | LifecycleState::Destroying => {
            label.cyan()
        }
    }
}

/// Symbol summarizing a reconcile action
pub fn action_symbol(action: ReconcileAction) -> &'static str {
    match action {
        ReconcileAction::NoChange => "○",
        ReconcileAction::Created | ReconcileAction::Updated | ReconcileAction::Replaced => "✓",
        ReconcileAction::Destroyed => "−",
        ReconcileAction::DriftDetected => "⚠",
    }
}

/// Past-tense description of a reconcile action
pub fn action_verb(action: ReconcileAction) -> &'static str {
    match action {
        ReconcileAction::NoChange => "up to date",
        ReconcileAction::Created => "created",
        ReconcileAction::Updated => "updated",
        ReconcileAction::Replaced => "replaced",
        ReconcileAction::Destroyed => "destroyed",
        ReconcileAction::DriftDetected => "drift detected",
    }
}
