//! Progress indicators for the keytable CLI.

use indicatif::{ProgressBar, ProgressStyle};
use lifecycle::{LifecycleState, ProgressCallback, ProviderError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// Spinner with a message, hidden when `quiet`
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars(TICK_CHARS)
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Reports lifecycle transitions and retries on a spinner
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_transition(&self, name: &str, _from: LifecycleState, to: LifecycleState) {
        self.bar.set_message(format!("{name}: {to}"));
    }

    fn on_retry(
        &self,
        name: &str,
        attempt: u32,
        max_attempts: u32,
        error: &ProviderError,
        delay: Duration,
    ) {
        self.bar.println(format!(
            "  {name}: attempt {attempt}/{max_attempts} failed ({error}), retrying in {}ms",
            delay.as_millis()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_updates_message() {
        let progress = SpinnerProgress::new(ProgressBar::hidden());
        progress.on_transition("users", LifecycleState::Absent, LifecycleState::Creating);
        assert_eq!(progress.bar().message(), "users: CREATING");
    }

    #[test]
    fn test_quiet_spinner_is_hidden() {
        assert!(spinner("working", true).is_hidden());
    }
}
