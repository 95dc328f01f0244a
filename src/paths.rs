//! Where keytable keeps its files.
//!
//! `settings.toml` lives in the config directory; `state.toml` and
//! `account.json` live in the state directory. `KEYTABLE_CONFIG_DIR` and
//! `KEYTABLE_STATE_DIR` move them, otherwise `XDG_CONFIG_HOME` /
//! `XDG_STATE_HOME` are honored before `~/.config` and `~/.local/state`.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "keytable";

/// Overrides the config directory
pub const ENV_CONFIG_DIR: &str = "KEYTABLE_CONFIG_DIR";

/// Overrides the state directory
pub const ENV_STATE_DIR: &str = "KEYTABLE_STATE_DIR";

struct Location {
    kind: &'static str,
    override_var: &'static str,
    xdg_var: &'static str,
    home_relative: &'static [&'static str],
}

const CONFIG: Location = Location {
    kind: "config",
    override_var: ENV_CONFIG_DIR,
    xdg_var: "XDG_CONFIG_HOME",
    home_relative: &[".config"],
};

const STATE: Location = Location {
    kind: "state",
    override_var: ENV_STATE_DIR,
    xdg_var: "XDG_STATE_HOME",
    home_relative: &[".local", "state"],
};

pub fn config_dir() -> Result<PathBuf> {
    resolve(&CONFIG)
}

pub fn state_dir() -> Result<PathBuf> {
    resolve(&STATE)
}

fn resolve(location: &Location) -> Result<PathBuf> {
    let path = if let Ok(dir) = env::var(location.override_var) {
        expand(&dir)
    } else if let Ok(base) = env::var(location.xdg_var) {
        PathBuf::from(base).join(APP_DIR)
    } else {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        location
            .home_relative
            .iter()
            .fold(home, |path, part| path.join(part))
            .join(APP_DIR)
    };
    log::debug!("Using {} dir: {}", location.kind, path.display());
    Ok(path)
}

/// Expand `~` and `$VARS`; unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
