//! Config file location.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// File name of the config inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the user config root.
const APP_DIR_NAME: &str = "moviedeck";

/// Resolves the config file path.
///
/// - `--dir` given: `{dir}/config.toml`.
/// - `XDG_CONFIG_HOME` set: `$XDG_CONFIG_HOME/moviedeck/config.toml`.
/// - Otherwise: `~/.config/moviedeck/config.toml`.
///
/// # Errors
///
/// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` is set
/// (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    config_path_with(dir.map(PathBuf::as_path), |var| std::env::var(var).ok())
}

/// Resolution with an injectable environment lookup.
fn config_path_with(
    dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE_NAME));
    }

    let non_empty = |var: &str| env(var).filter(|value| !value.is_empty());
    let root = if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = non_empty("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        bail!("cannot locate config directory: neither XDG_CONFIG_HOME nor HOME is set");
    };

    Ok(root.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
