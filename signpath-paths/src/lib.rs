//! XDG Base Directory paths for signpath.
//!
//! The admin CLI keeps its config and its progress database under XDG
//! paths on every platform, so operators find them in the same place on
//! Linux and macOS.

use std::path::PathBuf;

const APP_DIR: &str = "signpath";

/// Get the signpath config directory.
///
/// Returns `$XDG_CONFIG_HOME/signpath` if set, otherwise `~/.config/signpath`.
///
/// # Examples
///
/// ```
/// use signpath_paths::config_dir;
///
/// let config = config_dir();
/// let catalog = config.join("lessons.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the signpath data directory.
///
/// Returns `$XDG_DATA_HOME/signpath` if set, otherwise `~/.local/share/signpath`.
/// The progress database lives here unless the config points elsewhere.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default location of the progress database.
pub fn default_database_path() -> PathBuf {
    data_dir().join("progress.db")
}

/// Default location of the lesson catalog.
pub fn default_catalog_path() -> PathBuf {
    config_dir().join("lessons.toml")
}

fn xdg_dir(env_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(env_var) {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
