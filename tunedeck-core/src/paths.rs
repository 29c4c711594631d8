//! Where tunedeck keeps its configuration.

use std::ffi::OsString;
use std::path::PathBuf;

/// Directory name under `~/.config/`
pub const CONFIG_DIR_NAME: &str = "tunedeck";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable that replaces the whole config directory
pub const CONFIG_DIR_ENV: &str = "TUNEDECK_CONFIG_DIR";

/// Resolve the configuration directory.
///
/// `$TUNEDECK_CONFIG_DIR` wins when set and non-empty, otherwise
/// `~/.config/tunedeck/` (relative to the working directory when there is
/// no home directory).
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve_config_dir(std::env::var_os(CONFIG_DIR_ENV), dirs::home_dir())
}

/// `config.toml` inside [`config_dir`]
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn resolve_config_dir(env_override: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_override.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }

    home.unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}
