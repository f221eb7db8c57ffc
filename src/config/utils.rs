//! Utility functions for configuration lookups

use std::path::PathBuf;

/// Environment variable naming the stack configuration file
pub const CONFIG_ENV: &str = "STACKUP_CONFIG";

/// File name used when no configuration path is given
pub const DEFAULT_CONFIG_NAME: &str = "stack.yaml";

/// Build the `section/option` identifier used in logs and errors
pub fn make_id(section: Option<&str>, option: Option<&str>) -> String {
    [section, option]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve which configuration file to load
///
/// Order: explicit path, then `STACKUP_CONFIG`, then
/// `<config dir>/stackup/stack.yaml`, then `./stack.yaml`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join("stackup").join(DEFAULT_CONFIG_NAME))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME))
}
