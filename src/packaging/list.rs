//! YAML package list files
//!
//! Each file holds a list of package descriptors:
//!
//! ```yaml
//! - name: openvswitch
//!   removable: false
//! - name: python-eventlet
//!   version: "0.9.16"
//! ```

use std::path::Path;

use super::PackageInfo;
use crate::error::{self, Result};

/// Load and validate the package lists in `files` under `dir`, in order
///
/// A missing file contributes no packages.
pub fn load_package_files(dir: &Path, files: &[&str]) -> Result<Vec<PackageInfo>> {
    let mut packages = Vec::new();
    for file in files {
        let path = dir.join(file);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "package list not found, skipping");
            continue;
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| error::file_read_failed(path.display().to_string(), e.to_string()))?;
        let list: Option<Vec<PackageInfo>> = serde_yaml::from_str(&text).map_err(|e| {
            error::package_invalid(format!("{}: {e}", path.display()))
        })?;
        for pkg in list.unwrap_or_default() {
            pkg.validate()?;
            packages.push(pkg);
        }
    }
    Ok(packages)
}
