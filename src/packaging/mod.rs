//! Package backends
//!
//! A [`Backend`] knows how one package manager names packages and spells
//! its install/remove commands. A [`Packager`] wraps a backend with the
//! generic install/remove flow and a table of named special cases that
//! may take over the whole operation for one package.
//!
//! Removal reports a typed [`RemoveOutcome`]: "already absent" is a value,
//! not an error, so callers can re-run uninstalls over partially removed
//! state without swallowing real failures.

pub mod apt;
pub mod list;
pub mod pip;
pub mod yum;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::distro::{Distro, PackagerKind};
use crate::error::{self, Result, StackError};
use crate::shell::{ExecRequest, Executor};

pub use list::load_package_files;

fn default_removable() -> bool {
    true
}

/// A single OS or language package to install or remove
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,

    /// Absent means any/latest available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Backend-native install options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,

    /// Packages shared with the rest of the system are kept on uninstall
    #[serde(default = "default_removable")]
    pub removable: bool,

    /// Backend-specific fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            options: None,
            removable: true,
            extra: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[allow(dead_code)]
    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Mark the package as never removed
    pub fn keep(mut self) -> Self {
        self.removable = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(error::package_invalid("package name must not be empty"));
        }
        if self.version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(error::package_invalid(format!(
                "package '{}' has an empty version",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} ({version})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Whether a special case took over an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

/// Result of a removal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The package manager removed the package
    Removed,
    /// The package manager reported it was not installed
    AlreadyAbsent,
    /// The descriptor is not removable, nothing was attempted
    Kept,
}

impl RemoveOutcome {
    /// Whether removal was actually attempted
    pub fn attempted(self) -> bool {
        !matches!(self, RemoveOutcome::Kept)
    }
}

/// Command construction for one package manager
pub trait Backend: Send + Sync {
    /// Short backend name used in logs and errors
    fn name(&self) -> &'static str;

    /// Backend-native identifier for a name and optional version
    fn format_name(&self, name: &str, version: Option<&str>) -> String;

    fn install_argv(&self, pkg: &PackageInfo) -> Vec<String>;

    fn remove_argv(&self, pkg: &PackageInfo) -> Vec<String>;

    /// Whether a failed removal's output says the package was not installed
    fn is_absent(&self, output: &str) -> bool;

    /// Identifier passed to the remove command
    fn remove_name(&self, pkg: &PackageInfo) -> String {
        self.format_name(&pkg.name, pkg.version.as_deref())
    }
}

/// Handler that may take over installing or removing one named package
pub type SpecialCase = fn(&Packager, &PackageInfo) -> Result<Handled>;

/// Per-package overrides checked before the generic path
#[derive(Default, Clone)]
pub struct SpecialCases {
    install: HashMap<String, SpecialCase>,
    remove: HashMap<String, SpecialCase>,
}

impl SpecialCases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_install(mut self, name: &str, handler: SpecialCase) -> Self {
        self.install.insert(name.to_string(), handler);
        self
    }

    pub fn on_remove(mut self, name: &str, handler: SpecialCase) -> Self {
        self.remove.insert(name.to_string(), handler);
        self
    }
}

/// A backend plus the generic install/remove flow
pub struct Packager {
    backend: Box<dyn Backend>,
    special: SpecialCases,
    shell: Arc<dyn Executor>,
}

impl Packager {
    pub fn new(backend: Box<dyn Backend>, shell: Arc<dyn Executor>) -> Self {
        Self {
            backend,
            special: SpecialCases::default(),
            shell,
        }
    }

    pub fn with_special_cases(mut self, special: SpecialCases) -> Self {
        self.special = special;
        self
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn shell(&self) -> &dyn Executor {
        self.shell.as_ref()
    }

    /// Install one package
    pub fn install(&self, pkg: &PackageInfo) -> Result<()> {
        pkg.validate()?;
        if let Some(handler) = self.special.install.get(&pkg.name) {
            if handler(self, pkg)? == Handled::Yes {
                tracing::debug!(package = %pkg.name, "install handled by special case");
                return Ok(());
            }
        }
        self.install_generic(pkg)
    }

    /// Install one package through the backend's generic command
    pub fn install_generic(&self, pkg: &PackageInfo) -> Result<()> {
        let id = self
            .backend
            .format_name(&pkg.name, pkg.version.as_deref());
        tracing::info!(backend = self.backend.name(), package = %id, "installing");
        let request = ExecRequest::new(self.backend.install_argv(pkg)).as_root();
        self.shell
            .execute(&request)
            .map(|_| ())
            .map_err(|e| self.operation_error(&id, e))
    }

    /// Remove one package unless it is marked as kept
    pub fn remove(&self, pkg: &PackageInfo) -> Result<RemoveOutcome> {
        pkg.validate()?;
        if !pkg.removable {
            tracing::debug!(package = %pkg.name, "package is not removable, keeping it");
            return Ok(RemoveOutcome::Kept);
        }
        if let Some(handler) = self.special.remove.get(&pkg.name) {
            if handler(self, pkg)? == Handled::Yes {
                tracing::debug!(package = %pkg.name, "removal handled by special case");
                return Ok(RemoveOutcome::Removed);
            }
        }
        self.remove_generic(pkg)
    }

    /// Remove one package through the backend's generic command
    pub fn remove_generic(&self, pkg: &PackageInfo) -> Result<RemoveOutcome> {
        let id = self.backend.remove_name(pkg);
        tracing::info!(backend = self.backend.name(), package = %id, "removing");
        let request = ExecRequest::new(self.backend.remove_argv(pkg)).as_root();
        match self.shell.execute(&request) {
            Ok(_) => Ok(RemoveOutcome::Removed),
            Err(StackError::ProcessExecution {
                ref stdout,
                ref stderr,
                ..
            }) if self.backend.is_absent(stderr) || self.backend.is_absent(stdout) =>
            {
                tracing::debug!(package = %id, "package already absent");
                Ok(RemoveOutcome::AlreadyAbsent)
            }
            Err(e) => Err(self.operation_error(&id, e)),
        }
    }

    fn operation_error(&self, id: &str, err: StackError) -> StackError {
        match err {
            StackError::ProcessExecution { code, stderr, .. } => {
                error::package_operation_failed(self.backend.name(), id, code, stderr)
            }
            other => other,
        }
    }
}

/// Whether `output` contains any of `markers`, ignoring ASCII case
pub(crate) fn mentions_any(output: &str, markers: &[&str]) -> bool {
    let output = output.to_ascii_lowercase();
    markers
        .iter()
        .any(|marker| output.contains(&marker.to_ascii_lowercase()))
}

/// Packager for the distribution's OS package manager
pub fn os_packager(distro: &Distro, shell: Arc<dyn Executor>) -> Result<Packager> {
    match distro.packager {
        PackagerKind::Yum => {
            let backend = yum::YumBackend::new(distro.get_command("yum")?);
            let special = if distro.name.starts_with("rhel") {
                yum::rhel_special_cases()
            } else {
                SpecialCases::new()
            };
            Ok(Packager::new(Box::new(backend), shell).with_special_cases(special))
        }
        PackagerKind::Apt => {
            let backend = apt::AptBackend::new(distro.get_command("apt")?);
            Ok(Packager::new(Box::new(backend), shell))
        }
    }
}

/// Packager for python packages
pub fn pip_packager(distro: &Distro, shell: Arc<dyn Executor>) -> Result<Packager> {
    let backend = pip::PipBackend::new(distro.get_command("pip")?);
    Ok(Packager::new(Box::new(backend), shell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::RecordingShell;

    fn yum(shell: Arc<RecordingShell>) -> Packager {
        Packager::new(Box::new(yum::YumBackend::new("yum")), shell)
    }

    #[test]
    fn test_empty_name_rejected() {
        let shell = Arc::new(RecordingShell::new());
        let err = yum(shell.clone()).install(&PackageInfo::new("")).unwrap_err();
        assert!(matches!(err, StackError::PackageInvalid { .. }));
        assert!(shell.commands().is_empty());
    }

    #[test]
    fn test_install_runs_elevated() {
        let shell = Arc::new(RecordingShell::new());
        yum(shell.clone())
            .install(&PackageInfo::new("foo").version("1.2"))
            .unwrap();
        let requests = shell.requests();
        assert_eq!(requests[0].display(), "yum install -y -t foo-1.2");
        assert!(requests[0].run_as_root);
        assert!(requests[0].check_exit_code);
    }

    #[test]
    fn test_install_twice_repeats_the_same_request() {
        let shell = Arc::new(RecordingShell::new());
        let packager = yum(shell.clone());
        let pkg = PackageInfo::new("foo").version("1.2");
        packager.install(&pkg).unwrap();
        packager.install(&pkg).unwrap();
        let requests = shell.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
    }

    #[test]
    fn test_remove_absent_matches_any_case_on_stdout() {
        let shell = Arc::new(RecordingShell::new().fail_on_stdout("erase", 1, "No match for argument: foo"));
        let outcome = yum(shell).remove(&PackageInfo::new("foo")).unwrap();
        assert_eq!(outcome, RemoveOutcome::AlreadyAbsent);

        let shell = Arc::new(RecordingShell::new().fail_on("erase", 1, "no packages marked for removal."));
        let outcome = yum(shell).remove(&PackageInfo::new("foo")).unwrap();
        assert_eq!(outcome, RemoveOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_install_failure_is_package_error() {
        let shell = Arc::new(RecordingShell::new().fail_on("install", 1, "No package foo available."));
        let err = yum(shell).install(&PackageInfo::new("foo").version("1.2")).unwrap_err();
        match err {
            StackError::PackageOperation {
                backend,
                package,
                status,
                ..
            } => {
                assert_eq!(backend, "yum");
                assert_eq!(package, "foo-1.2");
                assert_eq!(status, "exit code 1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_removable_is_never_removed() {
        let shell = Arc::new(RecordingShell::new());
        let outcome = yum(shell.clone())
            .remove(&PackageInfo::new("foo").keep())
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::Kept);
        assert!(!outcome.attempted());
        assert!(shell.commands().is_empty());
    }

    #[test]
    fn test_remove_absent_is_benign() {
        let shell = Arc::new(RecordingShell::new().fail_on("erase", 1, "No Match for argument: foo"));
        let outcome = yum(shell).remove(&PackageInfo::new("foo")).unwrap();
        assert_eq!(outcome, RemoveOutcome::AlreadyAbsent);
        assert!(outcome.attempted());
    }

    #[test]
    fn test_remove_other_failure_propagates() {
        let shell = Arc::new(RecordingShell::new().fail_on("erase", 1, "rpmdb open failed"));
        let err = yum(shell).remove(&PackageInfo::new("foo")).unwrap_err();
        assert!(matches!(err, StackError::PackageOperation { .. }));
    }

    fn handled(_: &Packager, _: &PackageInfo) -> Result<Handled> {
        Ok(Handled::Yes)
    }

    fn not_handled(_: &Packager, _: &PackageInfo) -> Result<Handled> {
        Ok(Handled::No)
    }

    #[test]
    fn test_special_case_short_circuits() {
        let shell = Arc::new(RecordingShell::new());
        let packager = yum(shell.clone()).with_special_cases(
            SpecialCases::new()
                .on_install("built-from-source", handled)
                .on_remove("built-from-source", handled)
                .on_install("plain", not_handled),
        );
        packager.install(&PackageInfo::new("built-from-source")).unwrap();
        assert_eq!(
            packager.remove(&PackageInfo::new("built-from-source")).unwrap(),
            RemoveOutcome::Removed
        );
        assert!(shell.commands().is_empty());

        packager.install(&PackageInfo::new("plain")).unwrap();
        assert_eq!(shell.commands(), vec!["yum install -y -t plain"]);
    }

    #[test]
    fn test_package_yaml_defaults() {
        let pkg: PackageInfo = serde_yaml::from_str("name: foo\nlinks: [a]\n").unwrap();
        assert!(pkg.removable);
        assert_eq!(pkg.version, None);
        assert!(pkg.extra.contains_key("links"));
    }

    #[test]
    fn test_os_packager_for_distro() {
        let shell: Arc<dyn Executor> = Arc::new(RecordingShell::new());
        let fedora = Distro::by_name("fedora-16").unwrap();
        assert_eq!(os_packager(&fedora, shell.clone()).unwrap().backend().name(), "yum");
        let ubuntu = Distro::by_name("ubuntu-oneiric").unwrap();
        assert_eq!(os_packager(&ubuntu, shell.clone()).unwrap().backend().name(), "apt");
        assert_eq!(pip_packager(&fedora, shell).unwrap().backend().name(), "pip");
    }
}
