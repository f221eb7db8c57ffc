//! pip backend

use super::{Backend, PackageInfo};

const ABSENT_MARKERS: &[&str] = &["not installed", "Cannot uninstall requirement"];

pub struct PipBackend {
    binary: String,
}

impl PipBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Backend for PipBackend {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn format_name(&self, name: &str, version: Option<&str>) -> String {
        match version {
            Some(version) => format!("{name}=={version}"),
            None => name.to_string(),
        }
    }

    fn install_argv(&self, pkg: &PackageInfo) -> Vec<String> {
        let mut argv = vec![self.binary.clone(), "install".into(), "-q".into()];
        if let Some(options) = &pkg.options {
            argv.extend(options.split_whitespace().map(String::from));
        }
        argv.push(self.format_name(&pkg.name, pkg.version.as_deref()));
        argv
    }

    fn remove_argv(&self, pkg: &PackageInfo) -> Vec<String> {
        vec![
            self.binary.clone(),
            "uninstall".into(),
            "-y".into(),
            "-q".into(),
            self.remove_name(pkg),
        ]
    }

    fn is_absent(&self, output: &str) -> bool {
        super::mentions_any(output, ABSENT_MARKERS)
    }

    /// pip uninstalls by bare name
    fn remove_name(&self, pkg: &PackageInfo) -> String {
        pkg.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::packaging::{Packager, RemoveOutcome};
    use crate::test_fixtures::RecordingShell;

    #[test]
    fn test_format_name() {
        let pip = PipBackend::new("pip");
        assert_eq!(pip.format_name("foo", Some("1.2")), "foo==1.2");
    }

    #[test]
    fn test_install_with_options() {
        let pip = PipBackend::new("pip-python");
        let pkg = PackageInfo::new("eventlet").version("0.9.16").options("--upgrade");
        assert_eq!(
            pip.install_argv(&pkg),
            vec!["pip-python", "install", "-q", "--upgrade", "eventlet==0.9.16"]
        );
    }

    #[test]
    fn test_uninstall_not_installed_is_absent() {
        let shell = Arc::new(
            RecordingShell::new().fail_on("uninstall", 1, "Cannot uninstall requirement foo, not installed"),
        );
        let packager = Packager::new(Box::new(PipBackend::new("pip")), shell.clone());
        let outcome = packager.remove(&PackageInfo::new("foo").version("1.2")).unwrap();
        assert_eq!(outcome, RemoveOutcome::AlreadyAbsent);
        assert_eq!(shell.commands(), vec!["pip uninstall -y -q foo"]);
    }
}
