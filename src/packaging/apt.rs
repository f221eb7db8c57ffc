//! apt backend

use super::{Backend, PackageInfo};

const ABSENT_MARKERS: &[&str] = &["is not installed, so not removed", "Unable to locate package"];

pub struct AptBackend {
    binary: String,
}

impl AptBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Backend for AptBackend {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn format_name(&self, name: &str, version: Option<&str>) -> String {
        match version {
            Some(version) => format!("{name}={version}"),
            None => name.to_string(),
        }
    }

    fn install_argv(&self, pkg: &PackageInfo) -> Vec<String> {
        let mut argv = vec![self.binary.clone(), "install".into(), "-y".into()];
        if let Some(options) = &pkg.options {
            argv.extend(options.split_whitespace().map(String::from));
        }
        argv.push(self.format_name(&pkg.name, pkg.version.as_deref()));
        argv
    }

    fn remove_argv(&self, pkg: &PackageInfo) -> Vec<String> {
        vec![
            self.binary.clone(),
            "purge".into(),
            "-y".into(),
            self.remove_name(pkg),
        ]
    }

    fn is_absent(&self, output: &str) -> bool {
        super::mentions_any(output, ABSENT_MARKERS)
    }

    /// apt purges by name regardless of the installed version
    fn remove_name(&self, pkg: &PackageInfo) -> String {
        pkg.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv() {
        let apt = AptBackend::new("apt-get");
        let pkg = PackageInfo::new("openvswitch-switch").version("1.2.2");
        assert_eq!(
            apt.install_argv(&pkg),
            vec!["apt-get", "install", "-y", "openvswitch-switch=1.2.2"]
        );
        assert_eq!(
            apt.remove_argv(&pkg),
            vec!["apt-get", "purge", "-y", "openvswitch-switch"]
        );
    }

    #[test]
    fn test_absent() {
        let apt = AptBackend::new("apt-get");
        assert!(apt.is_absent("Package 'foo' is not installed, so not removed"));
        assert!(!apt.is_absent("E: Could not get lock"));
    }
}
