//! yum backend and RHEL-specific package handling

use super::{Backend, Handled, PackageInfo, Packager, SpecialCases};
use crate::error::{self, Result};
use crate::shell::ExecRequest;

/// Markers yum prints when asked to erase something that is not installed
const ABSENT_MARKERS: &[&str] = &["No Match for argument", "No Packages marked for removal"];

pub struct YumBackend {
    binary: String,
}

impl YumBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Backend for YumBackend {
    fn name(&self) -> &'static str {
        "yum"
    }

    fn format_name(&self, name: &str, version: Option<&str>) -> String {
        match version {
            Some(version) => format!("{name}-{version}"),
            None => name.to_string(),
        }
    }

    fn install_argv(&self, pkg: &PackageInfo) -> Vec<String> {
        let mut argv = vec![self.binary.clone(), "install".into(), "-y".into(), "-t".into()];
        if let Some(options) = &pkg.options {
            argv.extend(options.split_whitespace().map(String::from));
        }
        argv.push(self.format_name(&pkg.name, pkg.version.as_deref()));
        argv
    }

    fn remove_argv(&self, pkg: &PackageInfo) -> Vec<String> {
        vec![
            self.binary.clone(),
            "erase".into(),
            "-y".into(),
            "-t".into(),
            self.remove_name(pkg),
        ]
    }

    fn is_absent(&self, output: &str) -> bool {
        super::mentions_any(output, ABSENT_MARKERS)
    }
}

/// Packages whose RHEL builds install into a versioned path
const RELINKED: &[&str] = &["python-webob1.0", "python-routes1.12"];

/// Special cases for RHEL: relink versioned python packages after install
/// and drop the links again before removal
pub fn rhel_special_cases() -> SpecialCases {
    RELINKED.iter().fold(SpecialCases::new(), |cases, name| {
        cases
            .on_install(name, install_and_relink)
            .on_remove(name, unlink_before_remove)
    })
}

/// Install generically, then create the `links` the package declares
///
/// `links` is a list of `{source, target}` maps in the package file.
fn install_and_relink(packager: &Packager, pkg: &PackageInfo) -> Result<Handled> {
    packager.install_generic(pkg)?;
    for (source, target) in declared_links(pkg)? {
        tracing::debug!(package = %pkg.name, %source, %target, "relinking");
        packager
            .shell()
            .execute(&ExecRequest::new(["ln", "-sfn", source.as_str(), target.as_str()]).as_root())?;
    }
    Ok(Handled::Yes)
}

/// Remove the links `install_and_relink` created; the package itself
/// goes through the generic path
fn unlink_before_remove(packager: &Packager, pkg: &PackageInfo) -> Result<Handled> {
    for (_, target) in declared_links(pkg)? {
        tracing::debug!(package = %pkg.name, %target, "unlinking");
        packager
            .shell()
            .execute(&ExecRequest::new(["rm", "-f", target.as_str()]).as_root())?;
    }
    Ok(Handled::No)
}

fn declared_links(pkg: &PackageInfo) -> Result<Vec<(String, String)>> {
    let Some(links) = pkg.extra.get("links") else {
        return Ok(Vec::new());
    };
    let links = links.as_sequence().ok_or_else(|| {
        error::package_invalid(format!("package '{}': links must be a list", pkg.name))
    })?;
    links
        .iter()
        .map(|link| {
            let field = |key: &str| {
                link.get(key)
                    .and_then(serde_yaml::Value::as_str)
                    .map(String::from)
                    .ok_or_else(|| {
                        error::package_invalid(format!(
                            "package '{}': link is missing '{key}'",
                            pkg.name
                        ))
                    })
            };
            Ok((field("source")?, field("target")?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::packaging::RemoveOutcome;
    use crate::test_fixtures::RecordingShell;

    #[test]
    fn test_format_name() {
        let yum = YumBackend::new("yum");
        assert_eq!(yum.format_name("foo", Some("1.2")), "foo-1.2");
        assert_eq!(yum.format_name("foo", None), "foo");
    }

    #[test]
    fn test_install_options_precede_name() {
        let yum = YumBackend::new("yum");
        let argv = yum.install_argv(&PackageInfo::new("foo").options("--nogpgcheck"));
        assert_eq!(argv, vec!["yum", "install", "-y", "-t", "--nogpgcheck", "foo"]);
    }

    #[test]
    fn test_absent_markers() {
        let yum = YumBackend::new("yum");
        assert!(yum.is_absent("No Match for argument: foo\n"));
        assert!(yum.is_absent("No Packages marked for removal"));
        assert!(!yum.is_absent("Error: rpmdb open failed"));
    }

    #[test]
    fn test_rhel_relink() {
        let shell = Arc::new(RecordingShell::new());
        let packager = Packager::new(Box::new(YumBackend::new("yum")), shell.clone())
            .with_special_cases(rhel_special_cases());
        let pkg: PackageInfo = serde_yaml::from_str(
            "name: python-webob1.0\nversion: '1.0.8'\nlinks:\n  - source: /usr/lib/python2.6/site-packages/WebOb-1.0.8-py2.6.egg/webob\n    target: /usr/lib/python2.6/site-packages/webob\n",
        )
        .unwrap();
        packager.install(&pkg).unwrap();
        let commands = shell.commands();
        assert_eq!(commands[0], "yum install -y -t python-webob1.0-1.0.8");
        assert!(commands[1].starts_with("ln -sfn "));
        assert!(commands[1].ends_with("/site-packages/webob"));
    }

    #[test]
    fn test_rhel_unlink_then_generic_remove() {
        let shell = Arc::new(RecordingShell::new());
        let packager = Packager::new(Box::new(YumBackend::new("yum")), shell.clone())
            .with_special_cases(rhel_special_cases());
        let pkg: PackageInfo = serde_yaml::from_str(
            "name: python-routes1.12\nlinks:\n  - source: /usr/lib/routes-1.12/routes\n    target: /usr/lib/routes\n",
        )
        .unwrap();
        assert_eq!(packager.remove(&pkg).unwrap(), RemoveOutcome::Removed);
        assert_eq!(
            shell.commands(),
            vec!["rm -f /usr/lib/routes", "yum erase -y -t python-routes1.12"]
        );
    }

    #[test]
    fn test_rhel_relink_rejects_bad_links() {
        let shell = Arc::new(RecordingShell::new());
        let packager = Packager::new(Box::new(YumBackend::new("yum")), shell)
            .with_special_cases(rhel_special_cases());
        let pkg: PackageInfo =
            serde_yaml::from_str("name: python-routes1.12\nlinks:\n  - source: /a\n").unwrap();
        assert!(packager.install(&pkg).is_err());
    }
}
