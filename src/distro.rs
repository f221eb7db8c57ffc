//! Distribution detection and per-distro command names

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::StackConfig;
use crate::error::{Result, StackError};

/// Which OS package backend a distribution uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagerKind {
    Yum,
    Apt,
}

impl fmt::Display for PackagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackagerKind::Yum => write!(f, "yum"),
            PackagerKind::Apt => write!(f, "apt"),
        }
    }
}

/// A supported target distribution
#[derive(Debug, Clone, PartialEq)]
pub struct Distro {
    pub name: String,
    pub packager: PackagerKind,
    /// `/etc/os-release` IDs this definition matches
    ids: Vec<&'static str>,
    commands: BTreeMap<&'static str, &'static str>,
}

impl Distro {
    /// All built-in distribution definitions
    pub fn known() -> Vec<Distro> {
        let common = [("git", "git"), ("mysql", "mysql"), ("kill", "kill"), ("python", "python")];
        let with = |extra: &[(&'static str, &'static str)]| {
            common
                .iter()
                .chain(extra.iter())
                .copied()
                .collect::<BTreeMap<_, _>>()
        };
        vec![
            Distro {
                name: "rhel-6".to_string(),
                packager: PackagerKind::Yum,
                ids: vec!["rhel", "centos"],
                commands: with(&[("yum", "yum"), ("pip", "pip-python")]),
            },
            Distro {
                name: "fedora-16".to_string(),
                packager: PackagerKind::Yum,
                ids: vec!["fedora"],
                commands: with(&[("yum", "yum"), ("pip", "pip-python")]),
            },
            Distro {
                name: "ubuntu-oneiric".to_string(),
                packager: PackagerKind::Apt,
                ids: vec!["ubuntu", "debian"],
                commands: with(&[("apt", "apt-get"), ("pip", "pip")]),
            },
        ]
    }

    /// Look up a built-in definition by name
    pub fn by_name(name: &str) -> Result<Distro> {
        Self::known()
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| StackError::UnsupportedDistro {
                name: name.to_string(),
            })
    }

    /// Use the configured override, else detect from `/etc/os-release`
    pub fn detect(config: &StackConfig) -> Result<Distro> {
        if let Some(name) = &config.settings.distro {
            return Self::by_name(name);
        }
        Self::detect_from(Path::new("/etc/os-release"))
    }

    fn detect_from(os_release: &Path) -> Result<Distro> {
        let text = std::fs::read_to_string(os_release).unwrap_or_default();
        let id = parse_os_release_id(&text).unwrap_or_else(|| "unknown".to_string());
        tracing::debug!(%id, "detected distribution id");
        Self::known()
            .into_iter()
            .find(|d| d.ids.contains(&id.as_str()))
            .ok_or(StackError::UnsupportedDistro { name: id })
    }

    /// Binary registered for a logical command name (e.g. `pip`)
    pub fn get_command(&self, name: &str) -> Result<&str> {
        self.commands
            .get(name)
            .copied()
            .ok_or_else(|| StackError::UnknownDistroCommand {
                distro: self.name.clone(),
                command: name.to_string(),
            })
    }
}

fn parse_os_release_id(text: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim_matches(['"', '\'']).to_lowercase())
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_by_name() {
        let distro = Distro::by_name("rhel-6").unwrap();
        assert_eq!(distro.packager, PackagerKind::Yum);
        assert_eq!(distro.get_command("pip").unwrap(), "pip-python");
        assert!(Distro::by_name("plan9").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let distro = Distro::by_name("fedora-16").unwrap();
        assert!(matches!(
            distro.get_command("apt"),
            Err(StackError::UnknownDistroCommand { .. })
        ));
    }

    #[test]
    fn test_parse_os_release_id() {
        let text = "NAME=\"CentOS Linux\"\nID=\"centos\"\nID_LIKE=\"rhel fedora\"\n";
        assert_eq!(parse_os_release_id(text).as_deref(), Some("centos"));
        assert_eq!(parse_os_release_id("NAME=x\n"), None);
    }

    #[test]
    fn test_detect_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("os-release");
        std::fs::write(&path, "ID=fedora\nVERSION_ID=16\n").unwrap();
        assert_eq!(Distro::detect_from(&path).unwrap().name, "fedora-16");

        std::fs::write(&path, "ID=arch\n").unwrap();
        assert!(Distro::detect_from(&path).is_err());
    }

    #[test]
    fn test_config_override_wins() {
        let config = StackConfig::from_yaml("stack:\n  distro: ubuntu-oneiric\n").unwrap();
        let distro = Distro::detect(&config).unwrap();
        assert_eq!(distro.packager, PackagerKind::Apt);
    }
}
