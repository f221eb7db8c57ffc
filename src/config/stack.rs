//! Stack configuration (stack.yaml) data structures

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::utils::make_id;
use crate::error::{self, Result};

/// Default root directory components are installed under
pub const DEFAULT_ROOT: &str = "/opt/stack";

/// Run type used when `default/run_type` is absent
pub const RUN_TYPE_DEFAULT: &str = "fork";

/// The `stack:` block of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Directory every component tree is rooted under
    pub root: PathBuf,

    /// Components in execution order
    pub components: Vec<String>,

    /// Option flags enabled per component (e.g. `network: [no-ovs-db-init]`)
    pub options: BTreeMap<String, Vec<String>>,

    /// Never remove packages on uninstall
    pub keep_packages: bool,

    /// Distro name overriding detection
    pub distro: Option<String>,

    /// Directory holding package list files
    pub packages_dir: Option<PathBuf>,

    /// Directory holding shipped config templates
    pub templates_dir: Option<PathBuf>,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            components: Vec::new(),
            options: BTreeMap::new(),
            keep_packages: false,
            distro: None,
            packages_dir: None,
            templates_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StackFile {
    #[serde(default)]
    stack: StackSettings,

    #[serde(flatten)]
    sections: BTreeMap<String, serde_yaml::Value>,
}

/// Live configuration shared read-only by all components during a run
#[derive(Debug, Clone, Default)]
pub struct StackConfig {
    /// Directory of the file this configuration was loaded from
    base_dir: Option<PathBuf>,

    /// Parsed `stack:` block
    pub settings: StackSettings,

    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl StackConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: StackFile = if yaml.trim().is_empty() {
            StackFile::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        let mut sections = BTreeMap::new();
        for (name, value) in file.sections {
            sections.insert(name.clone(), section_values(&name, value)?);
        }

        Ok(Self {
            base_dir: None,
            settings: file.stack,
            sections,
        })
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(error::config_not_found(path.display().to_string()));
        }
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| error::file_read_failed(path.display().to_string(), e.to_string()))?;
        let mut config = Self::from_yaml(&yaml)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "loaded stack configuration");
        Ok(config)
    }

    /// Value of `option` in `section`, if set
    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        let value = self
            .sections
            .get(section)
            .and_then(|options| options.get(option))
            .map(String::as_str);
        tracing::trace!(id = %make_id(Some(section), Some(option)), ?value, "config lookup");
        value
    }

    /// Value of `option` in `section`, or `default` when absent
    pub fn get_defaulted(&self, section: &str, option: &str, default: &str) -> String {
        self.get(section, option).unwrap_or(default).to_string()
    }

    /// Value of `option` in `section`, failing when absent
    pub fn require(&self, section: &str, option: &str) -> Result<&str> {
        self.get(section, option)
            .ok_or_else(|| error::missing_config_value(make_id(Some(section), Some(option))))
    }

    /// Set a value, used to apply command line overrides before a run
    pub fn set(&mut self, section: &str, option: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value.into());
    }

    /// Upper-cased `default/run_type`
    pub fn run_type(&self) -> String {
        self.get_defaulted("default", "run_type", RUN_TYPE_DEFAULT)
            .to_uppercase()
    }

    /// Directory owned by one component
    pub fn component_dir(&self, component: &str) -> PathBuf {
        self.settings.root.join(component)
    }

    /// Option flags enabled for a component
    pub fn options_for(&self, component: &str) -> BTreeSet<String> {
        self.settings
            .options
            .get(component)
            .map(|flags| flags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Directory holding package list files
    pub fn packages_dir(&self) -> PathBuf {
        self.relative_dir(self.settings.packages_dir.as_deref(), "packages")
    }

    /// Directory holding shipped config templates
    pub fn templates_dir(&self) -> PathBuf {
        self.relative_dir(self.settings.templates_dir.as_deref(), "templates")
    }

    fn relative_dir(&self, configured: Option<&Path>, fallback: &str) -> PathBuf {
        let dir = configured.map_or_else(|| PathBuf::from(fallback), Path::to_path_buf);
        match &self.base_dir {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir,
        }
    }
}

fn section_values(name: &str, value: serde_yaml::Value) -> Result<BTreeMap<String, String>> {
    use serde_yaml::Value;

    let mapping = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(error::stack_config_invalid(format!(
                "section '{name}' must be a mapping of options"
            )));
        }
    };

    let mut options = BTreeMap::new();
    for (key, value) in mapping {
        let Some(key) = scalar_to_string(&key) else {
            return Err(error::stack_config_invalid(format!(
                "section '{name}' has a non-scalar option name"
            )));
        };
        match value {
            Value::Null => {}
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
                return Err(error::stack_config_invalid(format!(
                    "option '{}' must be a scalar",
                    make_id(Some(name), Some(&key))
                )));
            }
            scalar => {
                if let Some(text) = scalar_to_string(&scalar) {
                    options.insert(key, text);
                }
            }
        }
    }
    Ok(options)
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STACK: &str = r"
stack:
  root: /srv/stack
  components: [network-client, network]
  options:
    network: [no-ovs-db-init]
  distro: fedora-16
default:
  run_type: fork
git:
  quantum_repo: https://example.org/quantum.git
  quantum_branch: master
db:
  port: 3306
  enabled: true
empty:
";

    #[test]
    fn test_from_yaml() {
        let config = StackConfig::from_yaml(STACK).unwrap();
        assert_eq!(config.settings.root, PathBuf::from("/srv/stack"));
        assert_eq!(config.settings.components, vec!["network-client", "network"]);
        assert_eq!(config.settings.distro.as_deref(), Some("fedora-16"));
        assert_eq!(
            config.get("git", "quantum_repo"),
            Some("https://example.org/quantum.git")
        );
        assert_eq!(config.get("db", "port"), Some("3306"));
        assert_eq!(config.get("db", "enabled"), Some("true"));
        assert_eq!(config.get("empty", "anything"), None);
    }

    #[test]
    fn test_get_defaulted_and_require() {
        let config = StackConfig::from_yaml(STACK).unwrap();
        assert_eq!(config.get_defaulted("quantum", "q_plugin", "openvswitch"), "openvswitch");
        assert_eq!(config.get_defaulted("git", "quantum_branch", "stable"), "master");
        let err = config.require("git", "nope").unwrap_err();
        assert!(err.to_string().contains("git/nope"));
    }

    #[test]
    fn test_run_type_is_upper_cased() {
        let config = StackConfig::from_yaml(STACK).unwrap();
        assert_eq!(config.run_type(), "FORK");
        assert_eq!(StackConfig::default().run_type(), "FORK");
    }

    #[test]
    fn test_options_for() {
        let config = StackConfig::from_yaml(STACK).unwrap();
        assert!(config.options_for("network").contains("no-ovs-db-init"));
        assert!(config.options_for("network-client").is_empty());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = StackConfig::from_yaml("").unwrap();
        assert_eq!(config.settings.root, PathBuf::from(DEFAULT_ROOT));
        assert!(config.settings.components.is_empty());
    }

    #[test]
    fn test_non_scalar_option_rejected() {
        let err = StackConfig::from_yaml("git:\n  repos: [a, b]\n").unwrap_err();
        assert!(err.to_string().contains("git/repos"));
    }

    #[test]
    fn test_non_mapping_section_rejected() {
        assert!(StackConfig::from_yaml("git: just-a-string\n").is_err());
    }

    #[test]
    fn test_load_resolves_relative_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stack.yaml");
        std::fs::write(&path, "stack:\n  packages_dir: pkgs\n").unwrap();

        let config = StackConfig::load(&path).unwrap();
        assert_eq!(config.packages_dir(), temp.path().join("pkgs"));
        assert_eq!(config.templates_dir(), temp.path().join("templates"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = StackConfig::load(Path::new("/nonexistent/stack.yaml")).unwrap_err();
        assert!(matches!(err, crate::error::StackError::StackConfigNotFound { .. }));
    }

    #[test]
    fn test_set_overrides() {
        let mut config = StackConfig::from_yaml(STACK).unwrap();
        config.set("quantum", "ovs_bridge", "br-test");
        assert_eq!(config.get("quantum", "ovs_bridge"), Some("br-test"));
    }
}
