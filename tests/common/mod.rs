//! Common test utilities for stackup integration tests

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch stack: a config file plus the root components install under
pub struct TestStack {
    /// Temporary directory
    pub temp: TempDir,
    /// Path to the stack configuration file
    pub config: PathBuf,
    /// Root directory components are installed under
    pub root: PathBuf,
}

impl TestStack {
    /// Create a stack whose config file holds `sections` after the `stack:` block
    pub fn new(components: &[&str], sections: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().join("stack");
        let config = temp.path().join("stack.yaml");
        let yaml = format!(
            "stack:\n  root: {}\n  distro: fedora-16\n  components: [{}]\n{sections}",
            root.display(),
            components.join(", ")
        );
        std::fs::write(&config, yaml).expect("Failed to write stack config");
        Self { temp, config, root }
    }

    /// Write a file relative to the config file's directory
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.temp.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    pub fn root_exists(&self) -> bool {
        self.root.exists()
    }

    /// A stackup command pointed at this stack
    pub fn cmd(&self) -> Command {
        let mut cmd = stackup_cmd();
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// The stackup binary with developer overrides cleared
#[allow(deprecated)]
pub fn stackup_cmd() -> Command {
    let mut cmd = Command::cargo_bin("stackup").unwrap();
    cmd.env_remove("STACKUP_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}
