//! Test fixtures shared by unit tests.
//!
//! - [`RecordingShell`]: an [`Executor`] that records every request and
//!   answers with canned results instead of running anything
//! - [`create_git_repo`]: a local repository with one commit on a named branch
//! - [`stack_config`]: a configuration rooted in a temp directory
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_fixtures::{RecordingShell, stack_config};
//!
//! #[test]
//! fn my_test() {
//!     let temp = tempfile::TempDir::new().unwrap();
//!     let config = stack_config(temp.path(), "quantum:\n  q_plugin: openvswitch\n");
//!     let shell = RecordingShell::new().fail_on("erase", 1, "No Match for argument: foo");
//! }
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::StackConfig;
use crate::error::{self, Result};
use crate::shell::{ExecOutput, ExecRequest, Executor};

struct Failure {
    needle: String,
    code: i32,
    stdout: String,
    stderr: String,
}

/// Executor that records requests and fakes their outcome
pub struct RecordingShell {
    requests: Mutex<Vec<ExecRequest>>,
    failures: Vec<Failure>,
    next_pid: AtomicU32,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failures: Vec::new(),
            next_pid: AtomicU32::new(4242),
        }
    }

    /// Make every command whose display string contains `needle` exit with `code`
    pub fn fail_on(mut self, needle: &str, code: i32, stderr: &str) -> Self {
        self.failures.push(Failure {
            needle: needle.to_string(),
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        });
        self
    }

    /// Like [`Self::fail_on`], with the message on stdout instead
    pub fn fail_on_stdout(mut self, needle: &str, code: i32, stdout: &str) -> Self {
        self.failures.push(Failure {
            needle: needle.to_string(),
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
        self
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Display strings of every request seen so far
    pub fn commands(&self) -> Vec<String> {
        self.requests().iter().map(ExecRequest::display).collect()
    }
}

impl Executor for RecordingShell {
    fn execute(&self, request: &ExecRequest) -> Result<ExecOutput> {
        self.requests.lock().unwrap().push(request.clone());
        let display = request.display();
        let Some(failure) = self.failures.iter().find(|f| display.contains(&f.needle)) else {
            return Ok(ExecOutput {
                code: Some(0),
                ..ExecOutput::default()
            });
        };
        if request.check_exit_code {
            return Err(error::execution_failed(
                &request.argv,
                Some(failure.code),
                failure.stdout.clone(),
                failure.stderr.clone(),
            ));
        }
        Ok(ExecOutput {
            code: Some(failure.code),
            stdout: failure.stdout.clone(),
            stderr: failure.stderr.clone(),
        })
    }

    fn spawn_detached(&self, request: &ExecRequest, stdout: &Path, stderr: &Path) -> Result<u32> {
        self.requests.lock().unwrap().push(request.clone());
        std::fs::write(stdout, "")?;
        std::fs::write(stderr, "")?;
        Ok(self.next_pid.fetch_add(1, Ordering::SeqCst))
    }
}

/// Build a stack configuration rooted at `root` with extra YAML sections appended
pub fn stack_config(root: &Path, sections: &str) -> StackConfig {
    let yaml = format!(
        "stack:\n  root: {}\n  templates_dir: {}\n  packages_dir: {}\n{sections}",
        root.join("stack").display(),
        root.join("templates").display(),
        root.join("packages").display(),
    );
    StackConfig::from_yaml(&yaml).expect("test config parses")
}

/// Create a repository at `path` with one commit on `branch` containing `files`
pub fn create_git_repo(path: &Path, branch: &str, files: &[(&str, &str)]) -> git2::Repository {
    let repo = git2::Repository::init(path).expect("Failed to init git repository");
    for (name, contents) in files {
        let file = path.join(name);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, contents).unwrap();
    }

    let oid = {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        index.write_tree().unwrap()
    };
    let tree = repo.find_tree(oid).unwrap();
    let sig = git2::Signature::now("stackup", "stackup@example.org").unwrap();
    let commit = repo
        .commit(None, &sig, &sig, "initial", &tree, &[])
        .unwrap();
    let commit = repo.find_commit(commit).unwrap();
    repo.branch(branch, &commit, true).unwrap();
    repo.set_head(&format!("refs/heads/{branch}")).unwrap();
    drop(tree);
    drop(commit);
    repo
}
