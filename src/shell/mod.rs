//! Subprocess execution
//!
//! This module handles:
//! - Running commands, optionally elevated through `sudo`
//! - Feeding stdin and capturing stdout/stderr/exit code
//! - Surfacing non-zero exits as errors when the caller requires success
//! - Detached launches for long-running applications
//! - Dry-run mode, where commands are printed instead of executed

pub mod template;

pub use template::{CommandTemplate, execute_template};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::error::{self, Result};

/// One subprocess invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecRequest {
    pub argv: Vec<String>,
    pub run_as_root: bool,
    pub stdin: Option<String>,
    pub check_exit_code: bool,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl ExecRequest {
    /// A request that fails on non-zero exit
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            check_exit_code: true,
            ..Self::default()
        }
    }

    pub fn as_root(mut self) -> Self {
        self.run_as_root = true;
        self
    }

    #[allow(dead_code)]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Return the output of a failed command instead of an error
    pub fn tolerate_failure(mut self) -> Self {
        self.check_exit_code = false;
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    #[allow(dead_code)]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The command as a single display string
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Captured result of a finished subprocess
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs subprocesses on behalf of components
pub trait Executor: Send + Sync {
    /// Run a command to completion
    fn execute(&self, request: &ExecRequest) -> Result<ExecOutput>;

    /// Start a command without waiting for it, returning its pid
    ///
    /// stdout and stderr are appended to the given files.
    fn spawn_detached(&self, request: &ExecRequest, stdout: &Path, stderr: &Path) -> Result<u32>;

    /// Whether commands are only printed
    fn dry_run(&self) -> bool {
        false
    }
}

/// Executor backed by real processes
#[derive(Debug, Default)]
pub struct SystemShell {
    dry_run: bool,
    is_root: OnceLock<bool>,
}

impl SystemShell {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            is_root: OnceLock::new(),
        }
    }

    fn running_as_root(&self) -> bool {
        *self.is_root.get_or_init(|| {
            Command::new("id")
                .arg("-u")
                .output()
                .map(|out| String::from_utf8_lossy(&out.stdout).trim() == "0")
                .unwrap_or(false)
        })
    }

    /// Full argv, prefixed with `sudo` when elevation is needed
    fn full_argv(&self, request: &ExecRequest) -> Vec<String> {
        let mut argv = Vec::with_capacity(request.argv.len() + 3);
        if request.run_as_root && !self.running_as_root() {
            argv.extend(["sudo", "-n", "-E"].map(String::from));
        }
        argv.extend(request.argv.iter().cloned());
        argv
    }

    fn command(&self, argv: &[String], request: &ExecRequest) -> Result<Command> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| error::spawn_failed(argv, "empty command"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).envs(&request.env);
        if let Some(dir) = &request.cwd {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }
}

impl Executor for SystemShell {
    fn execute(&self, request: &ExecRequest) -> Result<ExecOutput> {
        let argv = self.full_argv(request);
        if self.dry_run {
            println!("[DRY RUN] Would run: {}", argv.join(" "));
            return Ok(ExecOutput {
                code: Some(0),
                ..ExecOutput::default()
            });
        }

        tracing::debug!(command = %argv.join(" "), cwd = ?request.cwd, "running command");
        let mut cmd = self.command(&argv, request)?;
        cmd.stdin(if request.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| error::spawn_failed(&argv, e.to_string()))?;
        if let (Some(input), Some(mut pipe)) = (&request.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .map_err(|e| error::spawn_failed(&argv, format!("writing stdin: {e}")))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| error::spawn_failed(&argv, e.to_string()))?;

        let result = ExecOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::trace!(code = ?result.code, stdout = %result.stdout, stderr = %result.stderr, "command finished");

        if request.check_exit_code && !result.success() {
            return Err(error::execution_failed(
                &argv,
                result.code,
                result.stdout.trim(),
                result.stderr.trim(),
            ));
        }
        Ok(result)
    }

    fn spawn_detached(&self, request: &ExecRequest, stdout: &Path, stderr: &Path) -> Result<u32> {
        let argv = self.full_argv(request);
        if self.dry_run {
            println!("[DRY RUN] Would start: {}", argv.join(" "));
            return Ok(0);
        }

        let open = |path: &Path| {
            File::options()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| error::file_write_failed(path.display().to_string(), e.to_string()))
        };
        let mut cmd = self.command(&argv, request)?;
        cmd.stdin(Stdio::null())
            .stdout(open(stdout)?)
            .stderr(open(stderr)?);

        let child = cmd
            .spawn()
            .map_err(|e| error::spawn_failed(&argv, e.to_string()))?;
        tracing::info!(command = %argv.join(" "), pid = child.id(), "started");
        Ok(child.id())
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_execute_captures_output() {
        let shell = SystemShell::new(false);
        let out = shell
            .execute(&ExecRequest::new(["sh", "-c", "echo out; echo err >&2"]))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[test]
    fn test_execute_feeds_stdin() {
        let shell = SystemShell::new(false);
        let out = shell
            .execute(&ExecRequest::new(["cat"]).stdin("hello\nworld"))
            .unwrap();
        assert_eq!(out.stdout, "hello\nworld");
    }

    #[test]
    fn test_non_zero_exit_is_error_when_checked() {
        let shell = SystemShell::new(false);
        let err = shell
            .execute(&ExecRequest::new(["sh", "-c", "echo bad >&2; exit 3"]))
            .unwrap_err();
        match err {
            crate::error::StackError::ProcessExecution { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_zero_exit_tolerated() {
        let shell = SystemShell::new(false);
        let out = shell
            .execute(&ExecRequest::new(["sh", "-c", "exit 4"]).tolerate_failure())
            .unwrap();
        assert_eq!(out.code, Some(4));
    }

    #[test]
    fn test_cwd_and_env() {
        let temp = TempDir::new().unwrap();
        let shell = SystemShell::new(false);
        let out = shell
            .execute(
                &ExecRequest::new(["sh", "-c", "pwd; echo $STACKUP_TEST"])
                    .cwd(temp.path())
                    .env("STACKUP_TEST", "yes"),
            )
            .unwrap();
        assert!(out.stdout.contains("yes"));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let shell = SystemShell::new(false);
        let err = shell
            .execute(&ExecRequest::new(["definitely-not-a-real-binary-xyz"]))
            .unwrap_err();
        assert!(matches!(err, crate::error::StackError::ProcessSpawn { .. }));
    }

    #[test]
    fn test_dry_run_does_not_execute() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let shell = SystemShell::new(true);
        let out = shell
            .execute(&ExecRequest::new([
                "touch".to_string(),
                marker.display().to_string(),
            ]))
            .unwrap();
        assert!(out.success());
        assert!(!marker.exists());
        assert!(shell.dry_run());
    }

    #[test]
    fn test_spawn_detached_writes_logs() {
        let temp = TempDir::new().unwrap();
        let stdout = temp.path().join("app.stdout");
        let stderr = temp.path().join("app.stderr");
        let shell = SystemShell::new(false);
        let pid = shell
            .spawn_detached(&ExecRequest::new(["sh", "-c", "echo started"]), &stdout, &stderr)
            .unwrap();
        assert!(pid > 0);
        assert!(stdout.exists());
        assert!(stderr.exists());
    }
}
