//! Templated command execution
//!
//! Command argument vectors and stdin blocks share the substitution
//! grammar used for config files: every element is passed through
//! [`crate::template::replace`] before the command runs.

use super::{ExecOutput, ExecRequest, Executor};
use crate::error::Result;
use crate::template::{self, ParamMap};

/// A command whose argv and stdin may contain `%TOKEN%` placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandTemplate {
    pub cmd: Vec<String>,
    pub stdin: Vec<String>,
    pub run_as_root: bool,
    pub ignore_failure: bool,
}

impl CommandTemplate {
    pub fn new<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn as_root(mut self) -> Self {
        self.run_as_root = true;
        self
    }

    #[allow(dead_code)]
    pub fn ignore_failure(mut self) -> Self {
        self.ignore_failure = true;
        self
    }

    #[allow(dead_code)]
    pub fn with_stdin<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdin = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Substitute parameters and build the request to execute
    pub fn render(&self, params: &ParamMap, ignore_missing: bool) -> Result<ExecRequest> {
        let argv = template::replace_list(self.cmd.iter().map(Some), params, ignore_missing)?;
        let mut request = ExecRequest::new(argv);
        request.run_as_root = self.run_as_root;
        request.check_exit_code = !self.ignore_failure;
        if !self.stdin.is_empty() {
            let lines = template::replace_list(self.stdin.iter().map(Some), params, ignore_missing)?;
            request.stdin = Some(template::join_lines(&lines));
        }
        Ok(request)
    }
}

/// Render and run each command in order, stopping at the first failure
pub fn execute_template(
    shell: &dyn Executor,
    cmds: &[CommandTemplate],
    params: &ParamMap,
    ignore_missing: bool,
) -> Result<Vec<ExecOutput>> {
    cmds.iter()
        .map(|cmd| {
            let request = cmd.render(params, ignore_missing)?;
            shell.execute(&request)
        })
        .collect()
}
