//! Subprocess execution errors

use super::StackError;

/// Human readable form of a process exit code
pub fn describe_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Creates a process execution error for a command that exited unsuccessfully
pub fn execution_failed(
    argv: &[String],
    code: Option<i32>,
    stdout: impl Into<String>,
    stderr: impl Into<String>,
) -> StackError {
    StackError::ProcessExecution {
        command: argv.join(" "),
        code,
        status: describe_status(code),
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

/// Creates an error for a command that could not be started at all
pub fn spawn_failed(argv: &[String], reason: impl Into<String>) -> StackError {
    StackError::ProcessSpawn {
        command: argv.join(" "),
        reason: reason.into(),
    }
}
