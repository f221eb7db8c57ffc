//! Error types and handling for stackup
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`template`]: Parameter substitution errors
//! - [`config`]: Stack configuration and INI document errors
//! - [`package`]: Package backend errors
//! - [`process`]: Subprocess execution errors
//! - [`component`]: Component lifecycle errors
//! - [`git`]: Git operation errors
//! - [`fs`]: File system errors

pub mod component;
pub mod config;
pub mod fs;
pub mod git;
pub mod package;
pub mod process;
pub mod template;

pub use component::{
    duplicate_download_target, path_outside_component, phase_failed, phase_not_supported,
    unknown_component, unknown_option, unsupported_run_type,
};
pub use config::{
    missing_value as missing_config_value, not_found as config_not_found,
    parse_failed as config_parse_failed, stack_invalid as stack_config_invalid,
};
pub use fs::{
    io_error, read_failed as file_read_failed, write_failed as file_write_failed,
};
pub use git::{checkout_failed, clone_failed};
pub use package::{invalid as package_invalid, operation_failed as package_operation_failed};
pub use process::{describe_status, execution_failed, spawn_failed};
pub use template::missing_parameter;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for stackup operations
#[derive(Error, Diagnostic, Debug)]
pub enum StackError {
    // Parameter substitution errors
    #[error("No replacement found for parameter %{token}%")]
    #[diagnostic(
        code(stackup::template::missing_parameter),
        help("Define the parameter for this component or substitute in tolerant mode")
    )]
    MissingParameter { token: String },

    // INI document errors
    #[error("Failed to parse config document {path} (line {line}): {reason}")]
    #[diagnostic(code(stackup::config::parse_failed))]
    ConfigParse {
        path: String,
        line: usize,
        reason: String,
    },

    // Stack configuration errors
    #[error("Stack configuration not found: {path}")]
    #[diagnostic(
        code(stackup::config::not_found),
        help("Pass --config <file> or set STACKUP_CONFIG")
    )]
    StackConfigNotFound { path: String },

    #[error("Invalid stack configuration: {message}")]
    #[diagnostic(code(stackup::config::invalid))]
    StackConfigInvalid { message: String },

    #[error("Missing configuration value '{id}'")]
    #[diagnostic(
        code(stackup::config::missing_value),
        help("Add the option to the matching section of the stack configuration")
    )]
    MissingConfigValue { id: String },

    // Package errors
    #[error("Invalid package declaration: {message}")]
    #[diagnostic(code(stackup::package::invalid))]
    PackageInvalid { message: String },

    #[error("{backend} failed on package '{package}' ({status})")]
    #[diagnostic(code(stackup::package::operation_failed))]
    PackageOperation {
        backend: String,
        package: String,
        status: String,
        reason: String,
    },

    // Distro errors
    #[error("Unsupported distribution: {name}")]
    #[diagnostic(
        code(stackup::distro::unsupported),
        help("Set stack.distro to one of: rhel-6, fedora-16, ubuntu-oneiric")
    )]
    UnsupportedDistro { name: String },

    #[error("Distribution '{distro}' has no command registered for '{command}'")]
    #[diagnostic(code(stackup::distro::unknown_command))]
    UnknownDistroCommand { distro: String, command: String },

    // Process errors
    #[error("Command '{command}' failed ({status})")]
    #[diagnostic(code(stackup::process::execution_failed))]
    ProcessExecution {
        command: String,
        code: Option<i32>,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to start command '{command}': {reason}")]
    #[diagnostic(code(stackup::process::spawn_failed))]
    ProcessSpawn { command: String, reason: String },

    // Component errors
    #[error("Unknown component: {name}")]
    #[diagnostic(
        code(stackup::component::unknown),
        help("Known components: network, network-client, swift-keystone")
    )]
    UnknownComponent { name: String },

    #[error("Unknown option '{option}' for component '{component}'")]
    #[diagnostic(code(stackup::component::unknown_option))]
    UnknownOption { component: String, option: String },

    #[error("Unsupported run type: {run_type}")]
    #[diagnostic(
        code(stackup::component::unsupported_run_type),
        help("Only the FORK run type is supported")
    )]
    UnsupportedRunType { run_type: String },

    #[error("Path '{path}' escapes the directory of component '{component}'")]
    #[diagnostic(code(stackup::component::path_outside))]
    PathOutsideComponent { path: String, component: String },

    #[error("Component '{component}' downloads more than one source into '{path}'")]
    #[diagnostic(
        code(stackup::component::duplicate_download),
        help("Give each download location its own subdirectory")
    )]
    DuplicateDownloadTarget { path: String, component: String },

    #[error("The {role} role has no {phase} phase")]
    #[diagnostic(code(stackup::component::phase_not_supported))]
    PhaseNotSupported { role: String, phase: String },

    #[error("Component '{component}' failed during {phase}: {source}")]
    #[diagnostic(code(stackup::component::phase_failed))]
    PhaseFailed {
        component: String,
        phase: String,
        #[source]
        source: Box<StackError>,
    },

    #[error("Unknown shell: {shell}")]
    #[diagnostic(
        code(stackup::cli::unsupported_shell),
        help("Supported shells: bash, elvish, fish, powershell, zsh")
    )]
    UnsupportedShell { shell: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(stackup::cancelled))]
    Cancelled,

    #[error("Confirmation required but no terminal is attached")]
    #[diagnostic(
        code(stackup::not_interactive),
        help("Pass -y to skip the confirmation prompt")
    )]
    NotInteractive,

    // Trace errors
    #[error("Corrupt trace file {path} (line {line}): {reason}")]
    #[diagnostic(code(stackup::trace::corrupt))]
    TraceCorrupt {
        path: String,
        line: usize,
        reason: String,
    },

    // Git errors
    #[error("Git operation failed: {message}")]
    #[diagnostic(code(stackup::git::operation_failed))]
    GitOperationFailed { message: String },

    #[error("Failed to clone repository: {url}: {reason}")]
    #[diagnostic(
        code(stackup::git::clone_failed),
        help("Check that the repository URL is correct and reachable")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to checkout branch '{branch}': {reason}")]
    #[diagnostic(code(stackup::git::checkout_failed))]
    GitCheckoutFailed { branch: String, reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(stackup::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(stackup::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(stackup::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(stackup::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for StackError {
    fn from(err: std::io::Error) -> Self {
        StackError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for StackError {
    fn from(err: serde_yaml::Error) -> Self {
        StackError::StackConfigInvalid {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::TraceCorrupt {
            path: "unknown".to_string(),
            line: err.line(),
            reason: err.to_string(),
        }
    }
}

impl From<git2::Error> for StackError {
    fn from(err: git2::Error) -> Self {
        StackError::GitOperationFailed {
            message: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for StackError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => StackError::Cancelled,
            inquire::InquireError::NotTTY => StackError::NotInteractive,
            other => StackError::IoError {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, StackError>;
