//! Command implementations for the stackup CLI

pub mod completions;
pub mod helpers;
pub mod install;
pub mod runtime;
pub mod uninstall;
pub mod version;
