//! Stack configuration handling
//!
//! The live configuration store is a YAML file with a `stack:` block
//! describing what to run, plus free-form sections of `option: value`
//! pairs that components look up by `(section, option)`.

pub mod stack;
pub mod utils;

// Re-export commonly used types
pub use stack::{StackConfig, StackSettings};
pub use utils::{make_id, resolve_config_path};
