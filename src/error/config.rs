//! Configuration errors

use super::StackError;

/// Creates a stack config not found error
pub fn not_found(path: impl Into<String>) -> StackError {
    StackError::StackConfigNotFound { path: path.into() }
}

/// Creates an invalid stack config error
pub fn stack_invalid(message: impl Into<String>) -> StackError {
    StackError::StackConfigInvalid {
        message: message.into(),
    }
}

/// Creates a missing `section/option` value error
pub fn missing_value(id: impl Into<String>) -> StackError {
    StackError::MissingConfigValue { id: id.into() }
}

/// Creates an INI document parse error
pub fn parse_failed(path: impl Into<String>, line: usize, reason: impl Into<String>) -> StackError {
    StackError::ConfigParse {
        path: path.into(),
        line,
        reason: reason.into(),
    }
}
