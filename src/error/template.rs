//! Parameter substitution errors

use super::StackError;

/// Creates a missing parameter error for a `%TOKEN%` with no value
pub fn missing_parameter(token: impl Into<String>) -> StackError {
    StackError::MissingParameter {
        token: token.into(),
    }
}
