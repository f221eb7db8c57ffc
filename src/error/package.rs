//! Package backend errors

use super::{StackError, describe_status};

/// Creates an invalid package declaration error
pub fn invalid(message: impl Into<String>) -> StackError {
    StackError::PackageInvalid {
        message: message.into(),
    }
}

/// Creates a package operation error carrying the backend, package identifier and exit status
pub fn operation_failed(
    backend: impl Into<String>,
    package: impl Into<String>,
    code: Option<i32>,
    reason: impl Into<String>,
) -> StackError {
    StackError::PackageOperation {
        backend: backend.into(),
        package: package.into(),
        status: describe_status(code),
        reason: reason.into(),
    }
}
