//! Git operation errors

use super::StackError;

/// Creates a clone failed error
pub fn clone_failed(url: impl Into<String>, reason: impl Into<String>) -> StackError {
    StackError::GitCloneFailed {
        url: url.into(),
        reason: reason.into(),
    }
}

/// Creates a branch checkout failed error
pub fn checkout_failed(branch: impl Into<String>, reason: impl Into<String>) -> StackError {
    StackError::GitCheckoutFailed {
        branch: branch.into(),
        reason: reason.into(),
    }
}
