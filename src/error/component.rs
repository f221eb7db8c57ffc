//! Component lifecycle errors

use super::StackError;

/// Creates an unknown component error
pub fn unknown_component(name: impl Into<String>) -> StackError {
    StackError::UnknownComponent { name: name.into() }
}

/// Creates an unknown option error
pub fn unknown_option(component: impl Into<String>, option: impl Into<String>) -> StackError {
    StackError::UnknownOption {
        component: component.into(),
        option: option.into(),
    }
}

/// Creates an unsupported run type error
pub fn unsupported_run_type(run_type: impl Into<String>) -> StackError {
    StackError::UnsupportedRunType {
        run_type: run_type.into(),
    }
}

/// Creates an error for a path that would land outside the component tree
pub fn path_outside_component(path: impl Into<String>, component: impl Into<String>) -> StackError {
    StackError::PathOutsideComponent {
        path: path.into(),
        component: component.into(),
    }
}

/// Creates an error for two downloads sharing one checkout directory
pub fn duplicate_download_target(path: impl Into<String>, component: impl Into<String>) -> StackError {
    StackError::DuplicateDownloadTarget {
        path: path.into(),
        component: component.into(),
    }
}

/// Creates an error for a phase a lifecycle role does not run
pub fn phase_not_supported(role: impl Into<String>, phase: impl Into<String>) -> StackError {
    StackError::PhaseNotSupported {
        role: role.into(),
        phase: phase.into(),
    }
}

/// Wraps an error with the component and phase it aborted
pub fn phase_failed(
    component: impl Into<String>,
    phase: impl Into<String>,
    source: StackError,
) -> StackError {
    StackError::PhaseFailed {
        component: component.into(),
        phase: phase.into(),
        source: Box::new(source),
    }
}
