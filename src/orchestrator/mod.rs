//! Run one action over the configured components
//!
//! Components run one at a time in the order of `stack.components`
//! (reversed for uninstall and stop). The first failure ends the run and
//! every component after it is reported as skipped.

use std::fmt;
use std::sync::Arc;

use crate::component::{
    Component, ComponentContext, Installer, Lifecycle, Runtime, RuntimeAction, Uninstaller,
    run_lifecycle,
};
use crate::config::StackConfig;
use crate::distro::Distro;
use crate::error::{self, Result, StackError};
use crate::services;
use crate::shell::Executor;
use crate::ui::{InteractiveProgressReporter, ProgressReporter, SilentProgressReporter};

/// What to do with every component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Uninstall,
    Start,
    Stop,
    Status,
}

impl Action {
    /// Teardown actions walk the component list backwards
    pub fn reversed(self) -> bool {
        matches!(self, Action::Uninstall | Action::Stop)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Install => "install",
            Action::Uninstall => "uninstall",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Status => "status",
        };
        f.write_str(name)
    }
}

/// A component that ran to completion
#[derive(Debug)]
pub struct Completed {
    pub name: String,
    pub notes: Vec<String>,
}

/// The component that stopped the run
#[derive(Debug)]
pub struct Failed {
    pub component: String,
    /// Lifecycle phase, absent when the component failed before any phase
    pub phase: Option<String>,
    pub error: StackError,
}

/// Outcome of one orchestration run
#[derive(Debug)]
pub struct RunReport {
    pub action: Action,
    pub completed: Vec<Completed>,
    pub failed: Option<Failed>,
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed.is_none()
    }
}

pub struct Orchestrator {
    config: Arc<StackConfig>,
    distro: Arc<Distro>,
    shell: Arc<dyn Executor>,
    keep_packages: bool,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(config: Arc<StackConfig>, distro: Arc<Distro>, shell: Arc<dyn Executor>) -> Self {
        Self {
            config,
            distro,
            shell,
            keep_packages: false,
            show_progress: false,
        }
    }

    /// Keep packages on uninstall even when the configuration does not
    pub fn keep_packages(mut self, keep: bool) -> Self {
        self.keep_packages = keep;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Resolve and validate every component for `action`, in run order
    ///
    /// Nothing runs unless every name and option flag is known.
    pub fn plan(&self, action: Action) -> Result<Vec<Component>> {
        let settings = &self.config.settings;
        if let Some(unknown) = settings
            .options
            .keys()
            .find(|name| !services::names().any(|known| known == name.as_str()))
        {
            return Err(error::unknown_component(unknown.as_str()));
        }

        let mut components = settings
            .components
            .iter()
            .map(|name| {
                let component = services::lookup(name)?;
                component.validate_options(&self.config.options_for(name))?;
                Ok(component)
            })
            .collect::<Result<Vec<_>>>()?;
        if action.reversed() {
            components.reverse();
        }
        Ok(components)
    }

    /// Run `action` over every component
    ///
    /// Only planning errors are returned as `Err`; component failures
    /// land in the report.
    pub fn run(&self, action: Action) -> Result<RunReport> {
        let components = self.plan(action)?;
        let mut report = RunReport {
            action,
            completed: Vec::new(),
            failed: None,
            skipped: Vec::new(),
        };

        let mut progress: Box<dyn ProgressReporter> = if self.show_progress && !self.shell.dry_run() {
            Box::new(InteractiveProgressReporter::new(components.len() as u64))
        } else {
            Box::new(SilentProgressReporter)
        };

        for component in &components {
            if report.failed.is_some() {
                tracing::debug!(component = component.name, "skipped after earlier failure");
                report.skipped.push(component.name.to_string());
                continue;
            }

            progress.update_component(&action.to_string(), component.name);
            match self.run_component(component, action) {
                Ok(notes) => {
                    tracing::info!(component = component.name, %action, "completed");
                    report.completed.push(Completed {
                        name: component.name.to_string(),
                        notes,
                    });
                }
                Err(error) => {
                    tracing::error!(component = component.name, %action, %error, "failed");
                    let phase = match &error {
                        StackError::PhaseFailed { phase, .. } => Some(phase.clone()),
                        _ => None,
                    };
                    report.failed = Some(Failed {
                        component: component.name.to_string(),
                        phase,
                        error,
                    });
                }
            }
            progress.inc_component();
        }

        if report.success() {
            progress.finish();
        } else {
            progress.abandon();
        }
        Ok(report)
    }

    fn run_component(&self, component: &Component, action: Action) -> Result<Vec<String>> {
        let ctx = component.context(
            Arc::clone(&self.config),
            Arc::clone(&self.distro),
            Arc::clone(&self.shell),
        )?;
        match action {
            Action::Install => drive(&ctx, &mut Installer::new(component, &ctx)),
            Action::Uninstall => drive(
                &ctx,
                &mut Uninstaller::new(&ctx).keep_packages(self.keep_packages),
            ),
            Action::Start => drive(&ctx, &mut Runtime::new(component, &ctx, RuntimeAction::Start)),
            Action::Stop => drive(&ctx, &mut Runtime::new(component, &ctx, RuntimeAction::Stop)),
            Action::Status => {
                drive(&ctx, &mut Runtime::new(component, &ctx, RuntimeAction::Status))
            }
        }
    }
}

fn drive(ctx: &ComponentContext, role: &mut dyn Lifecycle) -> Result<Vec<String>> {
    run_lifecycle(ctx, role)?;
    Ok(role.notes())
}
