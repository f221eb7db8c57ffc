//! Runtime role: assemble launch specs, start, stop and status of apps

use std::path::PathBuf;

use super::{Component, ComponentContext, Lifecycle, Phase};
use crate::error::{self, Result};
use crate::shell::ExecRequest;
use crate::template;
use crate::trace::{START_TRACE, TraceEntry, TraceWriter, read_trace, remove_trace};

/// Only detached child processes are supported
const RUN_TYPE_FORK: &str = "FORK";

/// A fully rendered command line for one app
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub name: String,
    pub argv: Vec<String>,
}

/// Which runtime action the role performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeAction {
    Start,
    Stop,
    Status,
}

pub struct Runtime<'a> {
    component: &'a Component,
    ctx: &'a ComponentContext,
    action: RuntimeAction,
    launch: Vec<LaunchSpec>,
    notes: Vec<String>,
}

impl<'a> Runtime<'a> {
    pub fn new(component: &'a Component, ctx: &'a ComponentContext, action: RuntimeAction) -> Self {
        Self {
            component,
            ctx,
            action,
            launch: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn launch_specs(&self) -> &[LaunchSpec] {
        &self.launch
    }

    fn assemble(&mut self) -> Result<()> {
        let run_type = self.ctx.config.run_type();
        if run_type != RUN_TYPE_FORK {
            return Err(error::unsupported_run_type(run_type));
        }
        self.launch = self
            .component
            .apps
            .apps(self.ctx)?
            .into_iter()
            .map(|app| {
                let params = self.ctx.params_with(&app.params);
                let args = template::replace_list(app.args.iter().map(Some), &params, false)?;
                let mut argv = vec![app.path.display().to_string()];
                argv.extend(args);
                Ok(LaunchSpec { name: app.name, argv })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let trace = TraceWriter::new(&self.ctx.trace_dir, START_TRACE, self.ctx.dry_run());
        if !self.ctx.dry_run() {
            std::fs::create_dir_all(&self.ctx.trace_dir)?;
        }
        // Dead pids are dropped so stop never signals a recycled pid.
        let running = running_apps(self.ctx)?;
        trace.rewrite(&running)?;

        for spec in &self.launch {
            let already = running.iter().find_map(|entry| match entry {
                TraceEntry::AppStarted { name, pid, .. } if *name == spec.name => Some(*pid),
                _ => None,
            });
            if let Some(pid) = already {
                tracing::info!(app = %spec.name, pid, "already running");
                self.notes.push(format!("{} already running (pid {pid})", spec.name));
                continue;
            }
            let stdout = log_path(self.ctx, &spec.name, "stdout");
            let stderr = log_path(self.ctx, &spec.name, "stderr");
            let request = ExecRequest::new(spec.argv.clone()).cwd(&self.ctx.app_dir);
            let pid = self.ctx.shell.spawn_detached(&request, &stdout, &stderr)?;
            tracing::info!(app = %spec.name, pid, "started");
            self.notes.push(format!("started {} (pid {pid})", spec.name));
            trace.record(&TraceEntry::AppStarted {
                name: spec.name.clone(),
                pid,
                stdout,
                stderr,
            })?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.notes.extend(stop_apps(self.ctx)?);
        Ok(())
    }

    fn status(&mut self) -> Result<()> {
        let entries = started_apps(self.ctx)?;
        if entries.is_empty() {
            self.notes.push("not started".to_string());
        }
        for (name, pid) in entries {
            let state = if is_alive(self.ctx, pid)? { "running" } else { "stopped" };
            self.notes.push(format!("{name} (pid {pid}): {state}"));
        }
        Ok(())
    }
}

impl Lifecycle for Runtime<'_> {
    fn phases(&self) -> Vec<Phase> {
        match self.action {
            RuntimeAction::Start => vec![Phase::Assemble, Phase::Start],
            RuntimeAction::Stop => vec![Phase::Stop],
            RuntimeAction::Status => vec![Phase::Status],
        }
    }

    fn run_phase(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Assemble => self.assemble(),
            Phase::Start => self.start(),
            Phase::Stop => self.stop(),
            Phase::Status => self.status(),
            other => Err(error::phase_not_supported("runtime", other.to_string())),
        }
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

fn log_path(ctx: &ComponentContext, app: &str, stream: &str) -> PathBuf {
    ctx.trace_dir.join(format!("{app}.{stream}"))
}

/// `(name, pid)` of every app recorded in the start trace
fn started_apps(ctx: &ComponentContext) -> Result<Vec<(String, u32)>> {
    Ok(read_trace(&ctx.trace_dir.join(START_TRACE))?
        .into_iter()
        .filter_map(|entry| match entry {
            TraceEntry::AppStarted { name, pid, .. } => Some((name, pid)),
            _ => None,
        })
        .collect())
}

/// Start trace entries whose process is still alive
fn running_apps(ctx: &ComponentContext) -> Result<Vec<TraceEntry>> {
    let mut running = Vec::new();
    for entry in read_trace(&ctx.trace_dir.join(START_TRACE))? {
        if let TraceEntry::AppStarted { pid, .. } = &entry {
            if is_alive(ctx, *pid)? {
                running.push(entry);
            }
        }
    }
    Ok(running)
}

fn is_alive(ctx: &ComponentContext, pid: u32) -> Result<bool> {
    if pid == 0 {
        return Ok(false);
    }
    let kill = ctx.distro.get_command("kill")?;
    let request = ExecRequest::new([kill.to_string(), "-0".to_string(), pid.to_string()])
        .as_root()
        .tolerate_failure();
    Ok(ctx.shell.execute(&request)?.success())
}

/// Signal every app in the start trace and forget them
///
/// Shared by the runtime stop action and the uninstaller.
pub(super) fn stop_apps(ctx: &ComponentContext) -> Result<Vec<String>> {
    let kill = ctx.distro.get_command("kill")?;
    let mut notes = Vec::new();
    for (name, pid) in started_apps(ctx)? {
        if !is_alive(ctx, pid)? {
            tracing::debug!(app = %name, pid, "process was not running");
            continue;
        }
        let request = ExecRequest::new([kill.to_string(), "-TERM".to_string(), pid.to_string()])
            .as_root()
            .tolerate_failure();
        let output = ctx.shell.execute(&request)?;
        if output.success() {
            tracing::info!(app = %name, pid, "stopped");
            notes.push(format!("stopped {name} (pid {pid})"));
        } else {
            tracing::debug!(app = %name, pid, "process was not running");
        }
    }
    if !ctx.dry_run() {
        remove_trace(&ctx.trace_dir.join(START_TRACE))?;
    }
    Ok(notes)
}
