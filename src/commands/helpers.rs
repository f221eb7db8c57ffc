//! Command helper utilities

use std::sync::Arc;

use crate::cli::GlobalArgs;
use crate::config::{StackConfig, resolve_config_path};
use crate::distro::Distro;
use crate::error::Result;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::shell::{Executor, SystemShell};
use crate::ui::display::display_report;

/// Load the stack configuration and apply command line overrides
pub fn load_config(global: &GlobalArgs) -> Result<StackConfig> {
    let path = resolve_config_path(global.config.clone());
    let mut config = StackConfig::load(&path)?;
    apply_overrides(&mut config, global);
    Ok(config)
}

fn apply_overrides(config: &mut StackConfig, global: &GlobalArgs) {
    if let Some(root) = &global.root {
        config.settings.root = root.clone();
    }
    for option in &global.options {
        let flags = config
            .settings
            .options
            .entry(option.component.clone())
            .or_default();
        if !flags.contains(&option.flag) {
            flags.push(option.flag.clone());
        }
    }
    for set in &global.overrides {
        config.set(&set.section, &set.option, set.value.clone());
    }
}

/// Build an orchestrator for the configured stack on this host
pub fn orchestrator(global: &GlobalArgs) -> Result<Orchestrator> {
    let config = load_config(global)?;
    let distro = Distro::detect(&config)?;
    tracing::info!(distro = %distro.name, "using distribution");

    let shell: Arc<dyn Executor> = Arc::new(SystemShell::new(global.dry_run));
    Ok(
        Orchestrator::new(Arc::new(config), Arc::new(distro), shell)
            .show_progress(console::Term::stderr().is_term()),
    )
}

/// Print the summary; a failed component becomes the command's error
pub fn finish(report: RunReport) -> Result<()> {
    display_report(&report);
    match report.failed {
        Some(failed) => Err(failed.error),
        None => Ok(()),
    }
}
