//! Uninstall command
//!
//! Lists what will be torn down and asks for confirmation unless `-y`
//! or `--dry-run` is given.

use inquire::Confirm;

use super::helpers;
use crate::cli::{GlobalArgs, UninstallArgs};
use crate::component::Component;
use crate::error::{Result, StackError};
use crate::orchestrator::Action;

/// Run uninstall command
pub fn run(global: &GlobalArgs, args: &UninstallArgs) -> Result<()> {
    let orchestrator = helpers::orchestrator(global)?.keep_packages(args.keep_packages);
    let components = orchestrator.plan(Action::Uninstall)?;

    if !args.yes && !global.dry_run && !components.is_empty() && !confirm_uninstall(&components)? {
        println!("Uninstall cancelled");
        return Ok(());
    }

    let report = orchestrator.run(Action::Uninstall)?;
    helpers::finish(report)
}

fn confirm_uninstall(components: &[Component]) -> Result<bool> {
    if !console::user_attended() {
        return Err(StackError::NotInteractive);
    }

    println!("\nThe following component(s) will be uninstalled:");
    for component in components {
        println!("  - {} ({})", component.name, component.description);
    }
    println!();

    Ok(Confirm::new("Proceed with uninstall?")
        .with_default(true)
        .with_help_message("Press Enter to confirm, or 'n' to cancel")
        .prompt()?)
}
