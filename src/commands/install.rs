//! Install command

use super::helpers;
use crate::cli::GlobalArgs;
use crate::error::Result;
use crate::orchestrator::Action;

/// Run install command
pub fn run(global: &GlobalArgs) -> Result<()> {
    let report = helpers::orchestrator(global)?.run(Action::Install)?;
    helpers::finish(report)
}
