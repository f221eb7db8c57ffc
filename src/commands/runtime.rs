//! Start, stop and status commands

use super::helpers;
use crate::cli::GlobalArgs;
use crate::error::Result;
use crate::orchestrator::Action;

/// Run one runtime action over every component
pub fn run(global: &GlobalArgs, action: Action) -> Result<()> {
    let report = helpers::orchestrator(global)?.run(action)?;
    helpers::finish(report)
}
