//! Stackup - service stack installer
//!
//! Downloads, configures, installs, starts and tears down a stack of
//! interdependent service components on one host, over yum, apt and pip.

use clap::Parser;

mod cli;
mod commands;
mod component;
mod config;
mod distro;
mod error;
mod git;
mod hash;
mod ini;
mod logging;
mod orchestrator;
mod packaging;
mod services;
mod shell;
mod template;
mod trace;
mod ui;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};
use orchestrator::Action;

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.global.verbose);

    let result = match cli.command {
        Commands::Install => commands::install::run(&cli.global),
        Commands::Uninstall(args) => commands::uninstall::run(&cli.global, &args),
        Commands::Start => commands::runtime::run(&cli.global, Action::Start),
        Commands::Stop => commands::runtime::run(&cli.global, Action::Stop),
        Commands::Status => commands::runtime::run(&cli.global, Action::Status),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
