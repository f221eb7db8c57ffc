//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for commands that take arguments:
//! - uninstall: Uninstall command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod completions;
pub mod uninstall;

pub use completions::CompletionsArgs;
pub use uninstall::UninstallArgs;

/// Stackup - service stack installer
///
/// Install, configure, start and tear down a stack of interdependent services.
#[derive(Parser, Debug)]
#[command(
    name = "stackup",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Install, configure, start and tear down a stack of services",
    long_about = "Stackup downloads, configures, installs and runs the components listed in a \
                  stack configuration file, one at a time and in order, using the host's package \
                  manager (yum or apt) and pip.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  stackup install                        \x1b[90m# Install every configured component\x1b[0m\n   \
                  stackup --dry-run install              \x1b[90m# Print what install would run\x1b[0m\n   \
                  stackup -o network:no-ovs-db-init install \x1b[90m# Skip one post-install step\x1b[0m\n   \
                  stackup start                          \x1b[90m# Start component apps\x1b[0m\n   \
                  stackup status                         \x1b[90m# Show which apps are running\x1b[0m\n   \
                  stackup uninstall -y                   \x1b[90m# Tear everything down\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Stack configuration file
    #[arg(long, short = 'c', global = true, env = "STACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory components are installed under (overrides stack.root)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable an option flag for a component (e.g. network:no-ovs-db-init)
    #[arg(
        long = "option",
        short = 'o',
        global = true,
        value_name = "COMPONENT:FLAG",
        value_parser = parse_component_option
    )]
    pub options: Vec<ComponentOption>,

    /// Override one configuration value (e.g. db/type=mysql)
    #[arg(
        long = "set",
        global = true,
        value_name = "SECTION/OPTION=VALUE",
        value_parser = parse_config_override
    )]
    pub overrides: Vec<ConfigOverride>,
}

/// One `component:flag` pair from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentOption {
    pub component: String,
    pub flag: String,
}

fn parse_component_option(value: &str) -> Result<ComponentOption, String> {
    match value.split_once(':') {
        Some((component, flag)) if !component.is_empty() && !flag.is_empty() => {
            Ok(ComponentOption {
                component: component.to_string(),
                flag: flag.to_string(),
            })
        }
        _ => Err(format!("expected COMPONENT:FLAG, got '{value}'")),
    }
}

/// One `section/option=value` pair from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub section: String,
    pub option: String,
    pub value: String,
}

fn parse_config_override(value: &str) -> Result<ConfigOverride, String> {
    let parsed = value.split_once('=').and_then(|(key, val)| {
        key.split_once('/')
            .filter(|(section, option)| !section.is_empty() && !option.is_empty())
            .map(|(section, option)| ConfigOverride {
                section: section.to_string(),
                option: option.to_string(),
                value: val.to_string(),
            })
    });
    parsed.ok_or_else(|| format!("expected SECTION/OPTION=VALUE, got '{value}'"))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, configure and install every component
    Install,

    /// Stop, remove packages and clean up every component
    Uninstall(UninstallArgs),

    /// Start component apps
    Start,

    /// Stop component apps
    Stop,

    /// Show whether component apps are running
    Status,

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_install() {
        let cli = Cli::try_parse_from(["stackup", "install"]).unwrap();
        assert!(matches!(cli.command, Commands::Install));
    }

    #[test]
    fn test_cli_parsing_version() {
        let cli = Cli::try_parse_from(["stackup", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "stackup",
            "-vv",
            "--config",
            "/tmp/stack.yaml",
            "--root",
            "/srv/stack",
            "--dry-run",
            "start",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/stack.yaml")));
        assert_eq!(cli.global.root, Some(PathBuf::from("/srv/stack")));
        assert!(cli.global.dry_run);
        assert!(matches!(cli.command, Commands::Start));
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["stackup", "status", "-v", "--dry-run"]).unwrap();
        assert_eq!(cli.global.verbose, 1);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn test_cli_component_options() {
        let cli = Cli::try_parse_from([
            "stackup",
            "-o",
            "network:no-ovs-db-init",
            "--option",
            "network:no-ovs-bridge-init",
            "install",
        ])
        .unwrap();
        assert_eq!(
            cli.global.options,
            vec![
                ComponentOption {
                    component: "network".into(),
                    flag: "no-ovs-db-init".into()
                },
                ComponentOption {
                    component: "network".into(),
                    flag: "no-ovs-bridge-init".into()
                },
            ]
        );
    }

    #[test]
    fn test_cli_rejects_malformed_option() {
        assert!(Cli::try_parse_from(["stackup", "-o", "no-colon", "install"]).is_err());
        assert!(Cli::try_parse_from(["stackup", "-o", "network:", "install"]).is_err());
    }

    #[test]
    fn test_cli_config_overrides() {
        let cli = Cli::try_parse_from([
            "stackup",
            "--set",
            "db/type=mysql",
            "--set",
            "host/ip=",
            "install",
        ])
        .unwrap();
        assert_eq!(
            cli.global.overrides,
            vec![
                ConfigOverride {
                    section: "db".into(),
                    option: "type".into(),
                    value: "mysql".into()
                },
                ConfigOverride {
                    section: "host".into(),
                    option: "ip".into(),
                    value: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_cli_rejects_malformed_override() {
        assert!(Cli::try_parse_from(["stackup", "--set", "db.type=mysql", "install"]).is_err());
        assert!(Cli::try_parse_from(["stackup", "--set", "db/type", "install"]).is_err());
        assert!(Cli::try_parse_from(["stackup", "--set", "/type=x", "install"]).is_err());
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::try_parse_from(["stackup", "completions", "bash"]).unwrap();
        match cli.command {
            Commands::Completions(args) => {
                assert_eq!(args.shell, "bash");
            }
            _ => panic!("Expected Completions command"),
        }
    }
}
