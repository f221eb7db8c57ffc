use clap::Parser;

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Uninstall every configured component:\n    stackup uninstall\n\n\
                  Uninstall without confirmation:\n    stackup uninstall -y\n\n\
                  Remove files and stop apps but leave packages installed:\n    stackup uninstall --keep-packages")]
pub struct UninstallArgs {
    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Leave every package in place
    #[arg(long)]
    pub keep_packages: bool,
}
