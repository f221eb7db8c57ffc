use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    stackup completions bash > ~/.bash_completion.d/stackup\n\n\
                  Generate zsh completions:\n    stackup completions zsh > ~/.zfunc/_stackup\n\n\
                  Generate fish completions:\n    stackup completions fish > ~/.config/fish/completions/stackup.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
