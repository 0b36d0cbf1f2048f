//! `saltseal completions`: generate shell completion scripts.
//!
//! Usage:
//!   saltseal completions bash > ~/.bash_completion.d/saltseal
//!   saltseal completions zsh
//!   saltseal completions fish
//!   saltseal completions powershell

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `completions` command.
pub fn execute(shell: Shell) -> Result<()> {
    let mut out = io::stdout();
    write_completions(shell, &mut out)?;
    Ok(())
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> io::Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "saltseal", out);
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(shell, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn bash_completions_mention_subcommands() {
        let script = render(Shell::Bash);
        assert!(script.contains("saltseal"));
        assert!(script.contains("create-project"));
        assert!(script.contains("add-sites"));
    }

    #[test]
    fn zsh_and_fish_completions_render() {
        assert!(!render(Shell::Zsh).is_empty());
        assert!(!render(Shell::Fish).is_empty());
    }
}
