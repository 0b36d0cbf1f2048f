//! CLI module: Clap argument parser, logging setup, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter (e.g. `saltseal=debug`).
pub const LOG_ENV: &str = "SALTSEAL_LOG";

/// SaltSeal CLI: distribute one secret project salt to many sites.
#[derive(Parser)]
#[command(
    name = "saltseal",
    about = "Seal a shared project salt for each participating site",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show more log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a project salt and seal it for every site in the list
    CreateProject {
        /// Project name (letters, digits, '_' and '-')
        #[arg(long)]
        project_name: String,

        /// Site list: one `site_id,site_name,public_key_path` per line
        #[arg(long)]
        site_file: PathBuf,

        /// Directory for the new salt file (default: config `output_dir`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Seal an existing project's salt for sites that joined later
    AddSites {
        /// Site list including the new sites
        #[arg(long)]
        site_file: PathBuf,

        /// Private key of a site already in the project
        #[arg(long)]
        private_key: PathBuf,

        /// Salt file to update in place
        #[arg(long)]
        salt_file: PathBuf,

        /// Fail if every listed site already has a sealed salt
        #[arg(long)]
        require_new_sites: bool,
    },

    /// List the sites in a salt file
    List {
        /// Salt file to inspect
        #[arg(long)]
        salt_file: PathBuf,
    },

    /// Check that a private key opens its sealed salt
    Verify {
        /// Salt file to check against
        #[arg(long)]
        salt_file: PathBuf,

        /// Private key to check
        #[arg(long)]
        private_key: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Pick the log level from the global flags.
///
/// `--quiet` wins, then `-v`/`-vv`, then the configured default.
pub fn log_level(cli: &Cli, default: &str) -> String {
    match (cli.quiet, cli.verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => default.to_string(),
        (false, 1) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `SALTSEAL_LOG` overrides `level` when it is set.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_create_project() {
        let cli = parse(&[
            "saltseal",
            "create-project",
            "--project-name",
            "demo",
            "--site-file",
            "sites.csv",
        ]);
        match cli.command {
            Commands::CreateProject {
                project_name,
                site_file,
                output_dir,
            } => {
                assert_eq!(project_name, "demo");
                assert_eq!(site_file, PathBuf::from("sites.csv"));
                assert!(output_dir.is_none());
            }
            _ => panic!("expected create-project"),
        }
    }

    #[test]
    fn add_sites_requires_private_key() {
        let result = Cli::try_parse_from([
            "saltseal",
            "add-sites",
            "--site-file",
            "sites.csv",
            "--salt-file",
            "demo.salt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn log_level_follows_flags() {
        let cli = parse(&["saltseal", "list", "--salt-file", "x.salt"]);
        assert_eq!(log_level(&cli, "warn"), "warn");

        let cli = parse(&["saltseal", "-vv", "list", "--salt-file", "x.salt"]);
        assert_eq!(log_level(&cli, "warn"), "trace");

        let cli = parse(&["saltseal", "list", "--salt-file", "x.salt", "--quiet"]);
        assert_eq!(log_level(&cli, "warn"), "error");
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["saltseal", "-v", "-q", "list", "--salt-file", "x.salt"]);
        assert!(result.is_err());
    }
}
