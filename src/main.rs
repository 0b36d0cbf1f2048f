use std::time::Instant;

use clap::Parser;
use saltseal::cli::{commands, init_tracing, log_level, output, Cli, Commands};
use saltseal::config::Settings;
use saltseal::errors::Result;

fn main() {
    let started = Instant::now();
    let cli = Cli::parse();
    output::set_quiet(cli.quiet);

    if let Err(e) = run(&cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }

    if !output::is_quiet() {
        println!(
            "Total execution time: {:.2} sec",
            started.elapsed().as_secs_f64()
        );
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    init_tracing(&log_level(cli, &settings.log_level));

    match cli.command {
        Commands::CreateProject {
            ref project_name,
            ref site_file,
            ref output_dir,
        } => commands::create_project::execute(
            project_name,
            site_file,
            output_dir.as_deref(),
            &settings,
        ),
        Commands::AddSites {
            ref site_file,
            ref private_key,
            ref salt_file,
            require_new_sites,
        } => commands::add_sites::execute(
            site_file,
            private_key,
            salt_file,
            require_new_sites,
            &settings,
        ),
        Commands::List { ref salt_file } => commands::list::execute(salt_file),
        Commands::Verify {
            ref salt_file,
            ref private_key,
        } => commands::verify::execute(salt_file, private_key),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
