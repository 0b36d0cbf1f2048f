//! `saltseal create-project`: generate a project salt and seal it for every site.

use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::config::Settings;
use crate::engine::{CreateProject, SaltEngine};
use crate::errors::{Result, SaltSealError};
use crate::sites::parse_site_list;

/// Execute the `create-project` command.
pub fn execute(
    project_name: &str,
    site_file: &Path,
    output_dir: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => settings.output_dir(&cwd),
    };

    // 1. Read the site list before touching the filesystem.
    let sites = parse_site_list(site_file)?;
    output::info(&format!(
        "Loaded {} site(s) from {}",
        sites.len(),
        site_file.display()
    ));

    // 2. Create the output directory if it doesn't exist.
    if !output_dir.exists() {
        fs::create_dir_all(&output_dir)?;
        output::info(&format!(
            "Created output directory: {}",
            output_dir.display()
        ));
    }

    // 3. Generate, seal and write.
    let request = CreateProject::new()
        .project_name(project_name)
        .sites(sites)
        .output_dir(&output_dir);
    let created = match SaltEngine::new().create_project(&request) {
        Ok(created) => created,
        Err(e @ SaltSealError::SaltFileExists(_)) => {
            output::tip("Use `saltseal add-sites` to admit new sites to an existing project.");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    output::success(&format!(
        "Project '{project_name}' created for {} site(s) at {}",
        created.sites.len(),
        created.path.display()
    ));
    output::tip("Share the salt file with every site; each can only open its own record.");

    Ok(())
}
