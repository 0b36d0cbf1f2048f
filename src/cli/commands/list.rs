//! `saltseal list`: display the sites in a salt file.

use std::path::Path;

use crate::cli::output;
use crate::errors::Result;
use crate::saltfile::{SaltFile, SealedSaltRecord};

/// Execute the `list` command.
pub fn execute(salt_file: &Path) -> Result<()> {
    let file = SaltFile::load(salt_file)?;

    output::info(&format!(
        "Project '{}': {} site(s), created {}",
        file.project_name(),
        file.len(),
        file.created_at().format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(updated) = file.updated_at() {
        output::info(&format!(
            "Sites last added {}",
            updated.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    let records: Vec<&SealedSaltRecord> = file.records().collect();
    output::print_sites_table(&records);

    Ok(())
}
