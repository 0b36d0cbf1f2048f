//! `saltseal add-sites`: seal an existing project's salt for newly listed sites.

use std::path::Path;

use crate::cli::output;
use crate::config::Settings;
use crate::crypto::load_private_key;
use crate::engine::{AddSites, NewSitePolicy, SaltEngine};
use crate::errors::Result;
use crate::sites::parse_site_list;

/// Execute the `add-sites` command.
pub fn execute(
    site_file: &Path,
    private_key: &Path,
    salt_file: &Path,
    require_new_sites: bool,
    settings: &Settings,
) -> Result<()> {
    let sites = parse_site_list(site_file)?;
    let key = load_private_key(private_key)?;

    // The flag can only tighten the configured policy.
    let policy = if require_new_sites {
        NewSitePolicy::RequireNewSites
    } else {
        settings.new_site_policy()
    };

    let request = AddSites::new()
        .sites(sites)
        .private_key(&key)
        .salt_file(salt_file);
    let result = SaltEngine::new().policy(policy).add_sites(&request)?;

    for id in &result.key_changed {
        output::warning(&format!(
            "Site '{id}' is listed with a different public key than its existing record; \
             the record was left unchanged"
        ));
    }

    output::info(&format!(
        "Recovered project salt using the record for site '{}'",
        result.opened_with
    ));

    if result.added.is_empty() {
        output::info(&format!(
            "No new sites: all {} listed site(s) already have a sealed salt",
            result.unchanged.len()
        ));
    } else {
        output::success(&format!(
            "Added {} site(s) to {}: {}",
            result.added.len(),
            result.path.display(),
            result.added.join(", ")
        ));
    }

    Ok(())
}
