//! `saltseal verify`: check that a private key opens its sealed salt.
//!
//! Nothing is written and the salt is never shown.

use std::path::Path;

use crate::cli::output;
use crate::crypto::load_private_key;
use crate::engine::SaltEngine;
use crate::errors::Result;

/// Execute the `verify` command.
pub fn execute(salt_file: &Path, private_key: &Path) -> Result<()> {
    let key = load_private_key(private_key)?;
    let site = SaltEngine::new().verify_key(salt_file, &key)?;

    output::success(&format!(
        "Key {} opens the sealed salt for site '{site}'",
        key.public_key().fingerprint()
    ));
    Ok(())
}
