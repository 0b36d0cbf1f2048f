//! Project workflows: creating a project and admitting new sites.
//!
//! Each workflow takes an immutable request value, validates it when
//! the workflow runs, and writes the salt file only after every other
//! step has succeeded.
//!
//! ```no_run
//! # use saltseal::engine::{CreateProject, SaltEngine};
//! # fn demo(sites: Vec<saltseal::sites::Site>) -> saltseal::errors::Result<()> {
//! let engine = SaltEngine::new();
//! let created = engine.create_project(
//!     &CreateProject::new()
//!         .project_name("diabetes-2026")
//!         .sites(sites)
//!         .output_dir("."),
//! )?;
//! println!("wrote {}", created.path.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::crypto::envelope::{open, seal};
use crate::crypto::keys::PrivateKey;
use crate::crypto::salt::{OsSaltSource, SaltSource, SaltValue};
use crate::errors::{Result, SaltSealError};
use crate::saltfile::{SaltFile, SealedSaltRecord};
use crate::sites::{validate_site_list, Site};

/// File extension of salt files.
pub const SALT_FILE_EXTENSION: &str = "salt";

/// What `add_sites` does when every listed site is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewSitePolicy {
    /// Succeed without adding records; the file is rewritten unchanged.
    #[default]
    AllowNoop,
    /// Fail with `NoNewSites`.
    RequireNewSites,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Parameters for `SaltEngine::create_project`.
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    project_name: Option<String>,
    sites: Option<Vec<Site>>,
    output_dir: Option<PathBuf>,
}

impl CreateProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn sites(mut self, sites: Vec<Site>) -> Self {
        self.sites = Some(sites);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Parameters for `SaltEngine::add_sites`.
///
/// The private key is borrowed so the engine never copies it.
#[derive(Debug, Clone, Default)]
pub struct AddSites<'k> {
    sites: Option<Vec<Site>>,
    private_key: Option<&'k PrivateKey>,
    salt_file: Option<PathBuf>,
}

impl<'k> AddSites<'k> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sites(mut self, sites: Vec<Site>) -> Self {
        self.sites = Some(sites);
        self
    }

    pub fn private_key(mut self, key: &'k PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn salt_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.salt_file = Some(path.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a successful `create_project`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCreated {
    /// Where the salt file was written.
    pub path: PathBuf,
    /// Site ids that received a sealed salt, in site-list order.
    pub sites: Vec<String>,
}

/// Result of a successful `add_sites`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitesAdded {
    /// The salt file that was updated.
    pub path: PathBuf,
    /// Site id whose record was opened to recover the salt.
    pub opened_with: String,
    /// Newly sealed sites, in site-list order.
    pub added: Vec<String>,
    /// Listed sites that already had a record (left untouched).
    pub unchanged: Vec<String>,
    /// Listed sites whose public key differs from the one their existing
    /// record was sealed for.  Their records are not resealed.
    pub key_changed: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs the project workflows.
///
/// Holds no state between calls besides its salt source and policy.
#[derive(Debug, Clone, Default)]
pub struct SaltEngine<S: SaltSource = OsSaltSource> {
    source: S,
    policy: NewSitePolicy,
}

impl SaltEngine<OsSaltSource> {
    /// Engine backed by the OS random source with the default policy.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SaltSource> SaltEngine<S> {
    /// Engine using a custom salt source.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            policy: NewSitePolicy::default(),
        }
    }

    /// Set the policy for `add_sites` runs that find no new sites.
    pub fn policy(mut self, policy: NewSitePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a new project: one fresh salt, sealed for every listed site.
    ///
    /// The salt file is written to `<output_dir>/<project_name>.salt`
    /// and must not already exist.  Nothing is written on failure.
    pub fn create_project(&self, request: &CreateProject) -> Result<ProjectCreated> {
        let name = request
            .project_name
            .as_deref()
            .ok_or(SaltSealError::MissingParameter("project name"))?;
        let sites = request
            .sites
            .as_deref()
            .ok_or(SaltSealError::MissingParameter("site list"))?;
        let output_dir = request
            .output_dir
            .as_deref()
            .ok_or(SaltSealError::MissingParameter("output directory"))?;

        validate_project_name(name)?;
        validate_site_list(sites)?;

        // Checked again when the file is created exclusively.
        let path = salt_file_path(output_dir, name);
        if path.exists() {
            return Err(SaltSealError::SaltFileExists(path));
        }

        let salt = self.source.generate()?;
        let mut file = SaltFile::new(name);
        for site in sites {
            file.add_record(seal_for(&salt, site)?)?;
        }
        drop(salt);

        file.save_new(&path)?;
        info!(project = name, sites = sites.len(), path = %path.display(), "created project");

        Ok(ProjectCreated {
            path,
            sites: sites.iter().map(|s| s.id().to_string()).collect(),
        })
    }

    /// Admit new sites to an existing project.
    ///
    /// Recovers the project salt from the record sealed for
    /// `private_key`, seals it for each listed site that has no record
    /// yet, and saves the file in place.  Existing records are never
    /// modified.
    pub fn add_sites(&self, request: &AddSites<'_>) -> Result<SitesAdded> {
        let sites = request
            .sites
            .as_deref()
            .ok_or(SaltSealError::MissingParameter("site list"))?;
        let key = request
            .private_key
            .ok_or(SaltSealError::MissingParameter("private key"))?;
        let path = request
            .salt_file
            .as_deref()
            .ok_or(SaltSealError::MissingParameter("salt file"))?;

        validate_site_list(sites)?;

        let mut file = SaltFile::load(path)?;
        if file.is_empty() {
            return Err(SaltSealError::EmptyProject);
        }

        // Partition the listed sites.
        let (present, new): (Vec<&Site>, Vec<&Site>) =
            sites.iter().partition(|s| file.contains(s.id()));

        let key_changed: Vec<String> = present
            .iter()
            .filter(|s| {
                file.record_for(s.id())
                    .is_some_and(|r| r.blob().recipient() != &s.public_key().fingerprint())
            })
            .map(|s| s.id().to_string())
            .collect();
        for id in &key_changed {
            debug!(site = %id, "listed public key differs from the key its salt was sealed for");
        }

        if new.is_empty() && self.policy == NewSitePolicy::RequireNewSites {
            return Err(SaltSealError::NoNewSites);
        }

        let (opened_with, salt) = recover_salt(&file, key)?;
        debug!(site = %opened_with, "recovered project salt");

        for site in &new {
            file.add_record(seal_for(&salt, site)?)?;
        }
        drop(salt);

        if !new.is_empty() {
            file.touch();
        }
        file.save(path)?;
        info!(
            project = file.project_name(),
            added = new.len(),
            unchanged = present.len(),
            path = %path.display(),
            "added sites"
        );

        Ok(SitesAdded {
            path: path.to_path_buf(),
            opened_with,
            added: new.iter().map(|s| s.id().to_string()).collect(),
            unchanged: present.iter().map(|s| s.id().to_string()).collect(),
            key_changed,
        })
    }

    /// Check that `key` opens its record in the salt file at `path`.
    ///
    /// Returns the id of the site whose record opened.  Nothing is
    /// written and the salt is discarded immediately.
    pub fn verify_key(&self, path: &Path, key: &PrivateKey) -> Result<String> {
        let file = SaltFile::load(path)?;
        if file.is_empty() {
            return Err(SaltSealError::EmptyProject);
        }
        let (site_id, _salt) = recover_salt(&file, key)?;
        Ok(site_id)
    }
}

/// Locate the record sealed for `key` and open it.
///
/// When no record carries the key's fingerprint, every record is tried:
/// one that still authenticates under `key` had its fingerprint altered,
/// which is `Integrity`, not `KeyMismatch`.
fn recover_salt(file: &SaltFile, key: &PrivateKey) -> Result<(String, SaltValue)> {
    if let Some(record) = file.record_for_key(key) {
        let salt = open(record.blob(), key, record.site_id())?;
        return Ok((record.site_id().to_string(), salt));
    }

    for record in file.records() {
        if let Err(SaltSealError::Integrity) = open(record.blob(), key, record.site_id()) {
            debug!(site = record.site_id(), "record authenticates under the key but names another recipient");
            return Err(SaltSealError::Integrity);
        }
    }
    Err(SaltSealError::KeyMismatch)
}

fn seal_for(salt: &SaltValue, site: &Site) -> Result<SealedSaltRecord> {
    let blob = seal(salt, site.public_key(), site.id())?;
    debug!(site = site.id(), recipient = %blob.recipient(), "sealed salt");
    Ok(SealedSaltRecord::new(site.id(), site.name(), blob))
}

/// Path of the salt file for `project` inside `output_dir`.
pub fn salt_file_path(output_dir: &Path, project: &str) -> PathBuf {
    output_dir.join(format!("{project}.{SALT_FILE_EXTENSION}"))
}

/// Validate that a project name is safe to use as a file name.
///
/// Allowed: ASCII letters, digits, underscores, hyphens.  Must be
/// non-empty, at most 64 characters, and not start with a hyphen.
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > 64
        || name.starts_with('-')
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(SaltSealError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_project_names() {
        assert!(validate_project_name("demo").is_ok());
        assert!(validate_project_name("Diabetes_2026").is_ok());
        assert!(validate_project_name("multi-site-study").is_ok());
    }

    #[test]
    fn invalid_project_names() {
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("-demo").is_err());
        assert!(validate_project_name("../escape").is_err());
        assert!(validate_project_name("has space").is_err());
        assert!(validate_project_name(&"p".repeat(65)).is_err());
    }

    #[test]
    fn salt_file_path_uses_extension() {
        assert_eq!(
            salt_file_path(Path::new("/tmp/out"), "demo"),
            PathBuf::from("/tmp/out/demo.salt")
        );
    }

    #[test]
    fn missing_parameters_are_reported_at_run_time() {
        let engine = SaltEngine::new();
        let err = engine
            .create_project(&CreateProject::new().output_dir("."))
            .unwrap_err();
        assert!(matches!(err, SaltSealError::MissingParameter("project name")));

        let err = engine
            .add_sites(&AddSites::new().salt_file("x.salt"))
            .unwrap_err();
        assert!(matches!(err, SaltSealError::MissingParameter("site list")));
    }
}
